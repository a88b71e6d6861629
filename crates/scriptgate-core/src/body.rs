//! RequestBody — a fully buffered, rewindable request body.
//!
//! The body is collected once at ingest time. Every clone shares the same
//! read cursor, so a script reading `_RAWPOSTDATASTREAM` sees the position
//! left by any earlier reader, exactly like a seekable stream would.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

#[derive(Debug, Clone, Default)]
pub struct RequestBody {
    data: Bytes,
    position: Arc<Mutex<usize>>,
}

impl RequestBody {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: Arc::new(Mutex::new(0)),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole body, independent of the cursor.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn position(&self) -> usize {
        *self.cursor()
    }

    /// Move the cursor, clamped to the body length. Returns the new position.
    pub fn seek(&self, position: usize) -> usize {
        let mut cursor = self.cursor();
        *cursor = position.min(self.data.len());
        *cursor
    }

    pub fn rewind(&self) {
        self.seek(0);
    }

    /// Read up to `max` bytes from the cursor.
    pub fn read(&self, max: usize) -> Bytes {
        let mut cursor = self.cursor();
        let start = *cursor;
        let end = start.saturating_add(max).min(self.data.len());
        *cursor = end;
        self.data.slice(start..end)
    }

    /// Read everything from the cursor to the end.
    pub fn read_to_end(&self) -> Bytes {
        self.read(usize::MAX)
    }

    /// Read the remainder as UTF-8 text, replacing invalid sequences.
    ///
    /// `size_hint` (usually the declared `Content-Length`) only sizes the
    /// buffer; the read always runs to the end of the body, so a missing or
    /// wrong hint never truncates the result.
    pub fn read_to_string(&self, size_hint: Option<u64>) -> String {
        let remaining = self.read_to_end();
        let capacity = size_hint
            .and_then(|hint| usize::try_from(hint).ok())
            .unwrap_or(remaining.len())
            .min(remaining.len());
        let mut text = String::with_capacity(capacity);
        text.push_str(&String::from_utf8_lossy(&remaining));
        text
    }

    fn cursor(&self) -> MutexGuard<'_, usize> {
        self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_the_cursor() {
        let body = RequestBody::new("hello world");
        assert_eq!(body.read(5), Bytes::from("hello"));
        assert_eq!(body.position(), 5);
        assert_eq!(body.read_to_end(), Bytes::from(" world"));
        assert!(body.read(10).is_empty());
    }

    #[test]
    fn clones_share_the_cursor() {
        let body = RequestBody::new("abcdef");
        let other = body.clone();
        body.read(2);
        assert_eq!(other.position(), 2);
        other.rewind();
        assert_eq!(body.read_to_end(), Bytes::from("abcdef"));
    }

    #[test]
    fn seek_is_clamped() {
        let body = RequestBody::new("abc");
        assert_eq!(body.seek(100), 3);
        assert_eq!(body.seek(1), 1);
        assert_eq!(body.read_to_end(), Bytes::from("bc"));
    }

    #[test]
    fn read_to_string_ignores_a_wrong_hint() {
        let body = RequestBody::new(r#"{"a":1}"#);
        assert_eq!(body.read_to_string(Some(2)), r#"{"a":1}"#);
        body.rewind();
        assert_eq!(body.read_to_string(None), r#"{"a":1}"#);
        body.rewind();
        assert_eq!(body.read_to_string(Some(u64::MAX)), r#"{"a":1}"#);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let body = RequestBody::new(vec![b'o', b'k', 0xff]);
        assert_eq!(body.read_to_string(None), "ok\u{fffd}");
    }
}
