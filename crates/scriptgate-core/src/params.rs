//! ParamCollection — ordered, multi-valued string parameters.
//!
//! Backs both `_GET` (query string) and `_POST` (urlencoded form body).
//! Values are passed through as decoded text; nothing is validated.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamCollection {
    pairs: Vec<(String, String)>,
}

impl ParamCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `application/x-www-form-urlencoded` text (also used for query strings).
    ///
    /// Empty segments are skipped and a segment without `=` yields an empty value.
    pub fn parse(encoded: &str) -> Self {
        let encoded = encoded.strip_prefix('?').unwrap_or(encoded);
        let pairs = encoded
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
                (decode_form_component(key), decode_form_component(value))
            })
            .collect();
        Self { pairs }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// All values for `key`, joined with `,`. `None` if the key is absent.
    pub fn get(&self, key: &str) -> Option<String> {
        let values = self.get_all(key);
        if values.is_empty() {
            None
        } else {
            Some(values.join(","))
        }
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Distinct keys in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.pairs {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for ParamCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Decode a form component: `+` is a space, `%XX` is a byte.
pub fn decode_form_component(s: &str) -> String {
    decode(s, true)
}

/// Decode `%XX` escapes only (paths, cookie values).
pub fn percent_decode(s: &str) -> String {
    decode(s, false)
}

fn decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                },
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pairs() {
        let params = ParamCollection::parse("a=1&b=2");
        assert_eq!(params.get("a").as_deref(), Some("1"));
        assert_eq!(params.get("b").as_deref(), Some("2"));
        assert_eq!(params.get("c"), None);
    }

    #[test]
    fn keeps_every_value_in_order() {
        let params = ParamCollection::parse("tag=x&other=1&tag=y");
        assert_eq!(params.get_all("tag"), vec!["x", "y"]);
        assert_eq!(params.get("tag").as_deref(), Some("x,y"));
        assert_eq!(params.first("tag"), Some("x"));
        assert_eq!(params.keys(), vec!["tag", "other"]);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn decodes_components() {
        let params = ParamCollection::parse("q=hello+world&e=%C3%A9t%C3%A9&k%20y=v");
        assert_eq!(params.first("q"), Some("hello world"));
        assert_eq!(params.first("e"), Some("été"));
        assert_eq!(params.first("k y"), Some("v"));
    }

    #[test]
    fn tolerates_odd_segments() {
        let params = ParamCollection::parse("?flag&&=empty&bad=%zz%4");
        assert!(params.contains("flag"));
        assert_eq!(params.first("flag"), Some(""));
        assert_eq!(params.first(""), Some("empty"));
        assert_eq!(params.first("bad"), Some("%zz%4"));
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(ParamCollection::parse("").is_empty());
    }

    #[test]
    fn percent_decode_keeps_plus() {
        assert_eq!(percent_decode("a+b%2Fc"), "a+b/c");
    }

    #[test]
    fn display_lists_pairs() {
        let mut params = ParamCollection::new();
        params.push("a", "1");
        params.push("a", "2");
        assert_eq!(params.to_string(), "a=1&a=2");
    }
}
