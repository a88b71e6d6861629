//! HTTP type conversions between hyper and script bindings.
//!
//! Script-side values are plain strings and integers; these helpers turn
//! them into `http` types, rejecting what `http` cannot represent.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};

/// Convert a script status code. Anything outside 100..=999 becomes 500.
pub fn status_from_i64(code: i64) -> StatusCode {
    u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Convert one script header, or `None` if the name or value is invalid.
pub fn header_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
    let value = HeaderValue::from_str(value).ok()?;
    Some((name, value))
}

/// Convert request headers to (name, value) pairs for the script.
/// Values that are not visible ASCII are decoded lossily.
pub fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Longest query kept in a log field.
const MAX_LOGGED_QUERY: usize = 256;

/// Request target for log fields: the path, plus the query cut to
/// [`MAX_LOGGED_QUERY`] bytes and marked with `...` when cut.
pub fn log_target(uri: &Uri) -> String {
    let path = match uri.path() {
        "" => "/",
        path => path,
    };
    match uri.query() {
        None => path.to_string(),
        Some(query) => match query.get(..MAX_LOGGED_QUERY) {
            Some(head) if head.len() < query.len() => format!("{path}?{head}..."),
            _ => format!("{path}?{query}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_valid_code() {
        assert_eq!(status_from_i64(200), StatusCode::OK);
        assert_eq!(status_from_i64(404), StatusCode::NOT_FOUND);
        assert_eq!(status_from_i64(599).as_u16(), 599);
    }

    #[test]
    fn status_from_invalid_code() {
        assert_eq!(status_from_i64(99), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_from_i64(1000), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_from_i64(-1), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_from_i64(i64::MAX), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn header_pair_rejects_invalid_input() {
        assert!(header_pair("X-Ok", "fine").is_some());
        assert!(header_pair("bad name", "x").is_none());
        assert!(header_pair("X-Newline", "a\nb").is_none());
    }

    #[test]
    fn header_pairs_keep_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append("accept", "text/html".parse().unwrap());
        headers.append("accept", "application/json".parse().unwrap());
        headers.insert("x-custom", "hello".parse().unwrap());

        let pairs = header_pairs(&headers);
        assert_eq!(pairs.len(), 3);
        assert!(pairs.contains(&("x-custom".to_string(), "hello".to_string())));
    }

    #[test]
    fn log_target_drops_scheme_and_authority() {
        let uri: Uri = "http://localhost:8080/api/v1?foo=bar".parse().unwrap();
        assert_eq!(log_target(&uri), "/api/v1?foo=bar");

        let uri: Uri = "localhost:8080".parse().unwrap();
        assert_eq!(log_target(&uri), "/");
    }

    #[test]
    fn log_target_cuts_long_queries() {
        let query = "q=".to_string() + &"a".repeat(1000);
        let uri: Uri = format!("/search?{query}").parse().unwrap();

        let target = log_target(&uri);
        assert!(target.starts_with("/search?q=aaa"));
        assert!(target.ends_with("..."));
        assert_eq!(target.len(), "/search?".len() + MAX_LOGGED_QUERY + 3);
    }
}
