//! Names under which request data is visible to a controller script.
//!
//! Names are fixed and case-sensitive. The leading underscore keeps them
//! clear of anything the script language reserves.

/// Query string parameters (multi-valued, ordered).
pub const GET: &str = "_GET";
/// Request cookies, name → value.
pub const COOKIE: &str = "_COOKIE";
/// Decoded request path.
pub const REQUEST_PATH: &str = "_REQUEST_PATH";
/// Request method, upper case.
pub const REQUEST_METHOD: &str = "_REQUEST_METHOD";
/// Read-only view of the whole request.
pub const HTTPCONTEXT: &str = "_HTTPCONTEXT";
/// Parsed form fields. Only present for `application/x-www-form-urlencoded`.
pub const POST: &str = "_POST";
/// Raw JSON body text. Only present for `application/json`.
pub const JSONDATA: &str = "_JSONDATA";
/// Rewindable raw body stream. Always present.
pub const RAWPOSTDATASTREAM: &str = "_RAWPOSTDATASTREAM";
/// Response headers set by the script. Starts empty.
pub const HEADERS: &str = "_HEADERS";
/// Response status set by the script. Starts at [`DEFAULT_STATUS`].
pub const STATUSCODE: &str = "_STATUSCODE";
/// Explicit binary response body. Starts empty.
pub const BINARYRESPONSE: &str = "_BINARYRESPONSE";

pub const DEFAULT_STATUS: i64 = 200;

/// Bindings installed as reassignable variables. All others are constants.
pub const MUTABLE: [&str; 4] = [RAWPOSTDATASTREAM, HEADERS, STATUSCODE, BINARYRESPONSE];

/// Every binding name, in installation order.
pub const ALL: [&str; 11] = [
    GET,
    COOKIE,
    REQUEST_PATH,
    REQUEST_METHOD,
    HTTPCONTEXT,
    POST,
    JSONDATA,
    RAWPOSTDATASTREAM,
    HEADERS,
    STATUSCODE,
    BINARYRESPONSE,
];

/// Short human description of a binding, used in debug logs.
pub fn describe(name: &str) -> &'static str {
    match name {
        GET => "HTTP query string collection",
        COOKIE => "HTTP cookies dictionary",
        REQUEST_PATH => "HTTP path string",
        REQUEST_METHOD => "HTTP method string",
        HTTPCONTEXT => "HTTP request view",
        POST => "HTTP form field collection",
        JSONDATA => "HTTP JSON post data",
        RAWPOSTDATASTREAM => "HTTP post data stream",
        HEADERS => "HTTP response header dictionary",
        STATUSCODE => "HTTP response status code",
        BINARYRESPONSE => "HTTP binary response body",
        _ => "unknown binding",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names = ALL.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn mutable_bindings_are_known() {
        for name in MUTABLE {
            assert!(ALL.contains(&name));
            assert_ne!(describe(name), "unknown binding");
        }
    }
}
