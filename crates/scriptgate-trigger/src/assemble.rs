//! Output classification and response assembly.
//!
//! Turns an [`ExecutionOutput`] into a [`ResponseDraft`]:
//!
//! 1. script headers, then `Content-Type: text/html` unless the script set one
//! 2. diagnostics appended to the text when debug output is on
//! 3. status from `_STATUSCODE`
//! 4. body: `_BINARYRESPONSE`, else echoed bytes, else the text buffer
//!
//! An [`EngineFault`] bypasses all of this, see [`ResponseDraft::fault`].

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use scriptgate_core::{Diagnostic, Emission, EngineFault, ExecutionOutput};
use tracing::warn;

use crate::convert::{header_pair, status_from_i64};

pub const DEFAULT_CONTENT_TYPE: &str = "text/html";
/// The exact header key a script must use to override the default type.
const CONTENT_TYPE_KEY: &str = "Content-Type";

/// Emissions split by kind, each in emission order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClassifiedOutput {
    /// Text emissions, each followed by a newline.
    pub text: String,
    pub bytes: Vec<u8>,
}

pub fn classify(emissions: impl IntoIterator<Item = Emission>) -> ClassifiedOutput {
    let mut out = ClassifiedOutput::default();
    for emission in emissions {
        match emission {
            Emission::Byte(byte) => out.bytes.push(byte),
            Emission::Text(text) => {
                out.text.push_str(&text);
                out.text.push('\n');
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftBody {
    Text(String),
    Binary(Vec<u8>),
}

impl DraftBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DraftBody::Text(text) => text.as_bytes(),
            DraftBody::Binary(bytes) => bytes,
        }
    }
}

/// The response before it is handed to hyper.
#[derive(Debug, Clone)]
pub struct ResponseDraft {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: DraftBody,
}

impl ResponseDraft {
    /// The engine could not run the script: 500, the fault message as the
    /// whole body, nothing else.
    pub fn fault(fault: &EngineFault) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers: HeaderMap::new(),
            body: DraftBody::Text(fault.to_string()),
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = match self.body {
            DraftBody::Text(text) => Bytes::from(text),
            DraftBody::Binary(bytes) => Bytes::from(bytes),
        };
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

pub fn assemble(output: ExecutionOutput, debug: bool) -> ResponseDraft {
    let ExecutionOutput {
        emissions,
        diagnostics,
        response,
    } = output;
    let classified = classify(emissions);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        match header_pair(name, value) {
            Some((name, value)) => {
                headers.append(name, value);
            }
            None => warn!(header = %name, "skipping invalid response header set by script"),
        }
    }
    if !response
        .headers
        .iter()
        .any(|(name, _)| name == CONTENT_TYPE_KEY)
    {
        headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    }

    let mut text = classified.text;
    if debug && !diagnostics.is_empty() {
        let html = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.eq_ignore_ascii_case(DEFAULT_CONTENT_TYPE));
        append_diagnostics(&mut text, &diagnostics, html);
    }

    let status = status_from_i64(response.status);
    if i64::from(status.as_u16()) != response.status {
        warn!(
            status = response.status,
            "script set an invalid status code, responding with 500"
        );
    }

    let body = if !response.binary.is_empty() {
        DraftBody::Binary(response.binary)
    } else if !classified.bytes.is_empty() {
        DraftBody::Binary(classified.bytes)
    } else {
        DraftBody::Text(text)
    };

    ResponseDraft {
        status,
        headers,
        body,
    }
}

fn append_diagnostics(text: &mut String, diagnostics: &[Diagnostic], html: bool) {
    let mut report = String::new();
    for diagnostic in diagnostics {
        report.push_str(&diagnostic.message);
        report.push('\n');
        report.push_str(&diagnostic.trace);
        report.push('\n');
    }

    if html {
        text.push_str(
            "<div id=\"scriptErrorDiv\" style=\"background:#FFF !important; color:#000 !important;\"><pre>\n",
        );
        text.push_str(&escape_html(&report));
        text.push_str("</pre></div>\n");
    } else {
        text.push_str(&report);
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
