//! Request ingestion.
//!
//! Turns an inbound request into a [`RequestSnapshot`]. The body is
//! buffered into a [`RequestBody`] first, so the eager form/JSON read done
//! here never takes bytes away from `_RAWPOSTDATASTREAM`.

use std::collections::BTreeMap;
use std::fmt::Display;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Request};
use http_body_util::BodyExt;
use hyper::body::Body;
use scriptgate_core::params::percent_decode;
use scriptgate_core::{ParamCollection, RequestBody};
use tracing::warn;

use crate::convert::header_pairs;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const JSON: &str = "application/json";

/// Body handling chosen from the request content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Form,
    Json,
    Other,
}

impl BodyKind {
    /// Case-sensitive prefix match, so `application/json; charset=utf-8`
    /// is JSON but `Application/JSON` is not.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.starts_with(FORM_URLENCODED) => BodyKind::Form,
            Some(ct) if ct.starts_with(JSON) => BodyKind::Json,
            _ => BodyKind::Other,
        }
    }
}

/// Immutable view of one request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: String,
    /// Percent-decoded path.
    pub path: String,
    pub raw_query: String,
    pub query: ParamCollection,
    pub cookies: BTreeMap<String, String>,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    /// Rewound to the start.
    pub body: RequestBody,
    pub form: Option<ParamCollection>,
    pub json: Option<String>,
}

impl RequestSnapshot {
    pub fn body_kind(&self) -> BodyKind {
        BodyKind::from_content_type(self.content_type.as_deref())
    }
}

/// Buffer the body and snapshot the request.
///
/// A body that fails mid-stream (client gone) degrades to an empty body;
/// the request still runs.
pub async fn ingest<B>(request: Request<B>) -> RequestSnapshot
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = request.into_parts();
    let body = match body.collect().await {
        Ok(collected) => RequestBody::new(collected.to_bytes()),
        Err(e) => {
            warn!(error = %e, "failed to read request body, continuing with an empty body");
            RequestBody::default()
        }
    };

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let content_length = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    let mut form = None;
    let mut json = None;
    match BodyKind::from_content_type(content_type.as_deref()) {
        BodyKind::Form => {
            form = Some(ParamCollection::parse(&body.read_to_string(content_length)));
            body.rewind();
        }
        BodyKind::Json => {
            json = Some(body.read_to_string(content_length));
            body.rewind();
        }
        BodyKind::Other => {}
    }

    let raw_query = parts.uri.query().unwrap_or_default().to_string();
    RequestSnapshot {
        method: parts.method.as_str().to_string(),
        path: percent_decode(parts.uri.path()),
        query: ParamCollection::parse(&raw_query),
        raw_query,
        cookies: parse_cookies(&parts.headers),
        headers: header_pairs(&parts.headers),
        content_type,
        content_length,
        body,
        form,
        json,
    }
}

/// Parse every `Cookie` header. The first occurrence of a name wins.
pub fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for value in headers.get_all(COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            cookies
                .entry(name.to_string())
                .or_insert_with(|| percent_decode(value.trim()));
        }
    }
    cookies
}
