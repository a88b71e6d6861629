//! Static file responder for the site's public directory.
//!
//! Runs before the bridge. Anything it cannot serve (other methods, hidden
//! or escaping paths, missing files) falls through to the controller script.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use scriptgate_core::params::percent_decode;
use tracing::debug;

const INDEX: &str = "index.html";

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Serve `path` if it names a file under the root. `None` means the
    /// request is not ours.
    pub async fn try_serve(&self, method: &Method, path: &str) -> Option<Response<Full<Bytes>>> {
        if method != Method::GET && method != Method::HEAD {
            return None;
        }
        let relative = sanitize_path(&percent_decode(path))?;
        let mut full_path = self.root.join(relative);

        let mut meta = tokio::fs::metadata(&full_path).await.ok()?;
        if meta.is_dir() {
            full_path.push(INDEX);
            meta = tokio::fs::metadata(&full_path).await.ok()?;
        }
        if !meta.is_file() {
            return None;
        }

        let content = tokio::fs::read(&full_path).await.ok()?;
        debug!(path = %full_path.display(), bytes = content.len(), "serving static file");

        let length = content.len();
        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(content)
        };
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime_type(&full_path)));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        Some(response)
    }
}

/// Relative path under the root, or `None` for hidden segments and `..`.
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let path = path.trim_start_matches('/');
    if path.split('/').any(|segment| segment.starts_with('.')) {
        return None;
    }

    let mut result = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(c) => result.push(c),
            Component::ParentDir => return None,
            _ => {}
        }
    }
    Some(result)
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext.to_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv",

        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        "woff" => "font/woff",
        "woff2" => "font/woff2",

        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "zip" => "application/zip",

        _ => "application/octet-stream",
    }
}
