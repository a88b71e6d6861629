//! Per-request data handed to and returned from a script engine.

use std::collections::BTreeMap;

use crate::bindings::{self, DEFAULT_STATUS};
use crate::body::RequestBody;
use crate::params::ParamCollection;

/// One value emitted by a script, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    Text(String),
    Byte(u8),
}

/// A script-level error record. Collected, never thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    /// Where it happened, innermost frame first, one frame per line.
    pub trace: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: trace.into(),
        }
    }
}

/// Read-only view of the request, exposed as `_HTTPCONTEXT`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpContext {
    pub method: String,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

/// Script-writable response state.
///
/// Passed into the session at its defaults and read back once the script
/// finishes: this is the out-parameter through which a script shapes the
/// response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBindings {
    /// Headers in the order the script's map yielded them.
    pub headers: Vec<(String, String)>,
    pub status: i64,
    pub binary: Vec<u8>,
}

impl Default for ResponseBindings {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            status: DEFAULT_STATUS,
            binary: Vec::new(),
        }
    }
}

/// Everything bound into one script invocation.
///
/// Built fresh for every request and moved into the engine; nothing in it
/// outlives the invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub query: ParamCollection,
    pub cookies: BTreeMap<String, String>,
    pub path: String,
    pub method: String,
    pub http_context: HttpContext,
    /// `Some` only for urlencoded form bodies.
    pub form: Option<ParamCollection>,
    /// `Some` only for JSON bodies.
    pub json: Option<String>,
    pub body: RequestBody,
    pub response: ResponseBindings,
}

impl ExecutionContext {
    /// Names of the bindings this context will install, in installation order.
    pub fn binding_names(&self) -> Vec<&'static str> {
        bindings::ALL
            .into_iter()
            .filter(|name| match *name {
                bindings::POST => self.form.is_some(),
                bindings::JSONDATA => self.json.is_some(),
                _ => true,
            })
            .collect()
    }
}

/// Result of a script run that the engine managed to carry out.
///
/// Script errors are in `diagnostics`; a run with diagnostics still has
/// output and response bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub emissions: Vec<Emission>,
    pub diagnostics: Vec<Diagnostic>,
    pub response: ResponseBindings,
}

impl ExecutionOutput {
    pub fn succeeded(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
