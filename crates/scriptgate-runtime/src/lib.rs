//! scriptgate-runtime — Rhai script sessions for the HTTP bridge.
//!
//! Implements [`ScriptEngine`] on top of Rhai. Every invocation gets:
//!
//! - **A fresh session**: a new `rhai::Engine` and `Scope`, built on a
//!   blocking worker thread and dropped when the script finishes
//! - **The request bindings**: `_GET`, `_COOKIE`, `_RAWPOSTDATASTREAM` and
//!   friends, installed as constants or variables
//! - **Resource limits**: operation, call-depth and size caps plus a
//!   wall-clock timeout, see [`ScriptLimits`]
//! - **Cancellation**: if the awaiting request future is dropped, the
//!   script is terminated at its next progress check
//!
//! # Architecture
//!
//! ```text
//! ScriptRuntime::invoke
//!   ├── load controller source (tokio::fs)
//!   └── spawn_blocking
//!       └── session::execute
//!           ├── Engine::new + limits + api::register
//!           ├── Scope ← ExecutionContext bindings
//!           ├── compile / eval → emissions + diagnostics
//!           └── read back _HEADERS, _STATUSCODE, _BINARYRESPONSE
//! ```

mod api;
pub mod conversions;
pub mod limiter;
mod session;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use scriptgate_core::config::LimitsConfig;
use scriptgate_core::{EngineFault, ExecutionContext, ExecutionOutput, ScriptEngine};
use tracing::debug;

pub use limiter::{CancelFlag, ScriptLimits};

/// The Rhai-backed script engine.
///
/// Holds no per-request state, so one instance serves every request.
#[derive(Debug, Clone, Default)]
pub struct ScriptRuntime {
    limits: ScriptLimits,
}

impl ScriptRuntime {
    pub fn new(limits: ScriptLimits) -> Self {
        Self { limits }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LimitsConfig) -> Self {
        Self::new(ScriptLimits::from_config(config))
    }

    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }
}

#[async_trait]
impl ScriptEngine for ScriptRuntime {
    async fn invoke(
        &self,
        script: &Path,
        context: ExecutionContext,
    ) -> Result<ExecutionOutput, EngineFault> {
        let source = load_script(script).await?;
        debug!(script = %script.display(), bytes = source.len(), "starting script session");

        let cancel = CancelFlag::default();
        let _guard = cancel.guard();

        let path = script.to_path_buf();
        let limits = self.limits.clone();
        tokio::task::spawn_blocking(move || {
            session::execute(&path, &source, context, &limits, cancel)
        })
        .await
        .map_err(|err| EngineFault::Worker(err.to_string()))?
    }
}

async fn load_script(script: &Path) -> Result<String, EngineFault> {
    tokio::fs::read_to_string(script)
        .await
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => EngineFault::ScriptNotFound(PathBuf::from(script)),
            _ => EngineFault::ScriptUnreadable {
                path: script.to_path_buf(),
                reason: err.to_string(),
            },
        })
}
