//! The script engine seam.
//!
//! The HTTP side only knows this trait. Script problems travel as data in
//! [`ExecutionOutput::diagnostics`]; an [`EngineFault`] means the engine
//! could not carry out the run at all.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ExecutionContext, ExecutionOutput};

/// The engine itself failed. Response bindings are not available.
#[derive(Debug, Error)]
pub enum EngineFault {
    #[error("controller script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("failed to read controller script {}: {reason}", .path.display())]
    ScriptUnreadable { path: PathBuf, reason: String },

    #[error("cannot read back {name}: expected {expected}, found {found}")]
    InvalidBinding {
        name: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("script worker failed: {0}")]
    Worker(String),
}

/// Runs a controller script once, in a fresh session, against a context.
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    async fn invoke(
        &self,
        script: &Path,
        context: ExecutionContext,
    ) -> Result<ExecutionOutput, EngineFault>;
}
