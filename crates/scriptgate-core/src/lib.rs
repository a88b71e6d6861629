//! scriptgate-core — types shared by the scriptgate crates.
//!
//! Everything here lives for exactly one request: the [`ExecutionContext`]
//! built from an inbound request, the [`ExecutionOutput`] a script engine
//! hands back, and the [`ScriptEngine`] seam between the two. The only
//! process-wide piece is [`GateConfig`], which is read-only once loaded.

pub mod bindings;
pub mod body;
pub mod config;
pub mod engine;
pub mod params;
pub mod types;

pub use body::RequestBody;
pub use config::{DebugMode, GateConfig};
pub use engine::{EngineFault, ScriptEngine};
pub use params::ParamCollection;
pub use types::*;
