//! scriptgate-trigger — HTTP trigger for controller scripts.
//!
//! Bridges inbound HTTP requests to a [`ScriptEngine`]: every request that
//! the static responder does not serve runs the site's controller script
//! once, in its own session, and the script's output becomes the response.
//!
//! # Architecture
//!
//! ```text
//! HTTP client
//!   │
//!   ▼
//! hyper server (HttpTrigger)
//!   │
//!   ├── StaticFiles::try_serve ──► file response
//!   │
//!   ├── ingest         Request → RequestSnapshot (buffered, rewindable body)
//!   ├── build_context  RequestSnapshot → ExecutionContext
//!   ├── ScriptEngine::invoke
//!   │     ├── Ok(ExecutionOutput) → assemble → ResponseDraft
//!   │     └── Err(EngineFault)    → ResponseDraft::fault (500)
//!   │
//!   ▼
//! HTTP response
//! ```
//!
//! [`ScriptEngine`]: scriptgate_core::ScriptEngine

pub mod assemble;
pub mod binder;
pub mod bridge;
pub mod convert;
pub mod handler;
pub mod ingest;
pub mod static_files;

pub use assemble::{DraftBody, ResponseDraft};
pub use bridge::Bridge;
pub use handler::{HttpTrigger, RequestHandler};
pub use static_files::StaticFiles;
