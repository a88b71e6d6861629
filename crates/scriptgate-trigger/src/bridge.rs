//! The request pipeline: ingest → bind → invoke → assemble.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::{Body, Incoming};
use scriptgate_core::{DebugMode, GateConfig, ScriptEngine};
use tracing::{debug, error, warn};

use crate::assemble::{ResponseDraft, assemble};
use crate::binder::build_context;
use crate::convert::log_target;
use crate::handler::{HandlerFuture, RequestHandler};
use crate::ingest::ingest;
use crate::static_files::StaticFiles;

/// Routes every request to one controller script.
///
/// Holds only read-only configuration; all per-request state is created
/// inside [`Bridge::handle`].
pub struct Bridge {
    engine: Arc<dyn ScriptEngine>,
    controller: PathBuf,
    debug: DebugMode,
    statics: Option<StaticFiles>,
}

impl Bridge {
    pub fn new(engine: Arc<dyn ScriptEngine>, controller: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            controller: controller.into(),
            debug: DebugMode::default(),
            statics: None,
        }
    }

    pub fn with_debug(mut self, debug: DebugMode) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_static_files(mut self, statics: StaticFiles) -> Self {
        self.statics = Some(statics);
        self
    }

    /// Controller path, debug switch and public directory from the config.
    pub fn from_config(engine: Arc<dyn ScriptEngine>, config: &GateConfig) -> Self {
        let bridge = Self::new(engine, config.controller_path()).with_debug(config.debug_mode());
        match config.public_dir() {
            Some(dir) => bridge.with_static_files(StaticFiles::new(dir)),
            None => bridge,
        }
    }

    /// Serve a static file if one matches, otherwise run the controller.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Display,
    {
        if let Some(statics) = &self.statics {
            let path = request.uri().path().to_string();
            if let Some(response) = statics.try_serve(request.method(), &path).await {
                return response;
            }
        }
        self.run(request).await.into_response()
    }

    /// Run the controller script for `request`.
    pub async fn run<B>(&self, request: Request<B>) -> ResponseDraft
    where
        B: Body,
        B::Error: Display,
    {
        let target = log_target(request.uri());
        let method = request.method().clone();

        let snapshot = ingest(request).await;
        debug!(
            %method,
            %target,
            body_kind = ?snapshot.body_kind(),
            body_bytes = snapshot.body.len(),
            "request ingested"
        );
        let context = build_context(snapshot);

        let output = match self.engine.invoke(&self.controller, context).await {
            Ok(output) => output,
            Err(fault) => {
                error!(%method, %target, error = %fault, "script engine fault");
                return ResponseDraft::fault(&fault);
            }
        };

        for diagnostic in &output.diagnostics {
            warn!(
                %method,
                %target,
                trace = %diagnostic.trace,
                "script error: {}",
                diagnostic.message
            );
        }

        // Never cached.
        let show_diagnostics = self.debug.is_enabled();
        let draft = assemble(output, show_diagnostics);
        debug!(
            %method,
            %target,
            status = %draft.status,
            body_bytes = draft.body.as_bytes().len(),
            show_diagnostics,
            "response assembled"
        );
        draft
    }

    /// Wrap the bridge as an [`HttpTrigger`](crate::HttpTrigger) handler.
    pub fn into_handler(self: Arc<Self>) -> RequestHandler {
        Arc::new(move |request: Request<Incoming>| -> HandlerFuture {
            let bridge = self.clone();
            Box::pin(async move { Ok(bridge.handle(request).await) })
        })
    }
}
