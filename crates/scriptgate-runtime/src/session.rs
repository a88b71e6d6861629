//! One script session: a fresh engine and scope per invocation.
//!
//! Nothing here is shared between requests. The engine, its scope and the
//! output sink are created in [`execute`] and dropped when it returns, so a
//! variable, function or registered callback from one request can never be
//! observed by the next.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use rhai::{Dynamic, Engine, INT, Map, Scope};
use scriptgate_core::{
    Diagnostic, Emission, EngineFault, ExecutionContext, ExecutionOutput, ResponseBindings,
    bindings,
};
use tracing::debug;

use crate::api;
use crate::conversions::{
    binary_from_dynamic, cookie_map, eval_diagnostic, headers_from_dynamic, parse_diagnostic,
    push_emissions, status_from_dynamic,
};
use crate::limiter::{CancelFlag, ScriptLimits};

/// Collects everything a script emits, in order.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputSink(Rc<RefCell<Collected>>);

#[derive(Debug, Default)]
struct Collected {
    emissions: Vec<Emission>,
    diagnostics: Vec<Diagnostic>,
}

impl OutputSink {
    pub(crate) fn emit(&self, value: Dynamic) {
        push_emissions(value, &mut self.0.borrow_mut().emissions);
    }

    pub(crate) fn emit_text(&self, text: &str) {
        self.0
            .borrow_mut()
            .emissions
            .push(Emission::Text(text.to_string()));
    }

    pub(crate) fn diagnose(&self, diagnostic: Diagnostic) {
        self.0.borrow_mut().diagnostics.push(diagnostic);
    }

    pub(crate) fn take(&self) -> (Vec<Emission>, Vec<Diagnostic>) {
        let mut collected = self.0.borrow_mut();
        (
            std::mem::take(&mut collected.emissions),
            std::mem::take(&mut collected.diagnostics),
        )
    }
}

/// Run `source` once against `context`. Blocking; call it off the async
/// runtime.
pub(crate) fn execute(
    script: &Path,
    source: &str,
    context: ExecutionContext,
    limits: &ScriptLimits,
    cancel: CancelFlag,
) -> Result<ExecutionOutput, EngineFault> {
    let script_name = script.display().to_string();
    let sink = OutputSink::default();

    let mut engine = Engine::new();
    limits.apply(&mut engine, cancel);
    api::register(&mut engine, &sink, &script_name);

    let mut scope = Scope::new();
    install_bindings(&mut scope, context);

    match engine.compile(source) {
        Ok(mut ast) => {
            ast.set_source(script_name.as_str());
            match engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast) {
                Ok(value) => sink.emit(value),
                Err(err) => sink.diagnose(eval_diagnostic(&script_name, &err)),
            }
        }
        Err(err) => sink.diagnose(parse_diagnostic(&script_name, &err)),
    }

    let response = read_back(&scope)?;
    let (emissions, diagnostics) = sink.take();
    debug!(
        script = %script_name,
        emissions = emissions.len(),
        diagnostics = diagnostics.len(),
        status = response.status,
        "script session finished"
    );
    Ok(ExecutionOutput {
        emissions,
        diagnostics,
        response,
    })
}

fn install_bindings(scope: &mut Scope, context: ExecutionContext) {
    let ExecutionContext {
        query,
        cookies,
        path,
        method,
        http_context,
        form,
        json,
        body,
        response,
    } = context;

    scope
        .push_constant(bindings::GET, query)
        .push_constant(bindings::COOKIE, cookie_map(&cookies))
        .push_constant(bindings::REQUEST_PATH, path)
        .push_constant(bindings::REQUEST_METHOD, method)
        .push_constant(bindings::HTTPCONTEXT, http_context);
    if let Some(form) = form {
        scope.push_constant(bindings::POST, form);
    }
    if let Some(json) = json {
        scope.push_constant(bindings::JSONDATA, json);
    }

    let headers: Map = response
        .headers
        .into_iter()
        .map(|(name, value)| (name.into(), Dynamic::from(value)))
        .collect();
    scope
        .push(bindings::RAWPOSTDATASTREAM, body)
        .push(bindings::HEADERS, headers)
        .push(bindings::STATUSCODE, response.status as INT)
        .push(bindings::BINARYRESPONSE, Dynamic::from_blob(response.binary));

    for name in bindings::ALL {
        if scope.contains(name) {
            debug!(
                binding = name,
                mutable = bindings::MUTABLE.contains(&name),
                "bound {}",
                bindings::describe(name)
            );
        }
    }
}

/// Final values of the script-writable bindings.
fn read_back(scope: &Scope) -> Result<ResponseBindings, EngineFault> {
    let defaults = ResponseBindings::default();
    let value = |name: &str| scope.get_value::<Dynamic>(name);

    let headers = match value(bindings::HEADERS) {
        Some(headers) => headers_from_dynamic(&headers)?,
        None => defaults.headers,
    };
    let status = match value(bindings::STATUSCODE) {
        Some(status) => status_from_dynamic(&status)?,
        None => defaults.status,
    };
    let binary = match value(bindings::BINARYRESPONSE) {
        Some(binary) => binary_from_dynamic(&binary)?,
        None => defaults.binary,
    };
    Ok(ResponseBindings {
        headers,
        status,
        binary,
    })
}
