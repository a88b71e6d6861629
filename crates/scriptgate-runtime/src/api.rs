//! Functions and types a controller script can use.

use rhai::{Blob, Dynamic, Engine, ImmutableString, INT, Map};
use scriptgate_core::{Diagnostic, HttpContext, ParamCollection, RequestBody};

use crate::conversions::{dynamic_to_json, json_to_dynamic, string_map, to_int};
use crate::session::OutputSink;

/// Register the output functions, the JSON helpers and the request types
/// on a fresh engine. Output goes to `sink`.
pub(crate) fn register(engine: &mut Engine, sink: &OutputSink, script: &str) {
    register_output(engine, sink, script);
    register_params(engine);
    register_body(engine);
    register_http_context(engine);

    engine
        .register_fn("from_json", |text: &str| json_to_dynamic(text))
        .register_fn("to_json", |value: Dynamic| dynamic_to_json(value));
}

fn register_output(engine: &mut Engine, sink: &OutputSink, script: &str) {
    let printed = sink.clone();
    engine.on_print(move |text| printed.emit_text(text));

    engine.on_debug(|text, source, position| {
        tracing::debug!(source = source.unwrap_or("<script>"), %position, "{text}");
    });

    let echoed = sink.clone();
    engine.register_fn("echo", move |value: Dynamic| echoed.emit(value));

    let errors = sink.clone();
    let trace = format!("at <script>, {script}");
    engine.register_fn("error", move |message: ImmutableString| {
        errors.diagnose(Diagnostic::new(message.as_str(), trace.as_str()));
    });
}

fn register_params(engine: &mut Engine) {
    engine
        .register_type_with_name::<ParamCollection>("ParamCollection")
        .register_indexer_get(|params: &mut ParamCollection, key: ImmutableString| {
            params.get(key.as_str()).map_or(Dynamic::UNIT, Dynamic::from)
        })
        .register_fn("all", |params: &mut ParamCollection, key: ImmutableString| {
            params
                .get_all(key.as_str())
                .into_iter()
                .map(|value| Dynamic::from(value.to_string()))
                .collect::<rhai::Array>()
        })
        .register_fn("keys", |params: &mut ParamCollection| {
            params
                .keys()
                .into_iter()
                .map(|key| Dynamic::from(key.to_string()))
                .collect::<rhai::Array>()
        })
        .register_fn("contains", |params: &mut ParamCollection, key: ImmutableString| {
            params.contains(key.as_str())
        })
        .register_get("len", |params: &mut ParamCollection| to_int(params.len()))
        .register_fn("to_string", |params: &mut ParamCollection| params.to_string())
        .register_fn("to_debug", |params: &mut ParamCollection| {
            format!("ParamCollection({params})")
        });
}

fn register_body(engine: &mut Engine) {
    engine
        .register_type_with_name::<RequestBody>("BodyStream")
        .register_fn("read", |body: &mut RequestBody, max: INT| -> Blob {
            let max = usize::try_from(max).unwrap_or(0);
            body.read(max).to_vec()
        })
        .register_fn("read_all", |body: &mut RequestBody| -> Blob {
            body.read_to_end().to_vec()
        })
        .register_fn("read_string", |body: &mut RequestBody| {
            body.read_to_string(None)
        })
        .register_fn("rewind", |body: &mut RequestBody| body.rewind())
        .register_fn("seek", |body: &mut RequestBody, position: INT| {
            to_int(body.seek(usize::try_from(position).unwrap_or(0)))
        })
        .register_get("position", |body: &mut RequestBody| to_int(body.position()))
        .register_get("len", |body: &mut RequestBody| to_int(body.len()))
        .register_fn("to_string", |body: &mut RequestBody| {
            format!("BodyStream({} bytes)", body.len())
        });
}

fn register_http_context(engine: &mut Engine) {
    engine
        .register_type_with_name::<HttpContext>("HttpContext")
        .register_get("method", |ctx: &mut HttpContext| ctx.method.clone())
        .register_get("path", |ctx: &mut HttpContext| ctx.path.clone())
        .register_get("query", |ctx: &mut HttpContext| ctx.query.clone())
        .register_get("headers", |ctx: &mut HttpContext| -> Map {
            string_map(ctx.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        })
        .register_get("content_type", |ctx: &mut HttpContext| {
            ctx.content_type.clone().map_or(Dynamic::UNIT, Dynamic::from)
        })
        .register_get("content_length", |ctx: &mut HttpContext| {
            ctx.content_length
                .map_or(Dynamic::UNIT, |len| Dynamic::from(INT::try_from(len).unwrap_or(INT::MAX)))
        });
}
