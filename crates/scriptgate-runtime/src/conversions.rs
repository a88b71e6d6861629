//! Conversions between Rhai values and scriptgate types.

use std::collections::BTreeMap;

use rhai::{Array, Blob, Dynamic, EvalAltResult, INT, Map, ParseError, Position};
use scriptgate_core::{Diagnostic, EngineFault, Emission, bindings};

/// Classify one emitted value. A blob becomes one binary unit per byte,
/// unit is dropped, anything else is a single text emission.
pub fn push_emissions(value: Dynamic, out: &mut Vec<Emission>) {
    if value.is_unit() {
        return;
    }
    if value.is::<Blob>() {
        let blob = value.try_cast::<Blob>().unwrap_or_default();
        out.extend(blob.into_iter().map(Emission::Byte));
        return;
    }
    out.push(Emission::Text(value.to_string()));
}

pub fn string_map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Map {
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), Dynamic::from(value.to_string())))
        .collect()
}

pub fn cookie_map(cookies: &BTreeMap<String, String>) -> Map {
    string_map(cookies.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

pub fn to_int(value: usize) -> INT {
    INT::try_from(value).unwrap_or(INT::MAX)
}

/// `_HEADERS` after the run: a map whose values are rendered as text.
pub fn headers_from_dynamic(value: &Dynamic) -> Result<Vec<(String, String)>, EngineFault> {
    if value.is_unit() {
        return Ok(Vec::new());
    }
    match value.clone().try_cast::<Map>() {
        Some(map) => Ok(map
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()),
        None => Err(invalid(bindings::HEADERS, "map", value)),
    }
}

/// `_STATUSCODE` after the run. Integers, integral floats and numeric
/// strings are accepted.
pub fn status_from_dynamic(value: &Dynamic) -> Result<i64, EngineFault> {
    if let Ok(code) = value.as_int() {
        return Ok(code);
    }
    if let Ok(code) = value.as_float() {
        if code.fract() == 0.0 && code.abs() <= i64::MAX as f64 {
            return Ok(code as i64);
        }
    }
    if value.is_string() {
        if let Some(code) = value
            .clone()
            .into_string()
            .ok()
            .and_then(|text| text.trim().parse::<i64>().ok())
        {
            return Ok(code);
        }
    }
    Err(invalid(bindings::STATUSCODE, "integer", value))
}

/// `_BINARYRESPONSE` after the run: a blob, or an array of byte-sized integers.
pub fn binary_from_dynamic(value: &Dynamic) -> Result<Vec<u8>, EngineFault> {
    if value.is_unit() {
        return Ok(Vec::new());
    }
    if let Some(blob) = value.clone().try_cast::<Blob>() {
        return Ok(blob);
    }
    if let Some(array) = value.clone().try_cast::<Array>() {
        return array
            .iter()
            .map(|item| {
                item.as_int()
                    .ok()
                    .and_then(|byte| u8::try_from(byte).ok())
                    .ok_or_else(|| invalid(bindings::BINARYRESPONSE, "blob", item))
            })
            .collect();
    }
    Err(invalid(bindings::BINARYRESPONSE, "blob", value))
}

fn invalid(name: &'static str, expected: &'static str, found: &Dynamic) -> EngineFault {
    EngineFault::InvalidBinding {
        name,
        expected,
        found: found.type_name().to_string(),
    }
}

pub fn parse_diagnostic(script: &str, err: &ParseError) -> Diagnostic {
    Diagnostic::new(
        format!("Syntax error: {}", err.0),
        frame("<script>", script, err.1),
    )
}

/// Turn a Rhai runtime error into a diagnostic with a call trace,
/// innermost frame first.
pub fn eval_diagnostic(script: &str, err: &EvalAltResult) -> Diagnostic {
    let mut calls: Vec<(&str, Position)> = Vec::new();
    let mut current = err;
    loop {
        match current {
            EvalAltResult::ErrorInFunctionCall(name, _, inner, position) => {
                calls.push((name.as_str(), *position));
                current = inner;
            }
            EvalAltResult::ErrorInModule(name, inner, position) => {
                calls.push((name.as_str(), *position));
                current = inner;
            }
            _ => break,
        }
    }

    let frame_name = |depth: usize| match depth {
        0 => "<script>".to_string(),
        depth => format!("{}()", calls[depth - 1].0),
    };

    let mut lines = vec![frame(&frame_name(calls.len()), script, current.position())];
    for depth in (0..calls.len()).rev() {
        lines.push(frame(&frame_name(depth), script, calls[depth].1));
    }

    let message = match current {
        EvalAltResult::ErrorTerminated(token, _) => format!("Script terminated: {token}"),
        other => other.to_string(),
    };
    Diagnostic::new(message, lines.join("\n"))
}

fn frame(name: &str, script: &str, position: Position) -> String {
    if position.is_none() {
        format!("at {name}, {script}")
    } else {
        format!("at {name}, {script}: {position}")
    }
}

pub fn json_to_dynamic(text: &str) -> Result<Dynamic, Box<EvalAltResult>> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
    rhai::serde::to_dynamic(value)
}

pub fn dynamic_to_json(value: Dynamic) -> Result<String, Box<EvalAltResult>> {
    let value: serde_json::Value = rhai::serde::from_dynamic(&value)?;
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Engine;

    #[test]
    fn blobs_become_bytes() {
        let mut out = Vec::new();
        push_emissions(Dynamic::from_blob(vec![1, 2]), &mut out);
        push_emissions(Dynamic::from("text".to_string()), &mut out);
        push_emissions(Dynamic::UNIT, &mut out);
        push_emissions(Dynamic::from(42 as INT), &mut out);
        assert_eq!(
            out,
            vec![
                Emission::Byte(1),
                Emission::Byte(2),
                Emission::Text("text".into()),
                Emission::Text("42".into()),
            ]
        );
    }

    #[test]
    fn headers_read_back_from_map() {
        let mut map = Map::new();
        map.insert("Content-Type".into(), Dynamic::from("application/xml".to_string()));
        map.insert("X-Count".into(), Dynamic::from(3 as INT));
        let headers = headers_from_dynamic(&Dynamic::from_map(map)).unwrap();
        assert_eq!(
            headers,
            vec![
                ("Content-Type".to_string(), "application/xml".to_string()),
                ("X-Count".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn headers_reject_non_maps() {
        let err = headers_from_dynamic(&Dynamic::from(5 as INT)).unwrap_err();
        assert!(err.to_string().contains(bindings::HEADERS));
    }

    #[test]
    fn status_accepts_numeric_forms() {
        assert_eq!(status_from_dynamic(&Dynamic::from(404 as INT)).unwrap(), 404);
        assert_eq!(status_from_dynamic(&Dynamic::from("201".to_string())).unwrap(), 201);
        assert_eq!(status_from_dynamic(&Dynamic::from(302.0_f64)).unwrap(), 302);
        assert!(status_from_dynamic(&Dynamic::from("teapot".to_string())).is_err());
        assert!(status_from_dynamic(&Dynamic::from(2.5_f64)).is_err());
    }

    #[test]
    fn binary_accepts_blobs_and_byte_arrays() {
        assert_eq!(
            binary_from_dynamic(&Dynamic::from_blob(vec![7, 8])).unwrap(),
            vec![7, 8]
        );
        let array: Array = vec![Dynamic::from(65 as INT), Dynamic::from(66 as INT)];
        assert_eq!(binary_from_dynamic(&Dynamic::from_array(array)).unwrap(), b"AB");
        let array: Array = vec![Dynamic::from(300 as INT)];
        assert!(binary_from_dynamic(&Dynamic::from_array(array)).is_err());
        assert!(binary_from_dynamic(&Dynamic::from("x".to_string())).is_err());
        assert!(binary_from_dynamic(&Dynamic::UNIT).unwrap().is_empty());
    }

    #[test]
    fn eval_trace_lists_function_frames() {
        let engine = Engine::new();
        let err = engine
            .run("fn inner() { throw \"boom\"; }\nfn outer() { inner() }\nouter();")
            .unwrap_err();
        let diagnostic = eval_diagnostic("controller.rhai", &err);
        assert!(diagnostic.message.contains("boom"));
        let frames: Vec<&str> = diagnostic.trace.lines().collect();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with("at inner()"));
        assert!(frames[1].starts_with("at outer()"));
        assert!(frames[2].starts_with("at <script>"));
        assert!(frames.iter().all(|f| f.contains("controller.rhai")));
    }

    #[test]
    fn parse_errors_become_diagnostics() {
        let engine = Engine::new();
        let err = engine.compile("let = ;").unwrap_err();
        let diagnostic = parse_diagnostic("controller.rhai", &err);
        assert!(diagnostic.message.starts_with("Syntax error"));
        assert!(diagnostic.trace.contains("controller.rhai"));
    }

    #[test]
    fn json_roundtrips_through_rhai_values() {
        let value = json_to_dynamic(r#"{"name":"ada","tags":[1,2]}"#).unwrap();
        let map = value.clone().try_cast::<Map>().unwrap();
        assert_eq!(map["name"].to_string(), "ada");
        let text = dynamic_to_json(value).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["tags"][1], 2);
        assert!(json_to_dynamic("{nope").is_err());
    }
}
