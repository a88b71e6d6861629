use std::path::Path;

use anyhow::Context;
use scriptgate_core::GateConfig;

use super::serve::DEFAULT_CONFIG;

const CONTROLLER: &str = r#"// Runs once per request, in a fresh session.
//
// Request:  _GET _POST _COOKIE _JSONDATA _RAWPOSTDATASTREAM
//           _REQUEST_PATH _REQUEST_METHOD _HTTPCONTEXT
// Response: _STATUSCODE _HEADERS _BINARYRESPONSE, echo(), print()

let name = _GET["name"];
if name == () {
    name = "world";
}

_HEADERS["X-Powered-By"] = "scriptgate";

echo("<!DOCTYPE html>");
echo(`<link rel="stylesheet" href="/style.css">`);
echo(`<h1>Hello, ${name}!</h1>`);
echo(`<p>${_REQUEST_METHOD} ${_REQUEST_PATH}</p>`);
"#;

const STYLESHEET: &str = "body { font-family: sans-serif; margin: 2rem; }\n";

/// Scaffold a site in `dir`. Existing files are left alone.
pub fn init(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let config = GateConfig::scaffold(".");
    write_new(&dir.join(DEFAULT_CONFIG), &config.to_toml_string()?)?;
    write_new(&dir.join(&config.site.controller), CONTROLLER)?;

    if let Some(public) = &config.site.public {
        let public = dir.join(public);
        std::fs::create_dir_all(&public)
            .with_context(|| format!("failed to create {}", public.display()))?;
        write_new(&public.join("style.css"), STYLESHEET)?;
    }

    println!("Run it with: scriptgated serve --config {}", dir.join(DEFAULT_CONFIG).display());
    Ok(())
}

fn write_new(path: &Path, content: &str) -> anyhow::Result<()> {
    if path.exists() {
        println!("  {} exists, skipping", path.display());
        return Ok(());
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    println!("✓ Generated {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_scaffolds_a_site() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("mysite");
        init(&site).unwrap();

        let config = GateConfig::from_file(&site.join(DEFAULT_CONFIG)).unwrap();
        assert_eq!(config, GateConfig::scaffold("."));
        assert!(site.join("controller.rhai").is_file());
        assert!(site.join("public").join("style.css").is_file());
    }

    #[test]
    fn init_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("controller.rhai"), "echo(1);").unwrap();
        init(dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("controller.rhai")).unwrap(),
            "echo(1);"
        );
    }

    #[tokio::test]
    async fn scaffolded_controller_runs_cleanly() {
        use scriptgate_core::{Emission, ExecutionContext, ScriptEngine};
        use scriptgate_runtime::ScriptRuntime;

        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();

        let output = ScriptRuntime::with_defaults()
            .invoke(&dir.path().join("controller.rhai"), ExecutionContext::default())
            .await
            .unwrap();
        assert!(output.succeeded(), "{:?}", output.diagnostics);
        assert!(output
            .emissions
            .contains(&Emission::Text("<h1>Hello, world!</h1>".into())));
        assert_eq!(output.response.headers, vec![("X-Powered-By".to_string(), "scriptgate".to_string())]);
    }
}
