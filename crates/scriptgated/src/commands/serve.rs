use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use scriptgate_core::GateConfig;
use scriptgate_runtime::ScriptRuntime;
use scriptgate_trigger::{Bridge, HttpTrigger};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "scriptgate.toml";

pub async fn serve(
    config_path: Option<&Path>,
    bind: Option<&str>,
    root: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(config_path, bind, root)?;
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {:?}", config.server.bind))?;

    let controller = config.controller_path();
    if !controller.is_file() {
        warn!(path = %controller.display(), "controller script not found, requests will fail with 500");
    }
    info!(
        root = %config.site.root.display(),
        controller = %controller.display(),
        public = ?config.public_dir(),
        debug_env = %config.debug.env_var,
        "scriptgate starting"
    );

    let runtime = Arc::new(ScriptRuntime::from_config(&config.limits));
    let bridge = Arc::new(Bridge::from_config(runtime, &config));
    let trigger = HttpTrigger::new(addr, bridge.into_handler());

    // Graceful shutdown on Ctrl-C.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(error = %e, "failed to listen for Ctrl-C, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    trigger.serve(shutdown_rx).await?;
    info!("scriptgate stopped");
    Ok(())
}

/// Load the config and apply command-line overrides.
///
/// A relative `[site].root` in a config file is relative to that file.
pub fn load_config(
    config_path: Option<&Path>,
    bind: Option<&str>,
    root: Option<&Path>,
) -> anyhow::Result<GateConfig> {
    let default_path = Path::new(DEFAULT_CONFIG);
    let path = match config_path {
        Some(path) => Some(path),
        None if default_path.is_file() => Some(default_path),
        None => None,
    };

    let mut config = match path {
        Some(path) => {
            let mut config = GateConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            if config.site.root.is_relative() {
                let base = path.parent().unwrap_or_else(|| Path::new(""));
                config.site.root = base.join(&config.site.root);
            }
            info!(path = %path.display(), "configuration loaded");
            config
        }
        None => GateConfig::default(),
    };

    if let Some(root) = root {
        config.site.root = root.to_path_buf();
    }
    if let Some(bind) = bind {
        config.server.bind = bind.to_string();
    }
    Ok(config)
}
