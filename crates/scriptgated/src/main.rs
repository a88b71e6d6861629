//! scriptgated — the scriptgate daemon.
//!
//! Serves one site: static files from its public directory, everything
//! else through the site's controller script.
//!
//! # Usage
//!
//! ```text
//! scriptgated init mysite
//! scriptgated serve --config mysite/scriptgate.toml --bind 0.0.0.0:8080
//! DEBUG=TRUE scriptgated serve --root mysite
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

const DEFAULT_FILTER: &str = "info,scriptgate=debug";

#[derive(Parser)]
#[command(
    name = "scriptgated",
    about = "scriptgate — run a controller script for every HTTP request",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a site.
    Serve {
        /// Path to scriptgate.toml. Defaults to ./scriptgate.toml if present.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on, overriding [server].bind.
        #[arg(short, long)]
        bind: Option<String>,

        /// Site directory, overriding [site].root.
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
    /// Scaffold a new site: config, controller script and public directory.
    Init {
        /// Directory to create the site in.
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Command::Serve { config, bind, root } => {
            commands::serve::serve(config.as_deref(), bind.as_deref(), root.as_deref()).await
        }
        Command::Init { dir } => commands::init::init(&dir),
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_FILTER)?,
    };
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::parse_from([
            "scriptgated",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--root",
            "site",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Serve { config, bind, root } => {
                assert!(config.is_none());
                assert_eq!(bind.as_deref(), Some("0.0.0.0:9000"));
                assert_eq!(root, Some(PathBuf::from("site")));
            }
            Command::Init { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn init_defaults_to_current_dir() {
        let cli = Cli::parse_from(["scriptgated", "init"]);
        match cli.command {
            Command::Init { dir } => assert_eq!(dir, PathBuf::from(".")),
            Command::Serve { .. } => panic!("expected init"),
        }
    }
}
