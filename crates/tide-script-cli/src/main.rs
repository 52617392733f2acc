//! tide-script - command-line host for pluggable script evaluators
//!
//! Installs the built-in evaluators and exposes dispatch as subcommands:
//!
//! - `can-evaluate`: is there an evaluator for a mime type?
//! - `can-preprocess`: is there a preprocessor for a URL?
//! - `evaluate`: run code through the first matching evaluator
//! - `preprocess`: load a URL through the first matching preprocessor
//! - `list`: registered evaluators in priority order

mod builtin;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use tide_script::{EvaluatorRegistry, ScopeHandle, ScriptConfig, ScriptDispatcher};

#[derive(Parser)]
#[command(name = "tide-script")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate embedded scripts and preprocess app URLs", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "TIDE_SCRIPT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether some evaluator handles a mime type
    CanEvaluate {
        /// Mime type, e.g. "application/json"
        mime_type: String,
    },

    /// Check whether some evaluator preprocesses a URL
    CanPreprocess {
        /// URL, e.g. "app://index.html"
        url: String,
    },

    /// Evaluate code with the first capable evaluator
    Evaluate {
        /// Mime type of the code
        #[arg(short, long)]
        mime: String,

        /// Origin of the code (defaults to the file path or "inline")
        #[arg(short, long)]
        name: Option<String>,

        /// Code to evaluate
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        code: Option<String>,

        /// Read the code from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Preprocess a URL and print {"mimeType", "data"} as JSON
    Preprocess {
        /// URL to preprocess
        url: String,
    },

    /// List registered evaluators in priority order
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    // Setup logging
    let logging = config.logging.clone().with_overrides(cli.verbose, cli.json);
    tide_script::init_from_config(&logging);
    debug!(?config, "configuration loaded");

    let registry = Arc::new(EvaluatorRegistry::with_config(config.registry.clone()));
    let dispatcher = ScriptDispatcher::new(registry);
    builtin::install(&dispatcher, &config.evaluators);

    match cli.command {
        Commands::CanEvaluate { mime_type } => {
            println!("{}", dispatcher.can_evaluate(&mime_type));
            Ok(())
        }
        Commands::CanPreprocess { url } => {
            println!("{}", dispatcher.can_preprocess(&url));
            Ok(())
        }
        Commands::Evaluate {
            mime,
            name,
            code,
            file,
        } => cmd_evaluate(&dispatcher, &mime, name, code, file.as_deref()).await,
        Commands::Preprocess { url } => cmd_preprocess(&dispatcher, &url).await,
        Commands::List => {
            for (position, name) in dispatcher.registry().names().iter().enumerate() {
                println!("{position}\t{name}");
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ScriptConfig> {
    let config = match path {
        Some(path) => ScriptConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScriptConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid TIDE_SCRIPT_* environment override")
}

async fn cmd_evaluate(
    dispatcher: &ScriptDispatcher,
    mime_type: &str,
    name: Option<String>,
    code: Option<String>,
    file: Option<&Path>,
) -> Result<()> {
    let (name, code) = match (code, file) {
        (Some(code), _) => (name.unwrap_or_else(|| "inline".to_string()), code),
        (None, Some(file)) => {
            let code = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            (name.unwrap_or_else(|| file.display().to_string()), code)
        }
        (None, None) => anyhow::bail!("either --code or --file is required"),
    };

    let value = dispatcher
        .evaluate(mime_type, &name, &code, &ScopeHandle::empty())
        .await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn cmd_preprocess(dispatcher: &ScriptDispatcher, url: &str) -> Result<()> {
    let result = dispatcher.preprocess(url, &ScopeHandle::empty()).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_evaluate_requires_code_or_file() {
        assert!(Cli::try_parse_from(["tide-script", "evaluate", "--mime", "text/plain"]).is_err());
        assert!(Cli::try_parse_from([
            "tide-script",
            "evaluate",
            "--mime",
            "text/plain",
            "--code",
            "x",
            "--file",
            "a.txt",
        ])
        .is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tide.toml");
        std::fs::write(&path, "[registry]\nallow_duplicates = false\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert!(!config.registry.allow_duplicates);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
