//! tplexpr-run - renders one template from a template directory
//!
//! Loads every matching file below a directory into a store, then writes the
//! named template to stdout. Variables come from an optional JSON object
//! file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context as _};
use clap::Parser;
use tplexpr::{Value, Vars};
use tplexpr_store::Store;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tplexpr-run")]
#[command(about = "Render a tplexpr template from a template directory")]
struct Cli {
    /// Directory holding the templates
    dir: PathBuf,

    /// Template name, relative to the directory (e.g. `pages/index.html`)
    template: String,

    /// JSON file with an object of variables
    #[arg(long)]
    vars: Option<PathBuf>,

    /// File extension to load (repeatable; all files when omitted)
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Do not install the builtin function library
    #[arg(long)]
    no_builtins: bool,

    /// Print the compiled program as JSON instead of rendering
    #[arg(long)]
    dump_bytecode: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tplexpr_run=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    info!("Loading templates from: {}", cli.dir.display());
    let mut store = Store::builder()
        .add_dir(&cli.dir, &cli.extensions)
        .builtins(!cli.no_builtins)
        .build()
        .with_context(|| format!("failed to load {}", cli.dir.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.dump_bytecode {
        let ctx = store.context()?;
        serde_json::to_writer_pretty(&mut out, ctx.program())?;
        writeln!(out)?;
        return Ok(());
    }

    let vars = match &cli.vars {
        Some(path) => load_vars(path)?,
        None => Vars::new(),
    };
    info!(template = %cli.template, vars = vars.len(), "rendering");
    store
        .render(&cli.template, &vars, &mut out)
        .with_context(|| format!("failed to render '{}'", cli.template))?;
    out.flush()?;
    Ok(())
}

fn load_vars(path: &Path) -> anyhow::Result<Vars> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let serde_json::Value::Object(map) = json else {
        bail!("{} must contain a JSON object", path.display());
    };
    Ok(map
        .into_iter()
        .map(|(name, value)| (name, Value::from_json(value)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_vars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.json");
        fs::write(&path, r#"{"name": "Sina", "tags": ["a", "b"], "n": 2}"#).unwrap();

        let vars = load_vars(&path).unwrap();
        assert_eq!(
            vars.keys().map(String::as_str).collect::<Vec<_>>(),
            ["name", "tags", "n"]
        );
        assert_eq!(vars["name"], Value::from("Sina"));
        assert_eq!(vars["n"], Value::Number(2.0));
    }

    #[test]
    fn test_load_vars_requires_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.json");
        fs::write(&path, "[1, 2]").unwrap();

        let err = load_vars(&path).unwrap_err();
        assert!(err.to_string().ends_with("must contain a JSON object"));
    }

    #[test]
    fn test_cli_args() {
        let cli = Cli::try_parse_from([
            "tplexpr-run",
            "site",
            "index.html",
            "--ext",
            "html",
            "--ext",
            "txt",
            "--no-builtins",
        ])
        .unwrap();
        assert_eq!(cli.extensions, ["html", "txt"]);
        assert!(cli.no_builtins);
        assert!(!cli.dump_bytecode);
        assert!(cli.vars.is_none());
    }
}
