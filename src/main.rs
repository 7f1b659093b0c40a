use std::collections::BTreeMap;
use std::path::PathBuf;

/// Reset SIGPIPE to default behavior so piping (e.g. `tfeval eval . | jq`) exits cleanly
/// instead of panicking on broken pipe.
#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tfeval::hcl::classify::ENV_VAR_FILENAME;
use tfeval::hcl::driver;

/// tfeval - Terraform HCL2 module evaluator
#[derive(Parser)]
#[command(name = "tfeval", version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every file directly inside a directory, resolving variables and locals
    Eval {
        /// Directory containing .tf / .tfvars files
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    #[cfg(unix)]
    reset_sigpipe();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Eval { ref dir } => cmd_eval(dir),
    }
}

fn cmd_eval(dir: &PathBuf) -> Result<()> {
    let files = read_directory(dir)?;
    let result = driver::parse_module(&files);

    let json = serde_json::to_string_pretty(&result)?;
    println!("{json}");

    if !result.failed_files.is_empty() {
        anyhow::bail!(
            "{} file(s) failed to parse: {}",
            result.failed_files.len(),
            result.failed_files.keys().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}

/// Reads every regular file directly inside `dir` (non-recursive) into the in-memory map the
/// evaluator expects, then layers in `TF_VAR_*` environment variables as synthetic tfvars
/// entries under the highest-precedence name the classifier recognizes.
fn read_directory(dir: &PathBuf) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();

    let entries = std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        files.insert(name, content);
    }

    let env_assignments = collect_env_vars();
    if !env_assignments.is_empty() {
        files.insert(ENV_VAR_FILENAME.to_string(), env_assignments);
    }

    Ok(files)
}

/// Renders `TF_VAR_*` environment variables as a synthetic tfvars-equivalent body, applied after
/// `.tf` defaults but before any tfvars file, matching Terraform's documented precedence.
fn collect_env_vars() -> String {
    let mut out = String::new();
    for (key, value) in std::env::vars() {
        if let Some(name) = key.strip_prefix("TF_VAR_") {
            out.push_str(&format!("{name} = {}\n", hcl_quote(&value)));
        }
    }
    out
}

fn hcl_quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
