//! rulec - compile a rule script into its JSON policy.
//!
//! Prints the policy to stdout. A compile error is reported on stderr as
//! `<line> <column>: <message>` and exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rulec_compiler::CompileError;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rulec", about = "Network rule script compiler", version)]
struct Cli {
    /// Rule source file
    file: PathBuf,
    /// Print single-line JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} {}: {0}", .0.line(), .0.column())]
    Compile(#[from] CompileError),

    #[error("failed to encode policy: {0}")]
    Encode(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, CliError> {
    tracing::debug!(file = %cli.file.display(), "compiling rule source");
    let source = std::fs::read_to_string(&cli.file).map_err(|source| CliError::Read {
        path: cli.file.clone(),
        source,
    })?;

    let policy = rulec_compiler::compile(&source)?;
    tracing::debug!(
        rules = policy.rules.len(),
        capabilities = policy.capabilities.len(),
        tags = policy.tags.len(),
        "compiled policy"
    );

    let json = if cli.compact {
        serde_json::to_string(&policy)?
    } else {
        serde_json::to_string_pretty(&policy)?
    };
    Ok(json)
}

/// Log to stderr. `RUST_LOG` wins over the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
