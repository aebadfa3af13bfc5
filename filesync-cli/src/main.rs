//! filesync — propagate files from one repository to many via pull requests.
//!
//! # Usage
//!
//! ```text
//! filesync sync --source-repo org/template --files "ci.yml=.github/workflows/ci.yml" \
//!     --destination-repos-regex "org/^svc-.*" [--dry-run] [--json]
//! filesync resolve --destination-repos "org/a" --destination-repos-regex "org/^svc-.*"
//! ```
//!
//! Every option also reads its GitHub Actions style environment variable
//! (`INPUT_SOURCE_REPO`, `INPUT_FILES`, ...), so the binary runs unchanged
//! as an action step.

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{resolve::ResolveArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "filesync",
    version,
    about = "Sync files from a source repository into many destination repositories",
    long_about = None,
)]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, env = "INPUT_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync the configured files and open a pull request per destination.
    Sync(SyncArgs),

    /// Print the destination repositories a sync would touch.
    Resolve(ResolveArgs),
}

// ---------------------------------------------------------------------------
// Log format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'; expected: text, json")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Logs go to stderr so stdout stays clean for reports.
fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Resolve(args) => args.run(),
    }
}
