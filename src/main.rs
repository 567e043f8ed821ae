use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use issue_triage::config::ConfigOverrides;
use issue_triage::logging::{LogOptions, init_logging};

mod cmd;

#[derive(Parser)]
#[command(name = "issue-triage")]
#[command(version, about = "Local dashboard for triaging GitHub issues")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct TriageDirArg {
    /// Triage data directory (issues.json, findings.json, state.json)
    #[arg(long, env = "TRIAGE_DIR")]
    pub triage_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the triage dashboard
    Serve {
        #[command(flatten)]
        dir: TriageDirArg,

        /// OWNER/REPO (read from findings.json or issues.json if omitted)
        #[arg(long)]
        repo: Option<String>,

        /// Port to serve on [default: 8765]
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind [default: 127.0.0.1]
        #[arg(long)]
        host: Option<String>,

        /// Serve static files from this directory instead of the bundled page
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Path to the gh executable
        #[arg(long)]
        gh_bin: Option<String>,

        /// Timeout in seconds for each gh invocation
        #[arg(long)]
        timeout: Option<u64>,

        /// Open the dashboard in a browser after start
        #[arg(long)]
        open: bool,

        /// Enable dev mode (bind 0.0.0.0, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Print the triage report as markdown
    Export {
        #[command(flatten)]
        dir: TriageDirArg,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show issue counts by verdict and triage progress
    Status {
        #[command(flatten)]
        dir: TriageDirArg,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(LogOptions {
        verbose: cli.verbose,
        json: cli.log_json,
        file: cli.log_file.as_deref(),
    })?;

    match cli.command {
        Commands::Serve {
            dir,
            repo,
            port,
            host,
            static_dir,
            gh_bin,
            timeout,
            open,
            dev,
        } => {
            let overrides = ConfigOverrides {
                repo,
                host,
                port,
                gh_bin,
                command_timeout_secs: timeout,
                static_dir,
            };
            cmd::cmd_serve(&dir.triage_dir, overrides, open, dev).await?;
        }
        Commands::Export { dir, output } => cmd::cmd_export(&dir.triage_dir, output.as_deref())?,
        Commands::Status { dir } => cmd::cmd_status(&dir.triage_dir)?,
    }

    Ok(())
}
