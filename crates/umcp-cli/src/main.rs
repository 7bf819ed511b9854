mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "umcp")]
#[command(about = "Embeddable MCP server for interactive editor hosts", long_about = None)]
struct Cli {
    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server
    Serve {
        /// Base TCP port (clone instances shift it automatically)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable LAN access: wildcard bind, TLS, bearer authentication
        #[arg(long)]
        remote: bool,

        /// Project root used for clone-instance detection
        /// (defaults to the current directory)
        #[arg(long)]
        project_root: Option<PathBuf>,
    },

    /// Generate a fresh API key and persist it to the preferences file
    Keygen,

    /// Ensure TLS certificate material exists and print its location
    Cert {
        /// Directory for cert.pem / key.pem (defaults to the config dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            remote,
            project_root,
        } => {
            commands::serve::execute(port, remote, project_root, cli.verbose).await?;
        }
        Commands::Keygen => {
            init_tracing(cli.verbose);
            commands::keygen::execute()?;
        }
        Commands::Cert { dir } => {
            init_tracing(cli.verbose);
            commands::cert::execute(dir)?;
        }
    }

    Ok(())
}

/// Install the global tracing subscriber. `RUST_LOG` wins when set.
pub(crate) fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
