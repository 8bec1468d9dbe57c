mod commands;
mod server;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "landing-kit")]
#[command(version, about = "Landing page generation and publishing API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides HOST and the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides PORT and the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,landing_kit=debug"));

    let json_logging = std::env::var("LANDING_KIT_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal in production.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port, config } => {
            init_tracing();
            commands::serve::run(host, port, config).await
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "landing-kit", &mut io::stdout());
            Ok(())
        }
    }
}
