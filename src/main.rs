// termgate - Main Entry Point
//
// Serves the web terminal, or checks a single command line against the
// policy from the shell.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use termgate::config::Config;
use termgate::logging::LogLevel;
use termgate::server;
use termgate::terminal::Terminal;
use termgate::tools::{CommandValidator, PolicyTable, ValidationOutcome};
use tracing::info;

/// termgate: allowlist-gated web terminal
#[derive(Parser, Debug)]
#[command(name = "termgate")]
#[command(version)]
#[command(about = "Allowlist-gated web terminal that runs commands without a shell", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config.toml (default: XDG config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP terminal service (default)
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate a command line without running it
    Check {
        /// The command line, quoted as one argument
        command: String,
    },
    /// Print the command allowlist
    Policy,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if args.verbose {
        config.logging.level = LogLevel::Debug;
    }
    config.logging.init()?;

    match args.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await?;
        }
        None => serve(config).await?,
        Some(Commands::Check { command }) => check(&command)?,
        Some(Commands::Policy) => print_policy(),
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    info!("termgate v{} starting...", env!("CARGO_PKG_VERSION"));
    let terminal = Terminal::from_config(&config)?;
    server::start_server(&config, terminal).await
}

fn check(command: &str) -> Result<()> {
    let policy = PolicyTable::builtin();
    match CommandValidator::new(&policy).validate(command) {
        ValidationOutcome::Accepted(argv) if argv.is_empty() => {
            println!("accepted: no-op");
            Ok(())
        }
        ValidationOutcome::Accepted(argv) => {
            println!("accepted: {:?}", argv.as_slice());
            Ok(())
        }
        ValidationOutcome::Rejected(kind) => anyhow::bail!("rejected: {}", kind),
    }
}

fn print_policy() {
    let policy = PolicyTable::builtin();
    println!("Allowed commands:");
    for (name, entry) in policy.commands() {
        let flags = if entry.allowed_flags().is_empty() {
            "(no listed flags)".to_string()
        } else {
            entry.allowed_flags().join(" ")
        };
        let marker = if entry.reads_paths() { " [reads paths]" } else { "" };
        println!("  {:<10} {}{}", name, flags, marker);
    }

    println!("\nReadable paths:");
    for path in policy.safe_read_paths() {
        println!("  {}", path);
    }
}
