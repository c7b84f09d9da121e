use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use chatterm::api::ChatClient;
use chatterm::config::{Config, Overrides};
use chatterm::{app, commands, logging};

#[derive(Parser)]
#[command(name = "chatterm")]
#[command(version)]
#[command(about = "Chat with an AI assistant from your terminal", long_about = None)]
struct Cli {
    /// Base URL of the chat backend [env: CHATTERM_API_URL]
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in milliseconds [env: CHATTERM_TIMEOUT_MS]
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    /// Opening assistant message
    #[arg(long, global = true)]
    greeting: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Send {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Check that the backend is reachable
    Health,
    /// Show the effective configuration
    Config {
        /// Write the default config file if it does not exist
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let overrides = Overrides::from_env().or(Overrides {
        api_url: cli.api_url,
        timeout_ms: cli.timeout_ms,
        greeting: cli.greeting,
    });
    let config = Config::load(overrides)?;

    match cli.command {
        None => {
            logging::init_file(&config, cli.verbose)?;
            let client = ChatClient::new(&config)?;
            app::run(&config, client).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Send { text }) => {
            logging::init_stderr(cli.verbose);
            commands::send_once(&config, &text.join(" ")).await
        }
        Some(Commands::Health) => {
            logging::init_stderr(cli.verbose);
            commands::health(&config).await
        }
        Some(Commands::Config { init }) => {
            logging::init_stderr(cli.verbose);
            commands::show_config(&config, init)
        }
    }
}
