//! chatrelay - chat prompt relay for CPM and OpenAI-style backends
//!
//! A backend service that accepts chat prompts, signs and forwards
//! them to the CPM provider or streams replies from an OpenAI-style
//! conversational endpoint.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatrelay::config::Config;
use chatrelay::relay::run_server;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "Chat prompt relay for CPM and OpenAI-style backends")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatrelay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            tracing::info!(config = %config, "Loading configuration");

            let (mut config, key_sources) = Config::from_file_with_env(&config)?;

            for (field, source) in &key_sources {
                tracing::info!(credential = %field, source = %source, "Resolved credential");
            }

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            run_server(config).await
        }

        Commands::Check { config } => {
            tracing::info!(config = %config, "Checking configuration");

            let (config, key_sources) = Config::from_file_with_env(&config)?;

            for (field, source) in &key_sources {
                println!("{}: {}", field, source);
            }
            println!("cpm endpoint: {}", config.cpm.api_url);
            println!("cpm model: {}", config.cpm.model);
            println!(
                "usage reporting: {}",
                if config.openai.api_key.is_some() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("Configuration OK");

            Ok(())
        }
    }
}
