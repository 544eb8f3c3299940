use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use pe_research::config::{AzureOpenAIConfig, REDACTED_KEY};
use pe_research::error::ConfigError;
use pe_research::{build_chat_service, chat, constants, web_server};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path of the persisted Azure OpenAI configuration file.
    #[arg(long, global = true, default_value = constants::CONFIG_FILE.as_str())]
    config_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the web server.
    Start {
        #[arg(long, default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
    },
    /// Chat with the research assistant in the terminal.
    Chat {
        #[arg(long, help = "Session id to record the conversation under.")]
        session: Option<String>,
    },
    /// Inspect or change the Azure OpenAI configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Print the current configuration with the API key redacted.
    Show,
    /// Send one test completion with the current configuration.
    Test,
    /// Validate and save a new configuration.
    Set {
        #[arg(long, env = "AZURE_OPENAI_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long, default_value = constants::DEFAULT_API_VERSION)]
        api_version: String,
        #[arg(long, default_value = constants::DEFAULT_DEPLOYMENT_NAME)]
        deployment_name: String,
    },
}

// The command line is logged at startup, so the key must not show up here.
impl std::fmt::Debug for ConfigCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Show => f.write_str("Show"),
            Self::Test => f.write_str("Test"),
            Self::Set {
                api_key: _,
                endpoint,
                api_version,
                deployment_name,
            } => f
                .debug_struct("Set")
                .field("api_key", &REDACTED_KEY)
                .field("endpoint", endpoint)
                .field("api_version", api_version)
                .field("deployment_name", deployment_name)
                .finish(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=info,pe_research=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Starting with command: {:?}", cli.command);

    let service = Arc::new(build_chat_service(&cli.config_file).await);

    match cli.command {
        Commands::Start { port } => {
            info!("Starting web server on port {}...", port);

            let mut web_server_handle = tokio::spawn(web_server::start_web_server(port, service));

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, initiating shutdown...");
                    web_server_handle.abort();
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(Ok(())) => info!("Web server task completed unexpectedly."),
                        Ok(Err(e)) => {
                            error!("Web server failed: {:?}", e);
                            return Err(e);
                        }
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }
            info!("Shutdown complete.");
        }
        Commands::Chat { session } => {
            let session = session.unwrap_or_else(|| {
                format!("session_{}", chrono::Utc::now().timestamp_millis())
            });
            chat::run_terminal_chat(&service, &session)
                .await
                .context("Chat session failed")?;
            info!("Chat session finished.");
        }
        Commands::Config { action } => match action {
            ConfigCommands::Show => {
                let status = service.config_status().await;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            ConfigCommands::Test => {
                let result = service.test_config().await;
                println!("{}", serde_json::to_string_pretty(&result)?);
                if !result.success {
                    bail!("{}", result.message);
                }
            }
            ConfigCommands::Set {
                api_key,
                endpoint,
                api_version,
                deployment_name,
            } => {
                let candidate = AzureOpenAIConfig {
                    api_key,
                    endpoint,
                    api_version,
                    deployment_name,
                };
                match service.set_config(candidate).await {
                    Ok(config) => {
                        println!(
                            "Saved configuration to {}",
                            service.orchestrator().config().path().display()
                        );
                        println!("{}", serde_json::to_string_pretty(&config)?);
                    }
                    Err(ConfigError::Validation(v)) => {
                        for field in &v.errors {
                            eprintln!("{}: {}", field.field, field.message);
                        }
                        bail!("Invalid configuration");
                    }
                    Err(e) => return Err(e).context("Failed to save configuration"),
                }
            }
        },
    }

    Ok(())
}
