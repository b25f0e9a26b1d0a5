//! DSA Assistant - chat-based study assistant CLI
//!
#![doc = "DSA Assistant - chat-based study assistant CLI"]
#![doc = "Main entry point for the dsa-assistant application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dsa_assistant::cli::{Cli, Commands};
use dsa_assistant::commands;
use dsa_assistant::config::Config;
use dsa_assistant::views::AuthMode;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Signup { email, password } => {
            tracing::info!("Starting signup");
            commands::auth::run(config, AuthMode::Signup, email, password).await?;
            Ok(())
        }
        Commands::Login { email, password } => {
            tracing::info!("Starting login");
            commands::auth::run(config, AuthMode::Login, email, password).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::session::logout(&config)?;
            Ok(())
        }
        Commands::Chat => {
            tracing::info!("Starting interactive chat mode");
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Revise { topic } => {
            tracing::info!("Starting revise mode");
            if let Some(t) = &topic {
                tracing::debug!("Opening topic: {}", t);
            }
            commands::revise::run_revise(config, topic).await?;
            Ok(())
        }
        Commands::Whoami => {
            commands::session::whoami(&config)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with rendered views on stdout.
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "dsa_assistant=debug"
    } else {
        "dsa_assistant=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
