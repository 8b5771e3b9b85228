//! oidc-loopback - OpenID Connect login from the terminal
//!
#![doc = "oidc-loopback - OpenID Connect login from the terminal"]
#![doc = "Main entry point for the oidc-loopback application."]

use anyhow::Result;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use oidc_loopback::cli::{Cli, Commands};
use oidc_loopback::commands;
use oidc_loopback::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Login {
            no_browser, roles, ..
        } => {
            tracing::info!("Starting login against {}", config.authentication.authority);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, canceling login");
                    on_interrupt.cancel();
                }
            });

            commands::login::run_login(config, no_browser, roles, cancel).await?;
            Ok(())
        }
        Commands::Discover => {
            tracing::info!("Fetching discovery document");
            commands::discover::run_discover(&config).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `-v` selects debug output for this
/// crate. Logs go to stderr so they never mix with command output.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "oidc_loopback=debug"
    } else {
        "oidc_loopback=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
