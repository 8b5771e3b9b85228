//! Command-line interface definition for oidc-loopback
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// oidc-loopback - sign in to an OpenID Connect provider from the terminal
///
/// Opens the system browser at the provider's authorization endpoint,
/// receives the redirect on a loopback port and prints the validated
/// identity.
#[derive(Parser, Debug, Clone)]
#[command(name = "oidc-loopback")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sign in through the browser and print the authenticated identity
    Login {
        /// Print the authorization URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,

        /// Fixed loopback port for the redirect URI (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Role to check membership for; may be repeated
        #[arg(short, long = "role")]
        roles: Vec<String>,
    },

    /// Fetch and print the provider's discovery document
    Discover,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: Commands::Login {
                no_browser: false,
                port: None,
                roles: Vec::new(),
            },
        }
    }
}
