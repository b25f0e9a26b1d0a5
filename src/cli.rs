//! Command-line interface definition for DSA Assistant
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for authentication, chat, and revision.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DSA Assistant - chat-based study assistant client
///
/// Ask data structures and algorithms questions and review the topics and
/// recurring mistakes the assistant has recorded for you.
#[derive(Parser, Debug, Clone)]
#[command(name = "dsa-assistant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Backend base URL (overrides config and DSA_ASSISTANT_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Store the session in this file instead of the OS keyring
    #[arg(long)]
    pub session_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for DSA Assistant
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create an account and store the session
    Signup {
        /// Account email; prompted for when omitted
        #[arg(short, long)]
        email: Option<String>,

        /// Account password; prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log in and store the session
    Login {
        /// Account email; prompted for when omitted
        #[arg(short, long)]
        email: Option<String>,

        /// Account password; prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Remove the stored session
    Logout,

    /// Start the interactive chat
    Chat,

    /// Review past topics and recurring mistakes
    Revise {
        /// Open the detail for this topic directly
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Show the identity used for requests
    Whoami,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["dsa-assistant", "chat"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert!(matches!(cli.command, Commands::Chat));
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_login_with_credentials() {
        let cli = Cli::try_parse_from([
            "dsa-assistant",
            "login",
            "--email",
            "a@b.com",
            "--password",
            "secret1",
        ])
        .unwrap();
        if let Commands::Login { email, password } = cli.command {
            assert_eq!(email, Some("a@b.com".to_string()));
            assert_eq!(password, Some("secret1".to_string()));
        } else {
            panic!("Expected Login command");
        }
    }

    #[test]
    fn test_cli_parse_signup_without_credentials() {
        let cli = Cli::try_parse_from(["dsa-assistant", "signup"]).unwrap();
        if let Commands::Signup { email, password } = cli.command {
            assert_eq!(email, None);
            assert_eq!(password, None);
        } else {
            panic!("Expected Signup command");
        }
    }

    #[test]
    fn test_cli_parse_revise_with_topic() {
        let cli = Cli::try_parse_from(["dsa-assistant", "revise", "--topic", "heaps"]).unwrap();
        if let Commands::Revise { topic } = cli.command {
            assert_eq!(topic, Some("heaps".to_string()));
        } else {
            panic!("Expected Revise command");
        }
    }

    #[test]
    fn test_cli_parse_global_overrides() {
        let cli = Cli::try_parse_from([
            "dsa-assistant",
            "--api-url",
            "http://backend:8000",
            "--session-path",
            "/tmp/s.json",
            "-v",
            "whoami",
        ])
        .unwrap();
        assert_eq!(cli.api_url, Some("http://backend:8000".to_string()));
        assert_eq!(cli.session_path, Some(PathBuf::from("/tmp/s.json")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Whoami));
    }

    #[test]
    fn test_cli_parse_logout() {
        let cli = Cli::try_parse_from(["dsa-assistant", "logout"]).unwrap();
        assert!(matches!(cli.command, Commands::Logout));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["dsa-assistant"]).is_err());
    }
}
