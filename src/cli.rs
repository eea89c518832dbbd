//! Command-line interface definition for the Notescribe backend
//!
//! This module defines the CLI structure using clap's derive API. The
//! binary has a single mode (serve), so everything lives on the top-level
//! parser as overrides for the config file.

use clap::Parser;
use std::path::PathBuf;

/// Notescribe backend server
///
/// HTTP backend for the Notescribe AI note-taking workspace: chat with
/// conversation history, title generation, image/PDF/YouTube analysis,
/// web scraping, and workspace file operations.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "notescribe-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "NOTESCRIBE_CONFIG")]
    pub config: Option<String>,

    /// Override the port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the workspace root directory
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Override the remote log collector URL
    #[arg(long)]
    pub collector_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["notescribe-server"]);
        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
        assert!(cli.workspace.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "notescribe-server",
            "--config",
            "conf.yaml",
            "--port",
            "9001",
            "--workspace",
            "/tmp/notes",
            "--collector-url",
            "http://localhost:9999/log",
            "--verbose",
        ]);
        assert_eq!(cli.config.as_deref(), Some("conf.yaml"));
        assert_eq!(cli.port, Some(9001));
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/notes")));
        assert_eq!(
            cli.collector_url.as_deref(),
            Some("http://localhost:9999/log")
        );
        assert!(cli.verbose);
    }
}
