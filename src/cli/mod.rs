//! CLI module for the entity store service

pub mod serve;

use clap::{Parser, Subcommand};

/// Entity Store Service - CRUD over an object store
#[derive(Parser)]
#[command(name = "entity-store-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve(serve::ServeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_serve_with_config() {
        let cli = Cli::try_parse_from(["entity-store-service", "serve", "--config", "app.toml"])
            .unwrap();

        let Command::Serve(args) = cli.command;
        assert_eq!(args.config.as_deref(), Some(Path::new("app.toml")));
    }

    #[test]
    fn test_parse_serve_without_config() {
        let cli = Cli::try_parse_from(["entity-store-service", "serve"]).unwrap();

        let Command::Serve(args) = cli.command;
        assert!(args.config.is_none());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["entity-store-service"]).is_err());
    }
}
