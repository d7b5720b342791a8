use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "depot-mirror",
    about = "Mirror packages and signing keys from an upstream depot to a target depot",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sync keys, then packages, for every configured origin and channel
    Sync(SyncArgs),
    /// Sync origin signing keys only
    Keys(KeysArgs),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Path to the mirror configuration file
    #[arg(short, long, default_value = "depot-mirror.toml")]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct KeysArgs {
    /// Path to the mirror configuration file
    #[arg(short, long, default_value = "depot-mirror.toml")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sync() {
        let cli = Cli::try_parse_from(["depot-mirror", "sync", "--config", "mirror.toml"]).unwrap();
        if let Command::Sync(args) = cli.command {
            assert_eq!(args.config, PathBuf::from("mirror.toml"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_sync_default_config() {
        let cli = Cli::try_parse_from(["depot-mirror", "sync"]).unwrap();
        if let Command::Sync(args) = cli.command {
            assert_eq!(args.config, PathBuf::from("depot-mirror.toml"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_keys_short_flag() {
        let cli = Cli::try_parse_from(["depot-mirror", "keys", "-c", "m.toml"]).unwrap();
        assert!(matches!(cli.command, Command::Keys(_)));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["depot-mirror", "--verbose", "sync"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["depot-mirror", "--format", "json", "keys"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn unknown_command_rejected() {
        assert!(Cli::try_parse_from(["depot-mirror", "serve"]).is_err());
    }
}
