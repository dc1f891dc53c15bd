//! syncapi: command-line client for the sync daemon's control API
//!
//! Connects with settings from the config file (overridable by `SYNCAPI_*`
//! environment variables and flags), runs one call, and prints the JSON body
//! on stdout. Logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use syncapi_core::{
    AddFolderParams, ApiVariant, Config, EventsParams, Params, SecretParams, SyncClient,
};

#[derive(Parser, Debug)]
#[command(name = "syncapi")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Daemon host
    #[arg(long)]
    host: Option<String>,

    /// Daemon port
    #[arg(long)]
    port: Option<u16>,

    /// Use the legacy /gui API
    #[arg(long)]
    legacy: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List synced folders
    Folders,

    /// Add a folder
    AddFolder {
        path: String,

        /// Join an existing folder by secret
        #[arg(long)]
        secret: Option<String>,

        /// Add even if the directory is not empty
        #[arg(long)]
        force: bool,
    },

    /// Remove a folder
    RemoveFolder { folder_id: String },

    /// Get a sharing link for a folder
    Link { folder_id: String },

    /// Generate a folder secret
    Secret {
        /// Derive from this secret instead of generating one
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        encrypted: bool,
    },

    /// Poll events
    Events {
        /// Only events after this id
        #[arg(long)]
        since: Option<u64>,
    },

    /// Daemon version (legacy action)
    Version,

    /// Run a legacy action with key=value parameters
    Call {
        action: String,
        params: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "syncapi=info,syncapi_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }),
    };
    config.apply_env()?;

    if let Some(host) = cli.host.clone() {
        config.daemon.host = host;
    }
    if let Some(port) = cli.port {
        config.daemon.port = port;
    }
    if cli.legacy {
        config.daemon.api = ApiVariant::Legacy;
    }

    tracing::info!(
        "Connecting to {}:{} ({:?} API)",
        config.daemon.host,
        config.daemon.port,
        config.daemon.api
    );
    let client = SyncClient::connect(&config.daemon).await?;

    let body = run(&client, cli.command).await?;

    let out = if cli.pretty {
        serde_json::to_string_pretty(&body)?
    } else {
        serde_json::to_string(&body)?
    };
    println!("{}", out);

    Ok(())
}

async fn run(client: &SyncClient, command: Command) -> anyhow::Result<Value> {
    let body = match command {
        Command::Folders => client.list_folders(Params::new()).await?,
        Command::AddFolder {
            path,
            secret,
            force,
        } => {
            client
                .add_folder(AddFolderParams {
                    path,
                    secret,
                    force,
                })
                .await?
        }
        Command::RemoveFolder { folder_id } => {
            client.remove_folder(&folder_id, Params::new()).await?
        }
        Command::Link { folder_id } => client.folder_link(&folder_id, Params::new()).await?,
        Command::Secret { from, encrypted } => {
            client
                .generate_secret(SecretParams {
                    secret: from,
                    encrypted,
                })
                .await?
        }
        Command::Events { since } => client.get_events(EventsParams { last_id: since }).await?,
        Command::Version => client.get_version().await?,
        Command::Call { action, params } => client.call(&action, parse_pairs(&params)?).await?,
    };
    Ok(body)
}

/// `key=value` arguments into call parameters
fn parse_pairs(args: &[String]) -> anyhow::Result<Params> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .ok_or_else(|| anyhow::anyhow!("expected key=value, got {:?}", arg))
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .map(|pairs| pairs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let params = parse_pairs(&["dir=/home".to_string(), "a=b=c".to_string()]).unwrap();
        assert_eq!(params.get("dir"), Some("/home"));
        assert_eq!(params.get("a"), Some("b=c"));

        assert!(parse_pairs(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_call() {
        let cli = Cli::parse_from(["syncapi", "--legacy", "call", "getdir", "dir=/home"]);
        assert!(cli.legacy);
        match cli.command {
            Command::Call { action, params } => {
                assert_eq!(action, "getdir");
                assert_eq!(params, vec!["dir=/home"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
