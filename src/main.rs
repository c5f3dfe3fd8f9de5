//! wdapi - Command line client for the War Dragons game server API.
//!
//! # Overview
//!
//! The binary signs and sends one request (or two, for `kingdom`) to the game
//! server and prints a readable summary of the answer. It is a thin layer over
//! the [`wdapi::wd`] library.
//!
//! # Configuration
//!
//! Create a `config.yaml` file with your application credentials:
//!
//! ```yaml
//! api:
//!   secret: "app-secret"
//!   client_id: "app-id"
//!   api_key: "default-key"
//! ```
//!
//! Any value can be overridden with a `WDAPI_` environment variable:
//!
//! ```bash
//! export WDAPI_API__SECRET="secret-from-env"
//! ```
//!
//! # Usage
//!
//! ```bash
//! wdapi --config config.yaml alliances
//! wdapi --config config.yaml castles 5 realm
//! wdapi --config config.yaml castle-info 5-A0-1 5-A0-2
//! wdapi --config config.yaml battles --key player-key --cursor abc
//! wdapi --config config.yaml kingdom 5 realm
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)
//!   - Set to `debug` to log every request line

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, error};
use wdapi::wd::WdRequester;

use crate::config::Config;

mod config;
mod report;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    ///
    /// See the [`config`] module for the expected format.
    #[arg(short, long)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

/// Commands bound to a player take its api key, the configured default key
/// is used otherwise.
#[derive(Subcommand, Debug)]
enum Command {
    /// Teams of each alliance
    Alliances,
    /// Castles of a kingdom
    Castles { kingdom_id: i64, realm_name: String },
    /// Detailed state of castles, by KRIDX identifier
    CastleInfo {
        #[arg(required = true)]
        castle_ids: Vec<String>,
    },
    /// Teams of a kingdom with their capital
    Teams { kingdom_id: i64, realm_name: String },
    /// Alliance and roster of teams
    TeamsMetadata {
        kingdom_id: i64,
        realm_name: String,
        #[arg(required = true)]
        team_names: Vec<String>,
    },
    /// Kills of teams for the current month
    Kills {
        #[arg(required = true)]
        team_names: Vec<String>,
    },
    /// Event scores of a player
    EventScore {
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Monthly contribution of the team members of a player
    Contribution {
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Troops of the team of a player
    TroopCount {
        #[arg(short, long)]
        key: Option<String>,
    },
    /// One page of battle reports of the team of a player
    Battles {
        #[arg(short, long)]
        key: Option<String>,
        /// Cursor returned by the previous page
        #[arg(long, default_value = "")]
        cursor: String,
    },
    /// Castles owned by each team of a kingdom
    Kingdom { kingdom_id: i64, realm_name: String },
}

/// Runs `command` and returns the lines to print.
async fn run(
    requester: &WdRequester,
    default_key: &str,
    command: &Command,
) -> anyhow::Result<Vec<String>> {
    let key = |key: &Option<String>| key.clone().unwrap_or_else(|| default_key.to_string());

    let lines = match command {
        Command::Alliances => report::alliances(requester).await?,
        Command::Castles {
            kingdom_id,
            realm_name,
        } => report::castles(requester, *kingdom_id, realm_name).await?,
        Command::CastleInfo { castle_ids } => report::castle_info(requester, castle_ids).await?,
        Command::Teams {
            kingdom_id,
            realm_name,
        } => report::teams(requester, *kingdom_id, realm_name).await?,
        Command::TeamsMetadata {
            kingdom_id,
            realm_name,
            team_names,
        } => report::teams_metadata(requester, *kingdom_id, realm_name, team_names).await?,
        Command::Kills { team_names } => report::monthly_kills(requester, team_names).await?,
        Command::EventScore { key: k } => report::event_score(requester, &key(k)).await?,
        Command::Contribution { key: k } => report::contribution(requester, &key(k)).await?,
        Command::TroopCount { key: k } => report::troop_count(requester, &key(k)).await?,
        Command::Battles { key: k, cursor } => {
            report::battles(requester, &key(k), cursor).await?
        }
        Command::Kingdom {
            kingdom_id,
            realm_name,
        } => report::kingdom(requester, *kingdom_id, realm_name)
            .await
            .with_context(|| format!("Failed to build kingdom {} report", kingdom_id))?,
    };
    Ok(lines)
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    let requester = match WdRequester::new(
        config.api.url.as_deref(),
        config.api.version.as_deref(),
        &config.api.secret,
        &config.api.client_id,
        &config.api.api_key,
    ) {
        Ok(r) => r.with_verbose(config.api.verbose),
        Err(e) => {
            error!("Failed to create requester: {}", e);
            return;
        }
    };
    debug!(
        "Using {} ({}) as client {}",
        requester.url(),
        requester.version(),
        requester.client_id()
    );

    match run(&requester, &config.api.api_key, &args.command).await {
        Ok(lines) => lines.iter().for_each(|line| println!("{}", line)),
        Err(e) => error!("{:#}", e),
    }
}
