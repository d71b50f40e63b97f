//! CLI command definitions and handlers.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use boardsync_core::BoardState;
use boardsync_engine::{ChannelConfig, SyncEngine};

pub mod board;
pub mod task;
pub mod watch;

/// How long to wait for the initial sync and for command echoes.
const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Boardsync - Collaborative Task Board Client
#[derive(Parser)]
#[command(name = "boardsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Board server endpoint (overrides BOARDSYNC_URL)
    #[arg(long, global = true, env = "BOARDSYNC_URL")]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the board live until interrupted
    Watch,

    /// Print the current board once
    Board(board::BoardArgs),

    /// Task commands (create, edit, move, delete)
    #[command(subcommand)]
    Task(task::TaskCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = match &self.url {
            Some(url) => ChannelConfig::with_url(url),
            None => ChannelConfig::from_env(),
        };

        match self.command {
            Commands::Watch => watch::execute(config).await,
            Commands::Board(args) => board::execute(args, config).await,
            Commands::Task(cmd) => task::execute(cmd, config).await,
        }
    }
}

/// Connect and wait for the first full sync to land.
pub(crate) async fn connect_synced(config: ChannelConfig) -> Result<SyncEngine> {
    debug!(url = %config.url, "connecting to board server");
    let engine = SyncEngine::connect(config);
    tokio::time::timeout(WAIT_TIMEOUT, engine.synced())
        .await
        .map_err(|_| anyhow::anyhow!("Timed out waiting for the board server"))??;
    debug!("initial sync received");
    Ok(engine)
}

/// Wait until the board snapshot satisfies `pred`, used to observe the
/// authority's echo of a command we just sent.
pub(crate) async fn wait_for_echo<F>(engine: &SyncEngine, what: &str, mut pred: F) -> Result<()>
where
    F: FnMut(&BoardState) -> bool,
{
    let mut state_rx = engine.watch_state();
    let wait = async {
        loop {
            if pred(&state_rx.borrow_and_update()) {
                debug!(what = %what, "server echo observed");
                return Ok(());
            }
            if state_rx.changed().await.is_err() {
                anyhow::bail!("Engine stopped before the {} was confirmed", what);
            }
        }
    };
    tokio::time::timeout(WAIT_TIMEOUT, wait)
        .await
        .map_err(|_| anyhow::anyhow!("Timed out waiting for the {} to be confirmed", what))?
}
