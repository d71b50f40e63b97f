//! One-shot board snapshot.

use anyhow::Result;
use clap::Args;

use boardsync_engine::ChannelConfig;

use crate::commands::connect_synced;
use crate::output;

#[derive(Args)]
pub struct BoardArgs {
    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: BoardArgs, config: ChannelConfig) -> Result<()> {
    let engine = connect_synced(config).await?;
    let state = engine.snapshot();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        output::print_board(&state);
    }

    engine.shutdown().await;
    Ok(())
}
