//! Live board watcher.

use anyhow::Result;
use colored::Colorize;

use boardsync_engine::{ChannelConfig, SyncEngine};

use crate::output;

pub async fn execute(config: ChannelConfig) -> Result<()> {
    println!(
        "Watching board at {} {}",
        config.url.cyan(),
        "(Ctrl-C to quit)".dimmed()
    );

    let engine = SyncEngine::connect(config);
    let mut state_rx = engine.watch_state();
    let mut conn_rx = engine.connectivity();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = conn_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                output::print_connection(&conn_rx.borrow_and_update());
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                println!();
                output::print_board(&state);
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}
