//! Engine shell: wires the channel connection to the board reducer.
//!
//! The reducer task is the single writer of [`BoardState`]; everyone else
//! observes cloned snapshots through a watch channel. Commands flow in from
//! [`CommandEmitter`] handles and are forwarded to the connection; inbound
//! events are applied in exactly the order the channel delivers them.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use boardsync_core::{BoardError, BoardResult, BoardState, ClientCommand, ServerEvent};

use crate::config::ChannelConfig;
use crate::connection::{self, ConnectionState};
use crate::emitter::CommandEmitter;

/// A running sync engine instance.
///
/// Dropping the engine releases both background tasks: the watch senders
/// drop with it and the tasks observe the closed channels and exit. Calling
/// [`SyncEngine::shutdown`] additionally waits for them to finish.
pub struct SyncEngine {
    state_rx: watch::Receiver<BoardState>,
    conn_rx: watch::Receiver<ConnectionState>,
    commands_tx: mpsc::Sender<ClientCommand>,
    sync_epoch_rx: watch::Receiver<u64>,
    shutdown_tx: watch::Sender<bool>,
    reducer: JoinHandle<()>,
    connection: JoinHandle<()>,
}

impl SyncEngine {
    /// Start the engine: spawns the connection task and the reducer task.
    ///
    /// The connection begins in `Connecting`; every fresh `Connected`
    /// transition triggers a full-sync request, which is the only recovery
    /// mechanism for events lost across a disconnect gap.
    pub fn connect(config: ChannelConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(256);
        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (conn_rx, connection) =
            connection::spawn(config, outbound_rx, events_tx, shutdown_rx.clone());

        let (state_tx, state_rx) = watch::channel(BoardState::new());
        let (epoch_tx, sync_epoch_rx) = watch::channel(0u64);
        let reducer = tokio::spawn(run_reducer(ReducerHarness {
            state_tx,
            epoch_tx,
            events_rx,
            commands_rx,
            outbound_tx,
            conn_rx: conn_rx.clone(),
            shutdown_rx,
        }));

        Self {
            state_rx,
            conn_rx,
            commands_tx,
            sync_epoch_rx,
            shutdown_tx,
            reducer,
            connection,
        }
    }

    /// A command emitter bound to this engine.
    pub fn emitter(&self) -> CommandEmitter {
        CommandEmitter::new(self.commands_tx.clone(), self.conn_rx.clone())
    }

    /// Current board snapshot (read-only clone).
    pub fn snapshot(&self) -> BoardState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to board snapshots.
    pub fn watch_state(&self) -> watch::Receiver<BoardState> {
        self.state_rx.clone()
    }

    /// Subscribe to connectivity transitions.
    pub fn connectivity(&self) -> watch::Receiver<ConnectionState> {
        self.conn_rx.clone()
    }

    /// Wait until at least one full sync has been applied, then return the
    /// snapshot. Fails if the engine stops first (e.g. reconnection attempts
    /// exhausted).
    pub async fn synced(&self) -> BoardResult<BoardState> {
        let mut epoch_rx = self.sync_epoch_rx.clone();
        while *epoch_rx.borrow_and_update() == 0 {
            epoch_rx
                .changed()
                .await
                .map_err(|_| BoardError::ChannelClosed("engine stopped".to_string()))?;
        }
        Ok(self.snapshot())
    }

    /// Tear down: close the connection, stop both tasks, and wait for them.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.connection.await;
        let _ = self.reducer.await;
        debug!("sync engine stopped");
    }
}

/// Channels wiring one reducer task; constructed directly by tests to drive
/// the reducer with an in-memory double instead of a live connection.
pub(crate) struct ReducerHarness {
    pub state_tx: watch::Sender<BoardState>,
    pub epoch_tx: watch::Sender<u64>,
    pub events_rx: mpsc::Receiver<ServerEvent>,
    pub commands_rx: mpsc::Receiver<ClientCommand>,
    pub outbound_tx: mpsc::Sender<ClientCommand>,
    pub conn_rx: watch::Receiver<ConnectionState>,
    pub shutdown_rx: watch::Receiver<bool>,
}

pub(crate) async fn run_reducer(harness: ReducerHarness) {
    let ReducerHarness {
        state_tx,
        epoch_tx,
        mut events_rx,
        mut commands_rx,
        outbound_tx,
        mut conn_rx,
        mut shutdown_rx,
    } = harness;

    let mut state = BoardState::new();

    // The connection may already be up by the time this task first polls.
    let already_connected = conn_rx.borrow_and_update().is_connected();
    if already_connected && request_sync(&mut state, &state_tx, &outbound_tx).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            event = events_rx.recv() => match event {
                Some(event) => {
                    let was_sync = matches!(event, ServerEvent::Sync { .. });
                    state.apply(event);
                    let _ = state_tx.send(state.clone());
                    if was_sync {
                        epoch_tx.send_modify(|epoch| *epoch += 1);
                    }
                }
                None => {
                    debug!("event channel closed, stopping reducer");
                    break;
                }
            },
            command = commands_rx.recv() => match command {
                Some(command) => {
                    if matches!(command, ClientCommand::SyncRequest) {
                        state.begin_sync();
                        let _ = state_tx.send(state.clone());
                    }
                    if outbound_tx.send(command).await.is_err() {
                        warn!("connection gone, dropping command");
                        break;
                    }
                }
                None => break,
            },
            changed = conn_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let connected = conn_rx.borrow_and_update().is_connected();
                if connected {
                    debug!("connection established, requesting full sync");
                    if request_sync(&mut state, &state_tx, &outbound_tx).await.is_err() {
                        break;
                    }
                }
                // Stale state is kept across a disconnect gap on purpose;
                // the post-reconnect sync replaces it wholesale.
            }
        }
    }
}

async fn request_sync(
    state: &mut BoardState,
    state_tx: &watch::Sender<BoardState>,
    outbound_tx: &mpsc::Sender<ClientCommand>,
) -> Result<(), ()> {
    state.begin_sync();
    let _ = state_tx.send(state.clone());
    outbound_tx
        .send(ClientCommand::SyncRequest)
        .await
        .map_err(|_| ())
}
