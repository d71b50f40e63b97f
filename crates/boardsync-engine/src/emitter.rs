//! Command emitter: translates user intents into outbound commands.
//!
//! Every operation validates its input, requires an active connection, and
//! sends exactly one command. It never mutates board state; the caller sees
//! the effect only when the authority's echo comes back as an event.

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use boardsync_core::{BoardError, BoardResult, ClientCommand, Stage, Task, TaskDraft, TaskPatch};

use crate::connection::ConnectionState;

/// Cloneable handle for issuing board commands.
#[derive(Clone)]
pub struct CommandEmitter {
    commands: mpsc::Sender<ClientCommand>,
    connectivity: watch::Receiver<ConnectionState>,
}

impl CommandEmitter {
    pub(crate) fn new(
        commands: mpsc::Sender<ClientCommand>,
        connectivity: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            commands,
            connectivity,
        }
    }

    /// Create a task in `stage`.
    ///
    /// Assigns the client-generated id and timestamps, then sends the
    /// creation intent. Returns the task as sent so the caller can await its
    /// echo; local state is untouched until the `task:created` event lands.
    pub async fn create_task(&self, draft: TaskDraft, stage: Stage) -> BoardResult<Task> {
        draft.validate()?;
        let task = draft.into_task(stage);
        self.send(ClientCommand::Create {
            task: task.clone(),
            stage,
        })
        .await?;
        Ok(task)
    }

    /// Send a partial update for a task in `stage`.
    pub async fn update_task(
        &self,
        task_id: impl Into<String>,
        mut updates: TaskPatch,
        stage: Stage,
    ) -> BoardResult<()> {
        updates.validate()?;
        if updates.is_empty() {
            return Err(BoardError::validation("Update carries no changes"));
        }
        if updates.updated_at.is_none() {
            updates.updated_at = Some(Utc::now());
        }
        self.send(ClientCommand::Update {
            task_id: task_id.into(),
            updates,
            stage,
        })
        .await
    }

    /// Move a task from one stage to the tail of another.
    pub async fn move_task(
        &self,
        task_id: impl Into<String>,
        from_stage: Stage,
        to_stage: Stage,
    ) -> BoardResult<()> {
        self.send(ClientCommand::Move {
            task_id: task_id.into(),
            from_stage,
            to_stage,
        })
        .await
    }

    /// Delete a task from `stage`.
    pub async fn delete_task(&self, task_id: impl Into<String>, stage: Stage) -> BoardResult<()> {
        self.send(ClientCommand::Delete {
            task_id: task_id.into(),
            stage,
        })
        .await
    }

    /// Request a fresh full sync from the authority.
    pub async fn request_sync(&self) -> BoardResult<()> {
        self.send(ClientCommand::SyncRequest).await
    }

    /// Whether the channel is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connectivity.borrow().is_connected()
    }

    async fn send(&self, command: ClientCommand) -> BoardResult<()> {
        if !self.is_connected() {
            warn!(command = command.name(), "command issued without an active connection");
            return Err(BoardError::NotConnected);
        }
        self.commands
            .send(command)
            .await
            .map_err(|_| BoardError::ChannelClosed("engine stopped".to_string()))
    }
}
