//! Wire protocol for the board event channel.
//!
//! Every frame is a JSON envelope `{"type": <event name>, "data": ...}`
//! carried as a WebSocket text message. Event names mirror the channel
//! protocol (`sync:*`, `task:*`); payload keys are camelCase.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::BoardResult;
use crate::task::model::{Stage, Task, TaskPatch};

/// Outbound intent sent from this client to the authority.
///
/// Commands never mutate local state; the authority echoes accepted commands
/// back as [`ServerEvent`]s to every client, including the sender.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    /// Request a full task list.
    #[serde(rename = "sync:request")]
    SyncRequest,
    /// Create a task in a stage.
    #[serde(rename = "task:create")]
    Create { task: Task, stage: Stage },
    /// Apply a partial update to a task.
    #[serde(rename = "task:update", rename_all = "camelCase")]
    Update {
        task_id: String,
        updates: TaskPatch,
        stage: Stage,
    },
    /// Move a task between stages.
    #[serde(rename = "task:move", rename_all = "camelCase")]
    Move {
        task_id: String,
        from_stage: Stage,
        to_stage: Stage,
    },
    /// Delete a task from a stage.
    #[serde(rename = "task:delete", rename_all = "camelCase")]
    Delete { task_id: String, stage: Stage },
}

impl ClientCommand {
    /// Encode to a JSON text frame.
    pub fn encode(&self) -> BoardResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SyncRequest => "sync:request",
            Self::Create { .. } => "task:create",
            Self::Update { .. } => "task:update",
            Self::Move { .. } => "task:move",
            Self::Delete { .. } => "task:delete",
        }
    }
}

/// Inbound event from the authority.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// Full task list; replaces local state wholesale.
    #[serde(rename = "sync:tasks")]
    Sync {
        #[serde(deserialize_with = "lenient_tasks")]
        tasks: Vec<Task>,
    },
    /// A task was created by some client.
    #[serde(rename = "task:created")]
    Created { task: Task, stage: Stage },
    /// A task was partially updated.
    #[serde(rename = "task:updated", rename_all = "camelCase")]
    Updated {
        task_id: String,
        updates: TaskPatch,
        stage: Stage,
    },
    /// A task moved between stages.
    #[serde(rename = "task:moved", rename_all = "camelCase")]
    Moved {
        task_id: String,
        from_stage: Stage,
        to_stage: Stage,
    },
    /// A task was deleted.
    #[serde(rename = "task:deleted", rename_all = "camelCase")]
    Deleted { task_id: String, stage: Stage },
}

impl ServerEvent {
    /// Decode a text frame, dropping anything malformed.
    ///
    /// Unknown event names, missing fields, and unknown stages all degrade
    /// to `None` with a warning; they are never surfaced as errors.
    pub fn decode(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, frame = %truncate_frame(text), "dropping malformed event frame");
                None
            }
        }
    }
}

/// Decode a sync payload task-by-task so one bad entry (e.g. an unknown
/// stage) drops only itself, not the whole sync.
fn lenient_tasks<'de, D>(deserializer: D) -> Result<Vec<Task>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Task>(value) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(error = %e, "dropping malformed task in sync payload");
                None
            }
        })
        .collect())
}

fn truncate_frame(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(120)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}
