//! Task domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BoardResult;
use crate::task::{validate_description, validate_title};

/// A workflow stage (board column).
///
/// The set is fixed and ordered; stages are never created or destroyed at
/// runtime. Wire strings match the column labels shown on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "To Do")]
    Todo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

impl Stage {
    /// All stages in board order.
    pub const ALL: [Stage; 3] = [Stage::Todo, Stage::InProgress, Stage::Done];

    /// Parse from the wire/display string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "To Do" => Some(Self::Todo),
            "In Progress" => Some(Self::InProgress),
            "Done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Convert to the wire/display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

/// Task priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

/// Task categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Category {
    Bug,
    #[default]
    Feature,
    Enhancement,
}

/// A file attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    /// MIME type, e.g. `image/png`.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// A task on the board.
///
/// A task is owned by exactly one stage at any instant; `stage` is the stage
/// it declares for itself in full-sync payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Shallow-merge a patch into this task, leaving absent fields untouched.
    pub fn merge(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(attachments) = &patch.attachments {
            self.attachments = attachments.clone();
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// User-supplied fields for a new task, before the client assigns identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl TaskDraft {
    /// Validate the draft against the board rules.
    pub fn validate(&self) -> BoardResult<()> {
        validate_title(&self.title)?;
        validate_description(self.description.as_deref())?;
        Ok(())
    }

    /// Materialize the draft into a task bound to `stage`.
    ///
    /// Ids are client-generated; the authority echoes the task back unchanged
    /// on acceptance.
    pub fn into_task(self, stage: Stage) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            description: self.description,
            priority: self.priority,
            category: self.category,
            attachments: self.attachments,
            stage,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update to a task (wire `updates`); absent fields are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// Validate the fields the patch actually carries.
    pub fn validate(&self) -> BoardResult<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_description(self.description.as_deref())?;
        Ok(())
    }

    /// Whether the patch carries no changes at all.
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        TaskDraft {
            title: "Fix login flow".to_string(),
            description: Some("Session expires too early".to_string()),
            priority: Priority::Medium,
            category: Category::Bug,
            attachments: Vec::new(),
        }
        .into_task(Stage::Todo)
    }

    #[test]
    fn test_stage_wire_strings() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_str(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::from_str("Backlog"), None);
        assert_eq!(
            serde_json::to_string(&Stage::InProgress).unwrap(),
            "\"In Progress\""
        );
    }

    #[test]
    fn test_task_wire_format() {
        let task = sample_task();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["priority"], "Medium");
        assert_eq!(json["category"], "Bug");
        assert_eq!(json["stage"], "To Do");
        assert!(json["createdAt"].is_string());
        assert!(json["updatedAt"].is_string());
    }

    #[test]
    fn test_task_defaults_on_decode() {
        let json = serde_json::json!({
            "id": "t1",
            "title": "Bare task",
            "stage": "Done",
            "createdAt": "2026-01-10T12:00:00Z",
            "updatedAt": "2026-01-10T12:00:00Z",
        });
        let task: Task = serde_json::from_value(json).unwrap();
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.category, Category::Feature);
        assert!(task.attachments.is_empty());
        assert!(task.description.is_none());
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut task = sample_task();
        let before = task.clone();
        task.merge(&TaskPatch {
            priority: Some(Priority::High),
            ..Default::default()
        });
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.title, before.title);
        assert_eq!(task.description, before.description);
        assert_eq!(task.category, before.category);
        assert_eq!(task.updated_at, before.updated_at);
    }

    #[test]
    fn test_attachment_type_key() {
        let att = Attachment {
            name: "notes.pdf".to_string(),
            size: 1024,
            kind: "application/pdf".to_string(),
            url: "blob:notes".to_string(),
        };
        let json = serde_json::to_value(&att).unwrap();
        assert_eq!(json["type"], "application/pdf");
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = TaskDraft {
            title: String::new(),
            ..Default::default()
        };
        assert!(draft.validate().is_err());
        draft.title = "ok".to_string();
        assert!(draft.validate().is_ok());
        draft.description = Some("d".repeat(501));
        assert!(draft.validate().is_err());
    }
}
