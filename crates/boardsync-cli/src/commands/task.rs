//! Task commands.
//!
//! Each command connects, waits for the initial sync, emits exactly one
//! intent, then waits for the authority's echo to land in the local snapshot
//! before confirming — the board never changes optimistically.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use boardsync_core::{Category, Priority, Stage, Task, TaskDraft, TaskPatch};
use boardsync_engine::ChannelConfig;

use crate::commands::{connect_synced, wait_for_echo};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a new task
    New(NewTaskArgs),

    /// Edit fields of an existing task
    Edit(EditTaskArgs),

    /// Move a task to a different stage
    Move(MoveTaskArgs),

    /// Delete a task
    Delete(DeleteTaskArgs),
}

#[derive(Args)]
pub struct NewTaskArgs {
    /// Task title
    pub title: String,

    /// Task description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Priority (low, medium, high)
    #[arg(long, default_value = "low")]
    pub priority: String,

    /// Category (bug, feature, enhancement)
    #[arg(long, default_value = "feature")]
    pub category: String,

    /// Stage to create the task in
    #[arg(long, default_value = "To Do")]
    pub stage: String,
}

#[derive(Args)]
pub struct EditTaskArgs {
    /// Task ID
    pub task_id: String,

    /// Stage the task currently lives in
    pub stage: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// New priority (low, medium, high)
    #[arg(long)]
    pub priority: Option<String>,

    /// New category (bug, feature, enhancement)
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct MoveTaskArgs {
    /// Task ID
    pub task_id: String,

    /// Source stage
    pub from: String,

    /// Destination stage
    pub to: String,
}

#[derive(Args)]
pub struct DeleteTaskArgs {
    /// Task ID
    pub task_id: String,

    /// Stage the task lives in
    pub stage: String,
}

pub async fn execute(cmd: TaskCommands, config: ChannelConfig) -> Result<()> {
    let engine = connect_synced(config).await?;
    let emitter = engine.emitter();

    match cmd {
        TaskCommands::New(args) => {
            let stage = parse_stage(&args.stage)?;
            let draft = TaskDraft {
                title: args.title,
                description: args.description,
                priority: parse_priority(&args.priority)?,
                category: parse_category(&args.category)?,
                attachments: Vec::new(),
            };
            let task = emitter.create_task(draft, stage).await?;
            wait_for_echo(&engine, "creation", |s| s.find(&task.id).is_some()).await?;
            println!(
                "{} Created task: {} ({})",
                "✓".green().bold(),
                task.title.cyan(),
                task.id.dimmed()
            );
        }

        TaskCommands::Edit(args) => {
            let stage = parse_stage(&args.stage)?;
            let patch = TaskPatch {
                title: args.title,
                description: args.description,
                priority: args.priority.as_deref().map(parse_priority).transpose()?,
                category: args.category.as_deref().map(parse_category).transpose()?,
                ..Default::default()
            };
            emitter
                .update_task(&args.task_id, patch.clone(), stage)
                .await?;
            wait_for_echo(&engine, "update", |s| {
                s.tasks_in(stage)
                    .iter()
                    .any(|t| t.id == args.task_id && patch_applied(t, &patch))
            })
            .await?;
            println!(
                "{} Updated task {}",
                "✓".green().bold(),
                args.task_id.dimmed()
            );
        }

        TaskCommands::Move(args) => {
            let from = parse_stage(&args.from)?;
            let to = parse_stage(&args.to)?;
            emitter.move_task(&args.task_id, from, to).await?;
            wait_for_echo(&engine, "move", |s| {
                s.tasks_in(to).iter().any(|t| t.id == args.task_id)
            })
            .await?;
            println!(
                "{} Moved task {} to {}",
                "✓".green().bold(),
                args.task_id.dimmed(),
                to.as_str().yellow()
            );
        }

        TaskCommands::Delete(args) => {
            let stage = parse_stage(&args.stage)?;
            emitter.delete_task(&args.task_id, stage).await?;
            wait_for_echo(&engine, "deletion", |s| {
                s.tasks_in(stage).iter().all(|t| t.id != args.task_id)
            })
            .await?;
            println!(
                "{} Deleted task {}",
                "✓".green().bold(),
                args.task_id.dimmed()
            );
        }
    }

    engine.shutdown().await;
    Ok(())
}

/// Whether every field the patch carries is visible on the task.
fn patch_applied(task: &Task, patch: &TaskPatch) -> bool {
    patch.title.as_ref().is_none_or(|t| task.title == *t)
        && patch
            .description
            .as_ref()
            .is_none_or(|d| task.description.as_deref() == Some(d.as_str()))
        && patch.priority.is_none_or(|p| task.priority == p)
        && patch.category.is_none_or(|c| task.category == c)
}

fn parse_stage(s: &str) -> Result<Stage> {
    Stage::from_str(s)
        .or_else(|| match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "todo" | "to do" => Some(Stage::Todo),
            "inprogress" | "in progress" => Some(Stage::InProgress),
            "done" => Some(Stage::Done),
            _ => None,
        })
        .ok_or_else(|| anyhow!("Unknown stage '{}' (expected: To Do, In Progress, Done)", s))
}

fn parse_priority(s: &str) -> Result<Priority> {
    match s.to_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        _ => Err(anyhow!("Unknown priority '{}' (expected: low, medium, high)", s)),
    }
}

fn parse_category(s: &str) -> Result<Category> {
    match s.to_lowercase().as_str() {
        "bug" => Ok(Category::Bug),
        "feature" => Ok(Category::Feature),
        "enhancement" => Ok(Category::Enhancement),
        _ => Err(anyhow!(
            "Unknown category '{}' (expected: bug, feature, enhancement)",
            s
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage_accepts_aliases() {
        assert_eq!(parse_stage("To Do").unwrap(), Stage::Todo);
        assert_eq!(parse_stage("todo").unwrap(), Stage::Todo);
        assert_eq!(parse_stage("in-progress").unwrap(), Stage::InProgress);
        assert_eq!(parse_stage("in_progress").unwrap(), Stage::InProgress);
        assert_eq!(parse_stage("DONE").unwrap(), Stage::Done);
        assert!(parse_stage("limbo").is_err());
    }

    #[test]
    fn test_parse_priority_and_category() {
        assert_eq!(parse_priority("HIGH").unwrap(), Priority::High);
        assert!(parse_priority("urgent").is_err());
        assert_eq!(parse_category("bug").unwrap(), Category::Bug);
        assert!(parse_category("chore").is_err());
    }
}
