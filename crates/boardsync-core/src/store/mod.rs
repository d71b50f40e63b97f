//! Board state and its reducer.
//!
//! [`BoardState::apply`] is the single state-transition function for the
//! engine: deterministic, lock-free (one writer), and total — every
//! malformed or out-of-order event degrades to a logged no-op, never a
//! panic or an error.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::protocol::ServerEvent;
use crate::task::model::{Stage, Task, TaskPatch};

/// Tasks grouped by stage, plus the full-sync loading flag.
///
/// Order within a stage is arrival order and is never re-sorted. A task id
/// appears under at most one stage at any time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardState {
    stages: BTreeMap<Stage, Vec<Task>>,
    loading: bool,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardState {
    /// Create an empty board with all stages present.
    pub fn new() -> Self {
        let stages = Stage::ALL.iter().map(|s| (*s, Vec::new())).collect();
        Self {
            stages,
            loading: false,
        }
    }

    /// Tasks currently in `stage`, in arrival order.
    pub fn tasks_in(&self, stage: Stage) -> &[Task] {
        self.stages.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of tasks across all stages.
    pub fn total_tasks(&self) -> usize {
        self.stages.values().map(Vec::len).sum()
    }

    /// Locate a task by id.
    pub fn find(&self, task_id: &str) -> Option<(Stage, &Task)> {
        self.stages.iter().find_map(|(stage, tasks)| {
            tasks.iter().find(|t| t.id == task_id).map(|t| (*stage, t))
        })
    }

    /// Whether a full sync is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Mark a full sync as outstanding; cleared by the next `Sync` or
    /// `Created` event.
    pub fn begin_sync(&mut self) {
        self.loading = true;
    }

    /// Apply one inbound event, producing the next state in place.
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Sync { tasks } => self.apply_sync(tasks),
            ServerEvent::Created { task, stage } => self.apply_created(task, stage),
            ServerEvent::Updated {
                task_id,
                updates,
                stage,
            } => self.apply_updated(&task_id, updates, stage),
            ServerEvent::Moved {
                task_id,
                from_stage,
                to_stage,
            } => self.apply_moved(&task_id, from_stage, to_stage),
            ServerEvent::Deleted { task_id, stage } => self.apply_deleted(&task_id, stage),
        }
    }

    /// Full replace: regroup every task under its declared stage.
    fn apply_sync(&mut self, tasks: Vec<Task>) {
        debug!(count = tasks.len(), "applying full sync");
        for bucket in self.stages.values_mut() {
            bucket.clear();
        }
        for task in tasks {
            // Stage validity is enforced at decode; buckets for all stages exist.
            if let Some(bucket) = self.stages.get_mut(&task.stage) {
                bucket.push(task);
            }
        }
        self.loading = false;
    }

    fn apply_created(&mut self, mut task: Task, stage: Stage) {
        debug!(task_id = %task.id, stage = %stage.as_str(), "task created");
        // A creation echo re-using a live id displaces the old entry, so the
        // no-duplication invariant holds even for client-generated ids.
        if let Some((existing, _)) = self.find(&task.id) {
            warn!(task_id = %task.id, stage = %existing.as_str(), "duplicate task id, displacing existing entry");
            self.remove(&task.id, existing);
        }
        task.stage = stage;
        if let Some(bucket) = self.stages.get_mut(&stage) {
            bucket.push(task);
        }
        self.loading = false;
    }

    fn apply_updated(&mut self, task_id: &str, updates: TaskPatch, stage: Stage) {
        let Some(task) = self
            .stages
            .get_mut(&stage)
            .and_then(|bucket| bucket.iter_mut().find(|t| t.id == task_id))
        else {
            warn!(task_id = %task_id, stage = %stage.as_str(), "update for unknown task, ignoring");
            return;
        };
        debug!(task_id = %task_id, stage = %stage.as_str(), "task updated");
        task.merge(&updates);
    }

    fn apply_moved(&mut self, task_id: &str, from_stage: Stage, to_stage: Stage) {
        let Some(mut task) = self.remove(task_id, from_stage) else {
            warn!(
                task_id = %task_id,
                from = %from_stage.as_str(),
                "move for task not in source stage, ignoring"
            );
            return;
        };
        debug!(
            task_id = %task_id,
            from = %from_stage.as_str(),
            to = %to_stage.as_str(),
            "task moved"
        );
        task.stage = to_stage;
        if let Some(bucket) = self.stages.get_mut(&to_stage) {
            bucket.push(task);
        }
    }

    fn apply_deleted(&mut self, task_id: &str, stage: Stage) {
        // Removes every entry with the id, so a duplicate smuggled in by a
        // sync payload cannot survive a delete. Absent id is a no-op.
        let Some(bucket) = self.stages.get_mut(&stage) else {
            return;
        };
        let before = bucket.len();
        bucket.retain(|t| t.id != task_id);
        if bucket.len() < before {
            debug!(task_id = %task_id, stage = %stage.as_str(), "task deleted");
        }
    }

    /// Remove and return the task with `task_id` from `stage`, if present.
    fn remove(&mut self, task_id: &str, stage: Stage) -> Option<Task> {
        let bucket = self.stages.get_mut(&stage)?;
        let pos = bucket.iter().position(|t| t.id == task_id)?;
        Some(bucket.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{Priority, TaskDraft, TaskPatch};

    fn task(id: &str, stage: Stage) -> Task {
        let mut t = TaskDraft {
            title: format!("Task {}", id),
            ..Default::default()
        }
        .into_task(stage);
        t.id = id.to_string();
        t
    }

    fn ids(state: &BoardState, stage: Stage) -> Vec<&str> {
        state.tasks_in(stage).iter().map(|t| t.id.as_str()).collect()
    }

    /// Every task id appears under at most one stage.
    fn assert_no_duplicates(state: &BoardState) {
        let mut seen = std::collections::HashSet::new();
        for stage in Stage::ALL {
            for t in state.tasks_in(stage) {
                assert!(seen.insert(t.id.clone()), "task {} appears twice", t.id);
            }
        }
    }

    #[test]
    fn test_sync_then_created() {
        // Scenario A
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("t1", Stage::Todo)],
        });
        state.apply(ServerEvent::Created {
            task: task("t2", Stage::Done),
            stage: Stage::Done,
        });
        assert_eq!(ids(&state, Stage::Todo), vec!["t1"]);
        assert!(state.tasks_in(Stage::InProgress).is_empty());
        assert_eq!(ids(&state, Stage::Done), vec!["t2"]);
        assert_no_duplicates(&state);
    }

    #[test]
    fn test_move_between_stages() {
        // Scenario B
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("t1", Stage::Todo), task("t2", Stage::Done)],
        });
        state.apply(ServerEvent::Moved {
            task_id: "t1".to_string(),
            from_stage: Stage::Todo,
            to_stage: Stage::InProgress,
        });
        assert!(state.tasks_in(Stage::Todo).is_empty());
        assert_eq!(ids(&state, Stage::InProgress), vec!["t1"]);
        assert_eq!(ids(&state, Stage::Done), vec!["t2"]);
        assert_no_duplicates(&state);
    }

    #[test]
    fn test_move_conserves_task_count() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![
                task("a", Stage::Todo),
                task("b", Stage::Todo),
                task("c", Stage::Done),
            ],
        });
        let before = state.total_tasks();
        state.apply(ServerEvent::Moved {
            task_id: "a".to_string(),
            from_stage: Stage::Todo,
            to_stage: Stage::Done,
        });
        assert_eq!(state.tasks_in(Stage::Todo).len(), 1);
        assert_eq!(state.tasks_in(Stage::Done).len(), 2);
        assert_eq!(state.total_tasks(), before);
        // Moved task lands at the tail of the destination.
        assert_eq!(ids(&state, Stage::Done), vec!["c", "a"]);
    }

    #[test]
    fn test_move_missing_task_is_noop() {
        // Scenario E
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("t1", Stage::Todo)],
        });
        let before = state.clone();
        state.apply(ServerEvent::Moved {
            task_id: "ghost".to_string(),
            from_stage: Stage::Todo,
            to_stage: Stage::Done,
        });
        assert_eq!(state, before);
    }

    #[test]
    fn test_move_wrong_source_stage_is_noop() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("t1", Stage::Done)],
        });
        let before = state.clone();
        state.apply(ServerEvent::Moved {
            task_id: "t1".to_string(),
            from_stage: Stage::Todo,
            to_stage: Stage::InProgress,
        });
        assert_eq!(state, before);
        assert_no_duplicates(&state);
    }

    #[test]
    fn test_delete_is_idempotent() {
        // Scenario C
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("t2", Stage::Done)],
        });
        state.apply(ServerEvent::Deleted {
            task_id: "t2".to_string(),
            stage: Stage::Done,
        });
        assert!(state.tasks_in(Stage::Done).is_empty());
        let after_first = state.clone();
        state.apply(ServerEvent::Deleted {
            task_id: "t2".to_string(),
            stage: Stage::Done,
        });
        assert_eq!(state, after_first);
    }

    #[test]
    fn test_delete_removes_every_entry_with_id() {
        // A sync payload is trusted verbatim, so it can seed the same id
        // twice in one stage. A single delete must clear both entries.
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![
                task("dup", Stage::Todo),
                task("t2", Stage::Todo),
                task("dup", Stage::Todo),
            ],
        });
        assert_eq!(state.tasks_in(Stage::Todo).len(), 3);
        state.apply(ServerEvent::Deleted {
            task_id: "dup".to_string(),
            stage: Stage::Todo,
        });
        assert_eq!(ids(&state, Stage::Todo), vec!["t2"]);
        assert_no_duplicates(&state);
    }

    #[test]
    fn test_update_merges_partially() {
        // Scenario D
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("t1", Stage::InProgress)],
        });
        let title_before = state.tasks_in(Stage::InProgress)[0].title.clone();
        state.apply(ServerEvent::Updated {
            task_id: "t1".to_string(),
            updates: TaskPatch {
                priority: Some(Priority::High),
                ..Default::default()
            },
            stage: Stage::InProgress,
        });
        let t1 = &state.tasks_in(Stage::InProgress)[0];
        assert_eq!(t1.priority, Priority::High);
        assert_eq!(t1.title, title_before);
    }

    #[test]
    fn test_update_preserves_position() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("a", Stage::Todo), task("b", Stage::Todo)],
        });
        state.apply(ServerEvent::Updated {
            task_id: "a".to_string(),
            updates: TaskPatch {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
            stage: Stage::Todo,
        });
        assert_eq!(ids(&state, Stage::Todo), vec!["a", "b"]);
        assert_eq!(state.tasks_in(Stage::Todo)[0].title, "renamed");
    }

    #[test]
    fn test_update_unknown_task_is_noop() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("t1", Stage::Todo)],
        });
        let before = state.clone();
        state.apply(ServerEvent::Updated {
            task_id: "ghost".to_string(),
            updates: TaskPatch {
                priority: Some(Priority::High),
                ..Default::default()
            },
            stage: Stage::Todo,
        });
        assert_eq!(state, before);
    }

    #[test]
    fn test_sync_is_idempotent() {
        let tasks = vec![
            task("a", Stage::Todo),
            task("b", Stage::InProgress),
            task("c", Stage::Done),
        ];
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: tasks.clone(),
        });
        let first = state.clone();
        state.apply(ServerEvent::Sync { tasks });
        assert_eq!(state, first);
    }

    #[test]
    fn test_sync_replaces_wholesale() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("old", Stage::Todo)],
        });
        state.apply(ServerEvent::Sync {
            tasks: vec![task("new", Stage::Done)],
        });
        assert!(state.tasks_in(Stage::Todo).is_empty());
        assert_eq!(ids(&state, Stage::Done), vec!["new"]);
    }

    #[test]
    fn test_created_appends_to_tail() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Created {
            task: task("a", Stage::Todo),
            stage: Stage::Todo,
        });
        state.apply(ServerEvent::Created {
            task: task("b", Stage::Todo),
            stage: Stage::Todo,
        });
        assert_eq!(ids(&state, Stage::Todo), vec!["a", "b"]);
    }

    #[test]
    fn test_created_duplicate_id_displaces() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Created {
            task: task("t1", Stage::Todo),
            stage: Stage::Todo,
        });
        state.apply(ServerEvent::Created {
            task: task("t1", Stage::Done),
            stage: Stage::Done,
        });
        assert!(state.tasks_in(Stage::Todo).is_empty());
        assert_eq!(ids(&state, Stage::Done), vec!["t1"]);
        assert_no_duplicates(&state);
        assert_eq!(state.total_tasks(), 1);
    }

    #[test]
    fn test_loading_cleared_by_sync_and_created() {
        let mut state = BoardState::new();
        state.begin_sync();
        assert!(state.is_loading());
        state.apply(ServerEvent::Sync { tasks: vec![] });
        assert!(!state.is_loading());

        state.begin_sync();
        state.apply(ServerEvent::Created {
            task: task("t1", Stage::Todo),
            stage: Stage::Todo,
        });
        assert!(!state.is_loading());

        // Other events leave the flag alone.
        state.begin_sync();
        state.apply(ServerEvent::Deleted {
            task_id: "t1".to_string(),
            stage: Stage::Todo,
        });
        assert!(state.is_loading());
    }

    #[test]
    fn test_find_locates_task() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![task("t1", Stage::InProgress)],
        });
        let (stage, t) = state.find("t1").unwrap();
        assert_eq!(stage, Stage::InProgress);
        assert_eq!(t.id, "t1");
        assert!(state.find("ghost").is_none());
    }

    #[test]
    fn test_random_event_storm_preserves_invariant() {
        let mut state = BoardState::new();
        state.apply(ServerEvent::Sync {
            tasks: vec![
                task("a", Stage::Todo),
                task("b", Stage::Todo),
                task("c", Stage::InProgress),
            ],
        });
        let events = vec![
            ServerEvent::Moved {
                task_id: "a".to_string(),
                from_stage: Stage::Todo,
                to_stage: Stage::Done,
            },
            ServerEvent::Moved {
                task_id: "a".to_string(),
                from_stage: Stage::Todo,
                to_stage: Stage::InProgress,
            },
            ServerEvent::Created {
                task: task("b", Stage::Done),
                stage: Stage::Done,
            },
            ServerEvent::Deleted {
                task_id: "c".to_string(),
                stage: Stage::InProgress,
            },
            ServerEvent::Deleted {
                task_id: "c".to_string(),
                stage: Stage::InProgress,
            },
            ServerEvent::Updated {
                task_id: "b".to_string(),
                updates: TaskPatch {
                    priority: Some(Priority::High),
                    ..Default::default()
                },
                stage: Stage::Done,
            },
        ];
        for event in events {
            state.apply(event);
            assert_no_duplicates(&state);
        }
        assert_eq!(state.total_tasks(), 2);
    }
}
