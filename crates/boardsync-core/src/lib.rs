//! Boardsync Core Library
//!
//! Domain model, wire protocol, and the board state reducer for the
//! collaborative task board sync engine.

pub mod error;
pub mod protocol;
pub mod store;
pub mod task;

pub use error::{BoardError, BoardResult};
pub use protocol::{ClientCommand, ServerEvent};
pub use store::BoardState;
pub use task::model::{Attachment, Category, Priority, Stage, Task, TaskDraft, TaskPatch};
