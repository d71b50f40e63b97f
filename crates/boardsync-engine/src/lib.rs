//! Boardsync Engine
//!
//! Client-side synchronization engine for the collaborative task board:
//! a WebSocket channel connection with bounded reconnection, a single-writer
//! reducer task over [`boardsync_core::BoardState`], and a command emitter
//! that turns user intents into outbound messages. Local state changes only
//! through inbound events; the server stays authoritative.

pub mod config;
pub mod connection;
pub mod emitter;
pub mod engine;

pub use config::ChannelConfig;
pub use connection::ConnectionState;
pub use emitter::CommandEmitter;
pub use engine::SyncEngine;
