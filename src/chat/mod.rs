//! Chat session module for streaming conversations with a chat service.
//!
//! This module provides the turn controller and the pieces of the interactive REPL built on
//! top of it. It supports:
//!
//! - Streaming replies appended to the transcript as they arrive
//! - Stopping a reply mid-stream, from the session or a cloned [`StopHandle`]
//! - Slash commands for session control
//! - Configurable endpoint and timeouts
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: The turn controller and its observers
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::PlainTextRenderer;
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{BASE_URL_ENV, ChatArgs, ChatConfig, DEFAULT_BASE_URL};
pub use session::{
    CONNECT_ERROR_TEXT, ChatSession, SessionObserver, SessionState, SessionStats, StopHandle,
    StreamEnd, TurnOutcome, TurnSummary,
};
