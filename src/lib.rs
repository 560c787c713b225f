//! A streaming chat client.
//!
//! A [`ChatSession`] posts each user message to the chat service and appends the reply to
//! its transcript fragment by fragment as server-sent events arrive.

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod event;
pub mod render;
pub mod sse;
pub mod transcript;
pub mod types;

mod observability;

// Re-exports
pub use chat::{
    ChatConfig, ChatSession, SessionObserver, SessionState, SessionStats, StopHandle, StreamEnd,
    TurnOutcome, TurnSummary,
};
pub use client::{ByteStream, ChatClient, StreamResponse, Transport};
pub use error::{Error, Result};
pub use event::{LineEvent, interpret};
pub use observability::register_biometrics;
pub use render::PlainTextRenderer;
pub use sse::LineDecoder;
pub use transcript::{Transcript, TranscriptChange, TranscriptObserver};
pub use types::*;
