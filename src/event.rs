//! Classification of decoded stream lines.
//!
//! The chat service writes one `data: <json>` line per delta, separated by blank lines, and
//! ends the response with `data: [DONE]`.  Anything else on the wire is noise as far as the
//! transcript is concerned.

use crate::types::StreamDelta;

/// Field prefix that marks a protocol-relevant line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that ends the assistant turn.
pub const DONE_SENTINEL: &str = "[DONE]";

/// What a single line means to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A delta with a non-empty fragment to append to the assistant message.
    Append(StreamDelta),

    /// A well-formed delta without content, e.g. one that only sets `done` or
    /// `finish_reason`.
    Control(StreamDelta),

    /// The server reported an error in place of content.
    ServerError(String),

    /// The `[DONE]` sentinel.  No further lines of this response are read.
    Terminate,

    /// A `data:` line whose payload is not a delta.  Dropped without failing the turn.
    Malformed,

    /// A line that is not part of the protocol: blank lines, comments, other SSE fields.
    Ignored,
}

impl LineEvent {
    /// Returns the fragment to append, if this event carries one.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            LineEvent::Append(delta) => delta.fragment(),
            _ => None,
        }
    }
}

/// Interpret one complete line of the response stream.
pub fn interpret(line: &str) -> LineEvent {
    let Some(payload) = line.strip_prefix(DATA_PREFIX).map(str::trim) else {
        return LineEvent::Ignored;
    };
    if payload == DONE_SENTINEL {
        return LineEvent::Terminate;
    }
    let Ok(delta) = serde_json::from_str::<StreamDelta>(payload) else {
        return LineEvent::Malformed;
    };
    if delta.fragment().is_some() {
        LineEvent::Append(delta)
    } else if let Some(error) = delta.error {
        LineEvent::ServerError(error)
    } else {
        LineEvent::Control(delta)
    }
}
