//! Terminal rendering for a streaming chat session.
//!
//! [`PlainTextRenderer`] observes the transcript and the session and writes the assistant's
//! reply as it grows, with optional ANSI styling for errors and role labels.

use std::io::{self, Stdout, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::chat::{SessionObserver, SessionState};
use crate::transcript::{TranscriptChange, TranscriptObserver};
use crate::types::{Message, MessageRole};

/// ANSI escape code for dim text (used for informational messages).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for role labels).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

struct RenderState<W> {
    out: W,
    line_start: bool,
}

/// Plain text renderer with optional ANSI styling.
///
/// Fragments are written and flushed as they arrive so the reply appears incrementally.
/// When a turn ends the renderer makes sure the cursor is back at the start of a line.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    state: Mutex<RenderState<W>>,
    use_color: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with the specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer that writes to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            state: Mutex::new(RenderState {
                out,
                line_start: true,
            }),
            use_color,
        }
    }

    /// Consumes the renderer and returns its writer.
    pub fn into_writer(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }

    /// Prints an informational message on its own line.
    pub fn print_info(&self, info: &str) {
        let styled = self.styled(ANSI_DIM, info);
        self.write_line(&styled);
    }

    /// Prints an error message on its own line.
    pub fn print_error(&self, error: &str) {
        let styled = self.styled(ANSI_RED, &format!("Error: {error}"));
        self.write_line(&styled);
    }

    /// Notes that the reply was stopped by the user.
    pub fn print_interrupted(&self) {
        let styled = self.styled(ANSI_DIM, "[interrupted]");
        self.write_line(&styled);
    }

    /// Prints every message in the transcript with a role label.
    pub fn print_history(&self, messages: &[Message]) {
        if messages.is_empty() {
            self.print_info("(no messages)");
            return;
        }
        for message in messages {
            let label = match message.role {
                MessageRole::User => "you",
                MessageRole::Assistant => "assistant",
            };
            let label = self.styled(ANSI_CYAN, &format!("{label}:"));
            self.write_line(&format!("{label} {}", message.content));
        }
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn lock(&self) -> MutexGuard<'_, RenderState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Terminal write failures are ignored; rendering must never end a turn.

    /// Writes text as-is, tracking whether the cursor ends at the start of a line.
    fn write_text(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut state = self.lock();
        let _ = state.out.write_all(text.as_bytes());
        let _ = state.out.flush();
        state.line_start = text.ends_with('\n');
    }

    /// Writes `text` on a line of its own, breaking the current line first if needed.
    fn write_line(&self, text: &str) {
        let mut state = self.lock();
        if !state.line_start {
            let _ = state.out.write_all(b"\n");
        }
        let _ = writeln!(state.out, "{text}");
        let _ = state.out.flush();
        state.line_start = true;
    }

    fn end_line(&self) {
        let mut state = self.lock();
        if !state.line_start {
            let _ = state.out.write_all(b"\n");
            let _ = state.out.flush();
            state.line_start = true;
        }
    }
}

impl<W: Write + Send> TranscriptObserver for PlainTextRenderer<W> {
    fn transcript_changed(&self, messages: &[Message], change: TranscriptChange<'_>) {
        match change {
            TranscriptChange::Appended { fragment } => self.write_text(fragment),
            TranscriptChange::Replaced => {
                if let Some(last) = messages.last() {
                    let styled = self.styled(ANSI_RED, &last.content);
                    self.write_line(&styled);
                }
            }
            TranscriptChange::TurnAppended | TranscriptChange::Cleared => {}
        }
    }
}

impl<W: Write + Send> SessionObserver for PlainTextRenderer<W> {
    fn state_changed(&self, state: SessionState) {
        if state == SessionState::Idle {
            self.end_line();
        }
    }

    fn server_error(&self, message: &str) {
        let styled = self.styled(ANSI_RED, &format!("[server error: {message}]"));
        self.write_line(&styled);
    }
}
