//! Core chat session management.
//!
//! A [`ChatSession`] drives one turn at a time: it records the user's message, posts it
//! through a [`Transport`], and folds the streamed reply into the transcript as it arrives.
//! Every method takes `&self`, so a presentation layer can read the transcript, observe
//! state changes, and stop the turn while [`ChatSession::send`] is suspended waiting for
//! data.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::{ByteStream, Transport};
use crate::error::{Error, Result};
use crate::event::{LineEvent, interpret};
use crate::observability::{
    SESSION_IGNORED_SENDS, SESSION_TURNS, STREAM_BYTES, STREAM_CANCELLATIONS,
    STREAM_DISCARDED_BYTES, STREAM_DURATION, STREAM_ERRORS, STREAM_FRAGMENTS,
    STREAM_IGNORED_LINES, STREAM_LINES, STREAM_MALFORMED_LINES, STREAM_SERVER_ERRORS,
};
use crate::sse::LineDecoder;
use crate::transcript::{Transcript, TranscriptObserver};
use crate::types::{ChatRequest, Message};

/// Assistant text written when the request never reached the server.
pub const CONNECT_ERROR_TEXT: &str = "Error: Could not reach the server.";

/// Whether a turn is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No turn is in progress; `send` will start one.
    Idle,

    /// A turn is in progress; `send` is a no-op and `stop` will end it.
    Streaming,
}

/// Receives session-level events that are not transcript mutations.
pub trait SessionObserver: Send + Sync {
    /// Called when the session enters or leaves [`SessionState::Streaming`].
    fn state_changed(&self, state: SessionState);

    /// Called when the server reports an error inside the stream.
    fn server_error(&self, message: &str) {
        _ = message;
    }
}

/// How a streamed reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server sent `[DONE]`.
    Sentinel,

    /// The response body ended without a sentinel.
    EndOfData,

    /// The turn was stopped by the user.
    Cancelled,
}

/// What happened during a turn whose response was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    /// How the stream ended.
    pub end: StreamEnd,
    /// Number of fragments appended to the assistant message.
    pub fragments: usize,
    /// The last `finish_reason` the server sent, if any.
    pub finish_reason: Option<String>,
    /// The last error the server reported inside the stream, if any.
    pub server_error: Option<String>,
    /// Bytes of an unterminated final line that were dropped.
    pub discarded_bytes: usize,
}

impl TurnSummary {
    fn new() -> Self {
        Self {
            end: StreamEnd::EndOfData,
            fragments: 0,
            finish_reason: None,
            server_error: None,
            discarded_bytes: 0,
        }
    }
}

/// The result of [`ChatSession::send`].
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The input was blank or a turn was already in progress; nothing happened.
    Ignored,

    /// The reply was streamed until the sentinel, end of data, or cancellation.
    Finished(TurnSummary),

    /// The request failed, the server refused it, or the stream broke.  The transcript
    /// holds whatever was received or, if nothing was, an error message.
    Failed(Error),
}

impl TurnOutcome {
    /// Returns true if the send was a no-op.
    pub fn is_ignored(&self) -> bool {
        matches!(self, TurnOutcome::Ignored)
    }

    /// Returns the summary of a finished turn.
    pub fn summary(&self) -> Option<&TurnSummary> {
        match self {
            TurnOutcome::Finished(summary) => Some(summary),
            _ => None,
        }
    }

    /// Returns the error of a failed turn.
    pub fn error(&self) -> Option<&Error> {
        match self {
            TurnOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of messages in the transcript.
    pub message_count: usize,
    /// Turns that were started.
    pub turns_started: u64,
    /// Turns whose reply was read to the sentinel or end of data.
    pub turns_completed: u64,
    /// Turns stopped by the user, or abandoned by dropping the `send` future.
    pub turns_cancelled: u64,
    /// Turns that ended in an error.
    pub turns_failed: u64,
    /// Fragments appended across all turns.
    pub fragments: u64,
}

struct TurnSlot {
    state: SessionState,
    cancel: Option<CancellationToken>,
}

/// The single turn slot shared between a session and its stop handles.
struct TurnControl {
    slot: Mutex<TurnSlot>,
}

impl TurnControl {
    fn new() -> Self {
        Self {
            slot: Mutex::new(TurnSlot {
                state: SessionState::Idle,
                cancel: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TurnSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Claims the slot for a new turn.  Fails if one is already in progress.
    fn try_begin(&self) -> bool {
        let mut slot = self.lock();
        if slot.state == SessionState::Streaming {
            return false;
        }
        slot.state = SessionState::Streaming;
        true
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        self.lock().cancel = Some(token.clone());
        token
    }

    fn release(&self) {
        let mut slot = self.lock();
        slot.cancel = None;
        slot.state = SessionState::Idle;
    }

    fn stop(&self) -> bool {
        match &self.lock().cancel {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Stops the session's current turn from anywhere, including other threads.
#[derive(Clone)]
pub struct StopHandle {
    control: Arc<TurnControl>,
}

impl StopHandle {
    /// Stops the streaming turn, if there is one reading a response.
    ///
    /// Returns false if there was nothing to stop.
    pub fn stop(&self) -> bool {
        self.control.stop()
    }

    /// Returns true while a turn is in progress.
    pub fn is_streaming(&self) -> bool {
        self.control.state() == SessionState::Streaming
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("state", &self.control.state())
            .finish()
    }
}

/// A chat session that manages the transcript and one streaming turn at a time.
pub struct ChatSession<T: Transport> {
    transport: T,
    transcript: Mutex<Transcript>,
    control: Arc<TurnControl>,
    observers: Mutex<Vec<Arc<dyn SessionObserver>>>,
    stats: Mutex<SessionStats>,
}

/// Returns the session to idle however a turn ends, including when the `send` future is
/// dropped or a panic unwinds through it.
struct TurnGuard<'a, T: Transport> {
    session: &'a ChatSession<T>,
    recorded: bool,
}

impl<T: Transport> Drop for TurnGuard<'_, T> {
    fn drop(&mut self) {
        // A turn abandoned mid-flight counts as stopped.
        if !self.recorded {
            lock(&self.session.stats).turns_cancelled += 1;
        }
        self.session.control.release();
        self.session.notify_state(SessionState::Idle);
    }
}

impl<T: Transport> ChatSession<T> {
    /// Creates a new, idle session with an empty transcript.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            transcript: Mutex::new(Transcript::new()),
            control: Arc::new(TurnControl::new()),
            observers: Mutex::new(Vec::new()),
            stats: Mutex::new(SessionStats::default()),
        }
    }

    /// The transport this session sends requests through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registers an observer of transcript mutations.
    pub fn subscribe(&self, observer: Arc<dyn TranscriptObserver>) {
        self.transcript().subscribe(observer);
    }

    /// Registers an observer of state changes and server-reported errors.
    pub fn watch(&self, observer: Arc<dyn SessionObserver>) {
        lock(&self.observers).push(observer);
    }

    /// Sends a user message and streams the reply into the transcript.
    ///
    /// Blank input, or input while another turn is in progress, is ignored.  Otherwise the
    /// trimmed text and an empty assistant message are appended before the request is
    /// issued, and the assistant message grows as fragments arrive.  Failures are written
    /// into the assistant message when nothing was streamed yet.  Whatever happens, the
    /// session is idle again when this returns.
    pub async fn send(&self, user_text: &str) -> TurnOutcome {
        let content = user_text.trim();
        if content.is_empty() || !self.control.try_begin() {
            SESSION_IGNORED_SENDS.click();
            return TurnOutcome::Ignored;
        }
        let mut turn = TurnGuard {
            session: self,
            recorded: false,
        };
        SESSION_TURNS.click();
        self.transcript().append_turn(content);
        lock(&self.stats).turns_started += 1;
        self.notify_state(SessionState::Streaming);

        let outcome = self.run_turn(content).await;

        let mut stats = lock(&self.stats);
        match &outcome {
            TurnOutcome::Finished(summary) => {
                stats.fragments += summary.fragments as u64;
                if summary.end == StreamEnd::Cancelled {
                    stats.turns_cancelled += 1;
                } else {
                    stats.turns_completed += 1;
                }
            }
            TurnOutcome::Failed(_) => stats.turns_failed += 1,
            TurnOutcome::Ignored => {}
        }
        drop(stats);
        turn.recorded = true;
        outcome
    }

    /// Stops the turn in progress.  Returns false if no response is being read.
    ///
    /// The turn ends at its next wait for data; a chunk that was already received is still
    /// applied in full.
    pub fn stop(&self) -> bool {
        self.control.stop()
    }

    /// Returns a handle that can stop this session's turns from another task or thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            control: Arc::clone(&self.control),
        }
    }

    /// Returns the current session state.
    pub fn state(&self) -> SessionState {
        self.control.state()
    }

    /// Returns true while a turn is in progress.
    pub fn is_streaming(&self) -> bool {
        self.state() == SessionState::Streaming
    }

    /// Returns a snapshot of the transcript.
    pub fn messages(&self) -> Vec<Message> {
        self.transcript().messages().to_vec()
    }

    /// Returns the number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        self.transcript().len()
    }

    /// Clears the transcript.  Refused (returns false) while a turn is in progress.
    pub fn clear(&self) -> bool {
        if !self.control.try_begin() {
            return false;
        }
        self.transcript().clear();
        self.control.release();
        true
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let mut stats = lock(&self.stats).clone();
        stats.message_count = self.message_count();
        stats
    }

    async fn run_turn(&self, content: &str) -> TurnOutcome {
        let start = Instant::now();
        let request = ChatRequest::user(content);
        let response = match self.transport.open_stream(&request).await {
            Ok(response) => response,
            Err(err) => {
                self.transcript().replace_last(CONNECT_ERROR_TEXT);
                return TurnOutcome::Failed(err);
            }
        };

        let success = response.is_success();
        let body = match response.body {
            Some(body) if success => body,
            _ => {
                let text = format!("Error: {} {}", response.status, response.status_text);
                let text = text.trim_end();
                self.transcript().replace_last(text);
                return TurnOutcome::Failed(Error::api(
                    response.status,
                    response.status_text,
                    "chat service did not return a readable stream",
                ));
            }
        };

        let cancel = self.control.arm();
        let result = self.read_stream(body, &cancel).await;
        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        match result {
            Ok(summary) => TurnOutcome::Finished(summary),
            Err(err) => {
                STREAM_ERRORS.click();
                TurnOutcome::Failed(err)
            }
        }
    }

    async fn read_stream(
        &self,
        mut body: ByteStream,
        cancel: &CancellationToken,
    ) -> Result<TurnSummary> {
        let mut decoder = LineDecoder::new();
        let mut summary = TurnSummary::new();
        summary.end = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    STREAM_CANCELLATIONS.click();
                    break StreamEnd::Cancelled;
                }
                next = body.next() => next,
            };
            let Some(chunk) = next else {
                break StreamEnd::EndOfData;
            };
            let chunk = chunk?;
            STREAM_BYTES.count(chunk.len() as u64);
            if self.apply_lines(decoder.push(&chunk), &mut summary).is_break() {
                break StreamEnd::Sentinel;
            }
        };
        summary.discarded_bytes = decoder.finish();
        STREAM_DISCARDED_BYTES.count(summary.discarded_bytes as u64);
        Ok(summary)
    }

    fn apply_lines(&self, lines: Vec<String>, summary: &mut TurnSummary) -> ControlFlow<()> {
        for line in lines {
            STREAM_LINES.click();
            match interpret(&line) {
                LineEvent::Append(delta) => {
                    if let Some(fragment) = delta.fragment() {
                        self.transcript().append_to_last(fragment);
                        summary.fragments += 1;
                        STREAM_FRAGMENTS.click();
                    }
                    if delta.finish_reason.is_some() {
                        summary.finish_reason = delta.finish_reason;
                    }
                }
                LineEvent::Control(delta) => {
                    if delta.finish_reason.is_some() {
                        summary.finish_reason = delta.finish_reason;
                    }
                }
                LineEvent::ServerError(message) => {
                    STREAM_SERVER_ERRORS.click();
                    for observer in self.observers() {
                        observer.server_error(&message);
                    }
                    summary.server_error = Some(message);
                }
                LineEvent::Terminate => return ControlFlow::Break(()),
                LineEvent::Malformed => STREAM_MALFORMED_LINES.click(),
                LineEvent::Ignored => STREAM_IGNORED_LINES.click(),
            }
        }
        ControlFlow::Continue(())
    }

    fn transcript(&self) -> MutexGuard<'_, Transcript> {
        lock(&self.transcript)
    }

    fn observers(&self) -> Vec<Arc<dyn SessionObserver>> {
        lock(&self.observers).clone()
    }

    fn notify_state(&self, state: SessionState) {
        for observer in self.observers() {
            observer.state_changed(state);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
