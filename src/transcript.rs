//! The ordered conversation history.
//!
//! A [`Transcript`] only ever grows at the end: a turn adds a user message and an empty
//! assistant placeholder together, and streamed fragments extend the placeholder.  Observers
//! registered with [`Transcript::subscribe`] are told about every mutation so a presentation
//! layer can redraw without the transcript knowing anything about it.

use std::sync::Arc;

use crate::types::{Message, MessageRole};

/// Describes the mutation an observer is being notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptChange<'a> {
    /// A user message and its assistant placeholder were appended.
    TurnAppended,

    /// `fragment` was appended to the last message.
    Appended {
        /// The fragment, exactly as it was appended.
        fragment: &'a str,
    },

    /// The content of the last message was replaced.
    Replaced,

    /// Every message was removed.
    Cleared,
}

/// Receives transcript mutations.
///
/// Observers are called synchronously while the transcript is being mutated, so they must
/// not call back into whatever owns the transcript.
pub trait TranscriptObserver: Send + Sync {
    /// Called after every mutation with the full, updated list of messages.
    fn transcript_changed(&self, messages: &[Message], change: TranscriptChange<'_>);
}

/// Ordered, observable list of messages.
#[derive(Default)]
pub struct Transcript {
    messages: Vec<Message>,
    observers: Vec<Arc<dyn TranscriptObserver>>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer that is notified of every subsequent mutation.
    pub fn subscribe(&mut self, observer: Arc<dyn TranscriptObserver>) {
        self.observers.push(observer);
    }

    /// Appends a user message followed by an empty assistant message.
    ///
    /// Both entries are in place before observers are notified, so nobody ever sees a user
    /// message without its placeholder.
    pub fn append_turn(&mut self, user_text: impl Into<String>) {
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(String::new()));
        self.notify(TranscriptChange::TurnAppended);
    }

    /// Appends `fragment` to the content of the last message.
    ///
    /// # Panics
    ///
    /// Panics if the transcript is empty or the last message is not an assistant message.
    pub fn append_to_last(&mut self, fragment: &str) {
        self.active_assistant("append_to_last").content.push_str(fragment);
        self.notify(TranscriptChange::Appended { fragment });
    }

    /// Replaces the content of the last message.
    ///
    /// Used to put an error in the assistant placeholder when nothing was streamed into it.
    ///
    /// # Panics
    ///
    /// Panics if the transcript is empty or the last message is not an assistant message.
    pub fn replace_last(&mut self, content: impl Into<String>) {
        self.active_assistant("replace_last").content = content.into();
        self.notify(TranscriptChange::Replaced);
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.notify(TranscriptChange::Cleared);
    }

    /// The messages, in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn active_assistant(&mut self, op: &str) -> &mut Message {
        match self.messages.last_mut() {
            Some(message) if message.role == MessageRole::Assistant => message,
            Some(message) => panic!("{op}: last message has role {}", message.role),
            None => panic!("{op}: transcript is empty"),
        }
    }

    fn notify(&self, change: TranscriptChange<'_>) {
        for observer in &self.observers {
            observer.transcript_changed(&self.messages, change);
        }
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("messages", &self.messages)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(usize, String)>>,
    }

    impl TranscriptObserver for Recorder {
        fn transcript_changed(&self, messages: &[Message], change: TranscriptChange<'_>) {
            let label = match change {
                TranscriptChange::TurnAppended => "turn".to_string(),
                TranscriptChange::Appended { fragment } => format!("append:{fragment}"),
                TranscriptChange::Replaced => "replace".to_string(),
                TranscriptChange::Cleared => "clear".to_string(),
            };
            self.seen.lock().unwrap().push((messages.len(), label));
        }
    }

    #[test]
    fn append_turn_adds_placeholder() {
        let mut transcript = Transcript::new();
        transcript.append_turn("hello");
        assert_eq!(
            transcript.messages(),
            &[Message::user("hello"), Message::assistant("")]
        );
    }

    #[test]
    fn append_to_last_only_touches_last() {
        let mut transcript = Transcript::new();
        transcript.append_turn("first");
        transcript.append_to_last("one");
        transcript.append_turn("second");
        transcript.append_to_last("A");
        transcript.append_to_last("B");
        assert_eq!(
            transcript.messages(),
            &[
                Message::user("first"),
                Message::assistant("one"),
                Message::user("second"),
                Message::assistant("AB"),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "transcript is empty")]
    fn append_to_empty_panics() {
        Transcript::new().append_to_last("x");
    }

    #[test]
    #[should_panic(expected = "last message has role user")]
    fn append_after_user_panics() {
        let mut transcript = Transcript::new();
        transcript.messages.push(Message::user("dangling"));
        transcript.append_to_last("x");
    }

    #[test]
    fn replace_last_overwrites_placeholder() {
        let mut transcript = Transcript::new();
        transcript.append_turn("hi");
        transcript.replace_last("Error: Could not reach the server.");
        assert_eq!(
            transcript.last(),
            Some(&Message::assistant("Error: Could not reach the server."))
        );
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn observers_see_each_mutation_once() {
        let recorder = Arc::new(Recorder::default());
        let mut transcript = Transcript::new();
        transcript.subscribe(recorder.clone());

        transcript.append_turn("hi");
        transcript.append_to_last("yo");
        transcript.replace_last("oops");
        transcript.clear();
        assert!(transcript.is_empty());

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (2, "turn".to_string()),
                (2, "append:yo".to_string()),
                (2, "replace".to_string()),
                (0, "clear".to_string()),
            ]
        );
    }
}
