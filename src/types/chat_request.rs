use serde::{Deserialize, Serialize};

use crate::types::MessageRole;

/// The outbound body of a streaming chat request.
///
/// The chat service accepts a single message per request and keeps no history for the
/// client, so this is all that goes over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The role of the sender; always [`MessageRole::User`] for requests built by a session.
    pub role: MessageRole,

    /// The user's text, already trimmed.
    pub content: String,
}

impl ChatRequest {
    /// Create a request carrying a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_role_then_content() {
        let request = ChatRequest::user("What is a rope?");
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"role":"user","content":"What is a rope?"}"#
        );
    }
}
