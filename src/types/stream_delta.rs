use serde::{Deserialize, Serialize};

/// The JSON payload of one `data:` line in the response stream.
///
/// Every field is optional on the wire.  `content` is a fragment to append to the assistant
/// message, never a replacement.  `done` marks the logical end of the turn but does not stop
/// the reader: only the `[DONE]` sentinel or the end of the body does that.  `error` is set by
/// the server when generation failed part way through.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamDelta {
    /// Text to append to the assistant message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Set when the server considers the assistant turn complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,

    /// Why generation stopped, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Error reported by the server in place of content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamDelta {
    /// Create a delta carrying a content fragment.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Returns the fragment to append, if there is a non-empty one.
    pub fn fragment(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    /// Returns true if the server marked the turn as done.
    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_payload() {
        let delta: StreamDelta =
            serde_json::from_str(r#"{"content":"Hi","done":false,"finish_reason":"stop"}"#)
                .unwrap();
        assert_eq!(delta.fragment(), Some("Hi"));
        assert!(!delta.is_done());
        assert_eq!(delta.finish_reason.as_deref(), Some("stop"));
        assert!(delta.error.is_none());
    }

    #[test]
    fn missing_fields_default() {
        let delta: StreamDelta = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert_eq!(delta.fragment(), None);
        assert!(delta.is_done());

        let delta: StreamDelta = serde_json::from_str("{}").unwrap();
        assert_eq!(delta, StreamDelta::default());
    }

    #[test]
    fn empty_or_null_content_is_not_a_fragment() {
        let delta: StreamDelta = serde_json::from_str(r#"{"content":""}"#).unwrap();
        assert_eq!(delta.fragment(), None);
        let delta: StreamDelta = serde_json::from_str(r#"{"content":null}"#).unwrap();
        assert_eq!(delta.fragment(), None);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(serde_json::from_str::<StreamDelta>(r#"{"content":5}"#).is_err());
        assert!(serde_json::from_str::<StreamDelta>("[1,2]").is_err());
    }

    #[test]
    fn text_constructor_skips_unset_fields() {
        assert_eq!(
            serde_json::to_string(&StreamDelta::text("A")).unwrap(),
            r#"{"content":"A"}"#
        );
    }
}
