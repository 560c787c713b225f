//! Configuration types for the chat client.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved configuration
//! consumed by [`crate::ChatClient`].

use std::time::Duration;

use arrrg_derive::CommandLine;
use url::Url;

use crate::error::{Error, Result};

/// Base URL used when neither the command line nor the environment names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8094/api/";

/// Environment variable consulted for the base URL.
pub const BASE_URL_ENV: &str = "CHATSTREAM_BASE_URL";

/// Path of the streaming endpoint, relative to the base URL.
const STREAM_PATH: &str = "chats/stream";

/// Default time allowed for establishing the connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Command-line arguments for the chatstream tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat service.
    #[arrrg(optional, "Base URL of the chat service (default: http://localhost:8094/api/)", "URL")]
    pub url: Option<String>,

    /// Connect timeout in seconds.
    #[arrrg(optional, "Seconds allowed to connect (default: 10)", "SECONDS")]
    pub connect_timeout: Option<u64>,

    /// Idle timeout between chunks in seconds.
    #[arrrg(optional, "Give up on a reply after this many seconds without data", "SECONDS")]
    pub idle_timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat client.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Base URL of the chat service; the streaming endpoint is resolved against it.
    pub base_url: String,

    /// Time allowed for establishing the connection.
    pub connect_timeout: Duration,

    /// Maximum time to wait for the response head, and then for each next chunk of a reply.
    /// `None` waits indefinitely.
    pub idle_timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: `$CHATSTREAM_BASE_URL`, else http://localhost:8094/api/
    /// - Connect timeout: 10 seconds
    /// - Idle timeout: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self::with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    fn with_base_url_override(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: None,
            use_color: true,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the idle timeout between chunks.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Resolves the streaming endpoint against the base URL.
    ///
    /// A missing trailing slash on the base URL is tolerated, so `http://host/api` and
    /// `http://host/api/` resolve to the same endpoint.
    pub fn stream_url(&self) -> Result<Url> {
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(Error::validation(
                format!("base URL must be http or https: {}", self.base_url),
                Some("url".to_string()),
            ));
        }
        Ok(base.join(STREAM_PATH)?)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let mut config = match args.url {
            Some(url) => ChatConfig::new().with_base_url(url),
            None => ChatConfig::new(),
        };
        if let Some(secs) = args.connect_timeout {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config.idle_timeout = args.idle_timeout.map(Duration::from_secs);
        config.use_color = !args.no_color;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::with_base_url_override(None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.idle_timeout.is_none());
        assert!(config.use_color);
    }

    #[test]
    fn environment_override() {
        let config = ChatConfig::with_base_url_override(Some("https://chat.example/api/".into()));
        assert_eq!(config.base_url, "https://chat.example/api/");
        let config = ChatConfig::with_base_url_override(Some("  ".into()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            url: Some("http://10.0.0.2:8094/api".to_string()),
            connect_timeout: Some(3),
            idle_timeout: Some(30),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.base_url, "http://10.0.0.2:8094/api");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_base_url("http://localhost:1/")
            .with_connect_timeout(Duration::from_millis(250))
            .with_idle_timeout(Some(Duration::from_secs(5)))
            .without_color();
        assert_eq!(config.base_url, "http://localhost:1/");
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(5)));
        assert!(!config.use_color);
    }

    #[test]
    fn stream_url_resolution() {
        let with_slash = ChatConfig::new().with_base_url("http://localhost:8094/api/");
        let without_slash = ChatConfig::new().with_base_url("http://localhost:8094/api");
        assert_eq!(
            with_slash.stream_url().unwrap().as_str(),
            "http://localhost:8094/api/chats/stream"
        );
        assert_eq!(
            with_slash.stream_url().unwrap(),
            without_slash.stream_url().unwrap()
        );
    }

    #[test]
    fn stream_url_rejects_non_http() {
        let err = ChatConfig::new()
            .with_base_url("ftp://files.example/")
            .stream_url()
            .unwrap_err();
        assert!(err.is_validation());
        assert!(ChatConfig::new().with_base_url("::").stream_url().is_err());
    }
}
