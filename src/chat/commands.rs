//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the REPL and is never sent to the chat service.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Print the conversation so far.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it should be sent as
/// a regular message.
///
/// # Examples
///
/// ```
/// # use chatstream::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match (command.as_str(), argument) {
        ("clear", None) => ChatCommand::Clear,
        ("history", None) => ChatCommand::History,
        ("help" | "?", None) => ChatCommand::Help,
        ("quit" | "exit" | "q", None) => ChatCommand::Quit,
        ("stats" | "status", None) => ChatCommand::Stats,
        ("clear" | "history" | "help" | "?" | "quit" | "exit" | "q" | "stats" | "status", Some(_)) => {
            ChatCommand::Invalid(format!("/{command} takes no arguments"))
        }
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /history               Print the conversation so far
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat
Press Ctrl-C while a reply is streaming to stop it."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear_and_history() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
    }

    #[test]
    fn parse_stats_and_help() {
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn arguments_rejected() {
        assert_eq!(
            parse_command("/clear everything"),
            Some(ChatCommand::Invalid("/clear takes no arguments".to_string()))
        );
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model gpt"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("what about a/b?"), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/clear"));
        assert!(help.contains("/history"));
    }
}
