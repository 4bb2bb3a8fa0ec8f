//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session without sending messages to the
//! assistant.

/// A parsed chat command.
///
/// These commands control the chat session and are never sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Mount a fresh conversation (and thus a fresh session).
    New,

    /// Toggle the voice-capture state.
    Record,

    /// Save a diary entry.
    Diary(String),

    /// Drop the stored token pair.
    Logout,

    /// Display conversation statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// An unrecognized or malformed command, with an error message.
    Invalid(String),
}

/// Parses a line as a slash command.
///
/// Returns `None` if the line is not a command (doesn't start with `/`),
/// in which case it should be sent as a regular message.
pub fn parse_command(line: &str) -> Option<ChatCommand> {
    let line = line.trim();
    if !line.starts_with('/') {
        return None;
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("");
    let rest = parts.next().map(str::trim).unwrap_or("");

    let parsed = match command {
        "/new" => ChatCommand::New,
        "/record" => ChatCommand::Record,
        "/diary" => {
            if rest.is_empty() {
                ChatCommand::Invalid("Usage: /diary <entry text>".to_string())
            } else {
                ChatCommand::Diary(rest.to_string())
            }
        }
        "/logout" => ChatCommand::Logout,
        "/stats" => ChatCommand::Stats,
        "/help" => ChatCommand::Help,
        "/quit" | "/exit" => ChatCommand::Quit,
        other => ChatCommand::Invalid(format!(
            "Unknown command: {other}. Type /help for available commands."
        )),
    };
    Some(parsed)
}

/// Returns the help text describing available commands.
pub fn help_text() -> String {
    [
        "Available commands:",
        "  /new            Start a new conversation with a fresh session",
        "  /record         Toggle voice capture (not yet implemented)",
        "  /diary <text>   Save a diary entry dated now",
        "  /stats          Show conversation statistics",
        "  /logout         Forget the stored login tokens",
        "  /help           Show this help",
        "  /quit           Exit",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_messages_are_not_commands() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command("what is /new?"), None);
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/record"), Some(ChatCommand::Record));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/logout"), Some(ChatCommand::Logout));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
    }

    #[test]
    fn diary_takes_the_rest_of_the_line() {
        assert_eq!(
            parse_command("/diary lunch with Sam at 1pm"),
            Some(ChatCommand::Diary("lunch with Sam at 1pm".to_string()))
        );
    }

    #[test]
    fn diary_without_text_is_invalid() {
        assert!(matches!(
            parse_command("/diary"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/diary   "),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn unknown_commands_are_invalid() {
        assert!(matches!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn commands_tolerate_surrounding_whitespace() {
        assert_eq!(parse_command("  /new  "), Some(ChatCommand::New));
    }
}
