//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the session locally and is never submitted
//! as a question.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Print the transcript so far.
    History,

    /// Set the document context sent with later questions.
    Context(String),

    /// Stop sending document context.
    ClearContext,

    /// Send the document text extracted by the latest reply as context.
    AdoptContext,

    /// Show the current document context.
    ShowContext,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be submitted as a question.
///
/// # Examples
///
/// ```
/// # use ecobot::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/context field notes").is_some());
/// assert!(parse_command("What is a keystone species?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let command_line = input.trim().strip_prefix('/')?;

    let mut parts = command_line.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "history" | "transcript" => ChatCommand::History,
        "context" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearContext,
            Some(arg) if arg.eq_ignore_ascii_case("reply") => ChatCommand::AdoptContext,
            Some(arg) => ChatCommand::Context(arg.to_string()),
            None => ChatCommand::ShowContext,
        },
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /history               Show the conversation so far
  /context <text>        Send <text> as document context with later questions
  /context clear         Stop sending document context
  /context reply         Use the document text extracted by the latest reply
  /context               Show the current document context
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}
