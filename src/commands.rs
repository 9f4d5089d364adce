//! Slash commands of the terminal surface.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    /// `/strategy <text>`; `None` prints the current strategy.
    Strategy(Option<String>),
    History,
    Clear,
    Quit,
    Unknown(String),
}

/// Returns `None` for plain chat input.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/strategy" if rest.is_empty() => SlashCommand::Strategy(None),
        "/strategy" => SlashCommand::Strategy(Some(rest.to_string())),
        "/history" => SlashCommand::History,
        "/clear" => SlashCommand::Clear,
        "/quit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

pub const HELP_TEXT: &str = "Commands:
  /strategy <text>  set the strategy context sent with every message
  /strategy         show the current strategy
  /history          print the conversation
  /clear            clear the conversation
  /quit             exit";
