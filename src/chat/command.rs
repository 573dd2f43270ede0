//! Chat command parser.
//!
//! Input starting with `/` is decoded once into a [`ChatCommand`] through the
//! [`COMMANDS`] table. Adding a command means adding a table row, a variant
//! and its handler in the manager.

/// Prefix that marks a command.
pub const COMMAND_PREFIX: char = '/';

/// Result of parsing a chat input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Regular chat message.
    Message(String),
    /// Parsed command.
    Command(ChatCommand),
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Show help message.
    Help,
    /// List all rooms with occupancy.
    Rooms,
    /// List users in the current room.
    Users,
    /// Move to another room (by ID or name).
    Join(String),
    /// Change display name.
    Nick(String),
    /// Show statistics of the current room.
    Stats,
    /// Unknown command.
    Unknown(String),
}

impl ChatCommand {
    /// Get the command name.
    pub fn name(&self) -> &str {
        match self {
            ChatCommand::Help => "help",
            ChatCommand::Rooms => "rooms",
            ChatCommand::Users => "users",
            ChatCommand::Join(_) => "join",
            ChatCommand::Nick(_) => "nick",
            ChatCommand::Stats => "stats",
            ChatCommand::Unknown(cmd) => cmd,
        }
    }
}

impl std::fmt::Display for ChatCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatCommand::Join(arg) | ChatCommand::Nick(arg) if !arg.is_empty() => {
                write!(f, "/{} {arg}", self.name())
            }
            _ => write!(f, "/{}", self.name()),
        }
    }
}

/// Chat command information, also used for help display.
pub struct CommandInfo {
    /// Command name.
    pub name: &'static str,
    /// Command aliases.
    pub aliases: &'static [&'static str],
    /// Command syntax.
    pub syntax: &'static str,
    /// Command description.
    pub description: &'static str,
    /// Builds the command from its argument string.
    decode: fn(&str) -> ChatCommand,
}

fn decode_help(_: &str) -> ChatCommand {
    ChatCommand::Help
}

fn decode_rooms(_: &str) -> ChatCommand {
    ChatCommand::Rooms
}

fn decode_users(_: &str) -> ChatCommand {
    ChatCommand::Users
}

fn decode_join(args: &str) -> ChatCommand {
    ChatCommand::Join(args.to_string())
}

fn decode_nick(args: &str) -> ChatCommand {
    ChatCommand::Nick(args.to_string())
}

fn decode_stats(_: &str) -> ChatCommand {
    ChatCommand::Stats
}

/// All available commands.
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "help",
        aliases: &["h", "?"],
        syntax: "/help",
        description: "Show this help",
        decode: decode_help,
    },
    CommandInfo {
        name: "rooms",
        aliases: &["list"],
        syntax: "/rooms",
        description: "List all rooms",
        decode: decode_rooms,
    },
    CommandInfo {
        name: "users",
        aliases: &["who", "w"],
        syntax: "/users",
        description: "List users in the current room",
        decode: decode_users,
    },
    CommandInfo {
        name: "join",
        aliases: &["j"],
        syntax: "/join <room>",
        description: "Join a room by ID or name",
        decode: decode_join,
    },
    CommandInfo {
        name: "nick",
        aliases: &["name"],
        syntax: "/nick <new_name>",
        description: "Change your username",
        decode: decode_nick,
    },
    CommandInfo {
        name: "stats",
        aliases: &[],
        syntax: "/stats",
        description: "Show statistics of the current room",
        decode: decode_stats,
    },
];

/// Find a command by name or alias (case-insensitive).
pub fn lookup(verb: &str) -> Option<&'static CommandInfo> {
    let verb = verb.to_lowercase();
    COMMANDS
        .iter()
        .find(|info| info.name == verb || info.aliases.contains(&verb.as_str()))
}

/// Parse a chat input line into a message or command.
pub fn parse_input(input: &str) -> ChatInput {
    let trimmed = input.trim();

    let Some(without_prefix) = trimmed.strip_prefix(COMMAND_PREFIX) else {
        return ChatInput::Message(trimmed.to_string());
    };

    let (verb, args) = match without_prefix.split_once(char::is_whitespace) {
        Some((verb, args)) => (verb, args.trim()),
        None => (without_prefix, ""),
    };

    let command = match lookup(verb) {
        Some(info) => (info.decode)(args),
        None => ChatCommand::Unknown(verb.to_string()),
    };

    ChatInput::Command(command)
}

/// Format the help message for display.
pub fn format_help() -> String {
    let mut lines = vec!["Available commands:".to_string()];
    for info in COMMANDS {
        lines.push(format!("{} - {}", info.syntax, info.description));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_regular_message() {
        assert_eq!(
            parse_input("Hello, world!"),
            ChatInput::Message("Hello, world!".to_string())
        );
        assert_eq!(parse_input("  hi "), ChatInput::Message("hi".to_string()));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_input("/help"), ChatInput::Command(ChatCommand::Help));
        assert_eq!(parse_input("/rooms"), ChatInput::Command(ChatCommand::Rooms));
        assert_eq!(parse_input("/users"), ChatInput::Command(ChatCommand::Users));
        assert_eq!(parse_input("/stats"), ChatInput::Command(ChatCommand::Stats));
    }

    #[test]
    fn test_parse_case_insensitive_verb() {
        assert_eq!(parse_input("/HELP"), ChatInput::Command(ChatCommand::Help));
        assert_eq!(
            parse_input("/Join Python"),
            ChatInput::Command(ChatCommand::Join("Python".to_string()))
        );
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(parse_input("/?"), ChatInput::Command(ChatCommand::Help));
        assert_eq!(parse_input("/who"), ChatInput::Command(ChatCommand::Users));
        assert_eq!(
            parse_input("/j general"),
            ChatInput::Command(ChatCommand::Join("general".to_string()))
        );
    }

    #[test]
    fn test_parse_args_keep_inner_spaces() {
        assert_eq!(
            parse_input("/nick  Big Bob  "),
            ChatInput::Command(ChatCommand::Nick("Big Bob".to_string()))
        );
    }

    #[test]
    fn test_parse_missing_args() {
        assert_eq!(
            parse_input("/join"),
            ChatInput::Command(ChatCommand::Join(String::new()))
        );
        assert_eq!(
            parse_input("/nick "),
            ChatInput::Command(ChatCommand::Nick(String::new()))
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse_input("/dance wildly"),
            ChatInput::Command(ChatCommand::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_slash_only() {
        assert_eq!(
            parse_input("/"),
            ChatInput::Command(ChatCommand::Unknown(String::new()))
        );
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("NICK").map(|i| i.name), Some("nick"));
        assert!(lookup("quit").is_none());
    }

    #[test]
    fn test_command_display() {
        assert_eq!(ChatCommand::Help.to_string(), "/help");
        assert_eq!(ChatCommand::Join("python".to_string()).to_string(), "/join python");
        assert_eq!(ChatCommand::Nick(String::new()).to_string(), "/nick");
        assert_eq!(ChatCommand::Unknown("foo".to_string()).to_string(), "/foo");
    }

    #[test]
    fn test_format_help_lists_every_command() {
        let help = format_help();
        for info in COMMANDS {
            assert!(help.contains(info.syntax));
        }
    }
}
