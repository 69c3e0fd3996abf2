//! Slash command parser for the chat plugin commands.
//!
//! Recognizes `/channel`, `/nick`, `/enablespy`, `/disablespy`, `/globalmute`,
//! `/teamchat` and `/townchat`. Command names are case-insensitive; arguments
//! keep their case. Anything else parses to [`ChatCommand::Unknown`] so the
//! host can hand it to other plugins.

use log::trace;

/// Needed to change another player's nickname.
pub const PERM_NICK_OTHER: &str = "sinkchat.nick.other";
/// Needed to write to, and to read, team chat.
pub const PERM_TEAMCHAT: &str = "sinkcommands.teamchat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    Join(String),
    Leave(String),
    List,
    /// Channels the caller currently receives.
    Part,
    Help,
    /// `join`/`leave` without a channel name.
    MissingName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Channel(ChannelAction),
    Nick {
        target: Option<String>,
        nickname: String,
    },
    EnableSpy,
    DisableSpy,
    GlobalMute,
    TeamChat(String),
    TownChat(String),
    /// Known command, bad arguments. Carries the usage line.
    Invalid(String),
    Unknown,
}

pub struct ChatCommandParser {
    prefix: char,
}

impl ChatCommandParser {
    pub fn new() -> Self {
        Self { prefix: '/' }
    }

    pub fn with_prefix(prefix: char) -> Self {
        Self { prefix }
    }

    pub fn parse(&self, raw: &str) -> ChatCommand {
        let trimmed = raw.trim();
        let Some(body) = trimmed.strip_prefix(self.prefix) else {
            return ChatCommand::Unknown;
        };
        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };
        trace!("parsing command '{}' args='{}'", name, rest);
        match name.to_ascii_lowercase().as_str() {
            "channel" | "ch" => ChatCommand::Channel(Self::parse_channel(rest)),
            "nick" | "nickname" => Self::parse_nick(rest),
            "enablespy" => ChatCommand::EnableSpy,
            "disablespy" => ChatCommand::DisableSpy,
            "globalmute" | "gm" => ChatCommand::GlobalMute,
            "teamchat" | "tc" => {
                if rest.is_empty() {
                    ChatCommand::Invalid("/teamchat <message>".into())
                } else {
                    ChatCommand::TeamChat(rest.to_string())
                }
            }
            "townchat" | "ttc" => {
                if rest.is_empty() {
                    ChatCommand::Invalid("/townchat <message>".into())
                } else {
                    ChatCommand::TownChat(rest.to_string())
                }
            }
            _ => ChatCommand::Unknown,
        }
    }

    fn parse_channel(args: &str) -> ChannelAction {
        let mut parts = args.split_whitespace();
        let action = parts.next().map(|a| a.to_ascii_lowercase());
        let target = parts.next().map(str::to_string);
        match (action.as_deref(), target) {
            (Some("join"), Some(name)) => ChannelAction::Join(name),
            (Some("leave"), Some(name)) => ChannelAction::Leave(name),
            (Some("join") | Some("leave"), None) => ChannelAction::MissingName,
            (Some("list"), _) => ChannelAction::List,
            (Some("part"), _) => ChannelAction::Part,
            _ => ChannelAction::Help,
        }
    }

    fn parse_nick(args: &str) -> ChatCommand {
        let parts: Vec<&str> = args.split_whitespace().collect();
        match parts.as_slice() {
            [nickname] => ChatCommand::Nick {
                target: None,
                nickname: nickname.to_string(),
            },
            [target, nickname] => ChatCommand::Nick {
                target: Some(target.to_string()),
                nickname: nickname.to_string(),
            },
            _ => ChatCommand::Invalid("/nick [player] <nickname|off>".into()),
        }
    }
}

impl Default for ChatCommandParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_subcommands() {
        let parser = ChatCommandParser::new();
        assert_eq!(
            parser.parse("/channel join Shout"),
            ChatCommand::Channel(ChannelAction::Join("Shout".into()))
        );
        assert_eq!(
            parser.parse("/CH LEAVE trade"),
            ChatCommand::Channel(ChannelAction::Leave("trade".into()))
        );
        assert_eq!(parser.parse("/channel join"), ChatCommand::Channel(ChannelAction::MissingName));
        assert_eq!(parser.parse("/channel"), ChatCommand::Channel(ChannelAction::Help));
        assert_eq!(parser.parse("/channel list"), ChatCommand::Channel(ChannelAction::List));
    }

    #[test]
    fn nick_forms() {
        let parser = ChatCommandParser::new();
        assert_eq!(
            parser.parse("/nick &aBob"),
            ChatCommand::Nick { target: None, nickname: "&aBob".into() }
        );
        assert_eq!(
            parser.parse("/nick alice Ally"),
            ChatCommand::Nick { target: Some("alice".into()), nickname: "Ally".into() }
        );
        assert!(matches!(parser.parse("/nick"), ChatCommand::Invalid(_)));
    }

    #[test]
    fn requires_prefix_and_known_name() {
        let parser = ChatCommandParser::new();
        assert_eq!(parser.parse("channel join shout"), ChatCommand::Unknown);
        assert_eq!(parser.parse("/home"), ChatCommand::Unknown);
        assert!(matches!(parser.parse("/teamchat"), ChatCommand::Invalid(_)));
        assert_eq!(parser.parse("/tc hi all"), ChatCommand::TeamChat("hi all".into()));
    }
}
