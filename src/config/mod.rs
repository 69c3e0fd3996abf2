//! # Configuration Management Module
//!
//! Typed, serde-backed settings for the chat plugin, stored as TOML.
//!
//! ## Configuration Structure
//!
//! - [`ChatConfig`] - local chat range and format, nickname limits, integrations
//! - [`ChannelConfig`] - one entry per dispatch channel
//! - [`LanguageConfig`] - location of the language file
//! - [`StorageConfig`] - where player configuration is persisted
//! - [`LoggingConfig`] - logging level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sinkchat::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Local chat range: {}", config.chat.local_chat_range);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [chat]
//! local_chat_range = 50
//! local_format = "$PLAYER$&7:&r $MESSAGE$"
//!
//! [[channels]]
//! name = "Shout"
//! kind = "shout"
//! call_char = "!"
//! prefix = "&7[Shout]&r"
//! permission = "sinkchat.channel.shout"
//! ```
//!
//! Dispatch characters used to live in the language file; they are settings
//! now and are validated here.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::chat::channel::{Channel, ChannelKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub language: LanguageConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Half-width of the local chat box on every axis, in blocks.
    #[serde(default = "default_range")]
    pub local_chat_range: u32,
    /// Local chat template; `$PLAYER$` and `$MESSAGE$` are substituted.
    #[serde(default = "default_local_format")]
    pub local_format: String,
    /// Prefix local chat with `[Local]`. Servers without a permissions
    /// plugin usually want this on.
    #[serde(default)]
    pub show_local_prefix: bool,
    /// Show the nation tag of the sender's town in local chat.
    #[serde(default)]
    pub towny_enabled: bool,
    #[serde(default = "default_max_nickname_length")]
    pub max_nickname_length: usize,
    /// Maximum accepted chat line in bytes; longer lines are refused.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

fn default_range() -> u32 {
    50
}

fn default_local_format() -> String {
    "$PLAYER$&7:&r $MESSAGE$".to_string()
}

fn default_max_nickname_length() -> usize {
    16
}

fn default_max_message_bytes() -> usize {
    256
}

fn default_command_prefix() -> String {
    "/".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            local_chat_range: default_range(),
            local_format: default_local_format(),
            show_local_prefix: false,
            towny_enabled: false,
            max_nickname_length: default_max_nickname_length(),
            max_message_bytes: default_max_message_bytes(),
            command_prefix: default_command_prefix(),
        }
    }
}

impl ChatConfig {
    /// First character of `command_prefix`, `/` when unset.
    pub fn command_char(&self) -> char {
        self.command_prefix.chars().next().unwrap_or('/')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub kind: ChannelKind,
    /// Exactly one character.
    pub call_char: String,
    /// Display prefix; `&` color codes allowed.
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl ChannelConfig {
    pub fn call_char(&self) -> Option<char> {
        let mut chars = self.call_char.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() => Some(c),
            _ => None,
        }
    }

    /// Build the channel, or `None` when the dispatch character is unusable.
    pub fn to_channel(&self) -> Option<Channel> {
        let call_char = self.call_char()?;
        let channel = Channel::new(self.name.clone(), self.kind, call_char, &self.prefix);
        Some(match &self.permission {
            Some(node) => channel.with_permission(node.clone()),
            None => channel,
        })
    }
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig {
            name: "Shout".to_string(),
            kind: ChannelKind::Shout,
            call_char: "!".to_string(),
            prefix: "&7[Shout]&r".to_string(),
            permission: Some("sinkchat.channel.shout".to_string()),
            enabled: true,
        },
        ChannelConfig {
            name: "Trade".to_string(),
            kind: ChannelKind::Trade,
            call_char: "$".to_string(),
            prefix: "&7[&6Trade&7]&r".to_string(),
            permission: Some("sinkchat.channel.trade".to_string()),
            enabled: true,
        },
        ChannelConfig {
            name: "Help".to_string(),
            kind: ChannelKind::Help,
            call_char: "?".to_string(),
            prefix: "&7[&aHelp&7]&r".to_string(),
            permission: Some("sinkchat.channel.help".to_string()),
            enabled: true,
        },
        ChannelConfig {
            name: "Town".to_string(),
            kind: ChannelKind::Town,
            call_char: "#".to_string(),
            prefix: "&7[&6Town&7]&r".to_string(),
            permission: Some("sinkchat.channel.town".to_string()),
            enabled: false,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub file: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            file: "data/Language.toml".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    /// Copy of every chat line (log target `chat`) for moderation review.
    #[serde(default)]
    pub chat_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("sinkchat.log".to_string()),
            chat_file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Enabled channels in file order.
    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter().filter(|c| c.enabled)
    }

    /// Human-readable problems. Empty means the configuration is sound.
    ///
    /// Duplicate dispatch characters are reported here and rejected again at
    /// registration, where the first channel keeps the character.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.chat.local_chat_range == 0 {
            problems.push("chat.local_chat_range must be greater than 0".to_string());
        }
        if self.chat.max_nickname_length == 0 {
            problems.push("chat.max_nickname_length must be greater than 0".to_string());
        }
        if self.chat.command_prefix.chars().count() != 1 {
            problems.push(format!(
                "chat.command_prefix must be exactly one character, got '{}'",
                self.chat.command_prefix
            ));
        }

        let mut names = HashSet::new();
        let mut chars = HashSet::new();
        for channel in self.enabled_channels() {
            if !names.insert(channel.name.to_lowercase()) {
                problems.push(format!("duplicate channel name '{}'", channel.name));
            }
            match channel.call_char() {
                None => problems.push(format!(
                    "channel '{}': call_char must be exactly one non-space character, got '{}'",
                    channel.name, channel.call_char
                )),
                Some(c) if c == self.chat.command_char() => problems.push(format!(
                    "channel '{}': call_char '{}' collides with the command prefix",
                    channel.name, c
                )),
                Some(c) => {
                    if !chars.insert(c) {
                        problems.push(format!(
                            "channel '{}': call_char '{}' is already used by another channel",
                            channel.name, c
                        ));
                    }
                }
            }
        }
        problems
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chat: ChatConfig::default(),
            channels: default_channels(),
            language: LanguageConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.enabled_channels().count(), 3);
    }

    #[test]
    fn test_default_config_serde_round_trip() {
        let serialized = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(serialized.contains("local_chat_range = 50"));
        let parsed = Config::from_toml_str(&serialized).unwrap();
        assert_eq!(parsed.channels, default_channels());
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config = Config::from_toml_str("[chat]\nlocal_chat_range = 10\n").unwrap();
        assert_eq!(config.chat.local_chat_range, 10);
        assert_eq!(config.chat.max_nickname_length, 16);
        assert_eq!(config.channels.len(), 4);
    }

    #[test]
    fn test_validate_reports_bad_call_chars() {
        let mut config = Config::default();
        config.channels[1].call_char = "!".to_string();
        config.channels[2].call_char = "??".to_string();
        let problems = config.validate();
        assert_eq!(problems.len(), 2, "{:?}", problems);
        assert!(problems[0].contains("already used"));
        assert!(problems[1].contains("exactly one"));
    }

    #[test]
    fn test_call_char_parsing() {
        let mut channel = default_channels().remove(0);
        assert_eq!(channel.call_char(), Some('!'));
        channel.call_char = " ".to_string();
        assert_eq!(channel.call_char(), None);
        assert!(channel.to_channel().is_none());
    }
}
