//! # Language File
//!
//! Every user-facing line is looked up by a dotted key such as
//! `SinkChat.Prefix.Spy`. The language file is TOML with nested tables, so the
//! key `SinkChat.Prefix.Spy` lives at:
//!
//! ```toml
//! [SinkChat.Prefix]
//! Spy = "&7[Spy]"
//! ```
//!
//! Lookup order: file value, then the built-in default, then the literal key.
//! A broken or outdated file is backed up and regenerated from the defaults.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{error, info, warn};
use tokio::fs;
use toml::{Table, Value};

use crate::chat::format::translate_color_codes;
use crate::chat::Localizer;

/// Bump when keys are renamed so old files get regenerated.
pub const CURRENT_VERSION: i64 = 1;
const VERSION_KEY: &str = "Main.ConfigVersion";

const DEFAULTS: &[(&str, &str)] = &[
    ("General.NotOnline", "&c$PLAYER$ is not online!"),
    ("General.ConsoleNotAvailable", "&cThis command is only available in-game."),
    ("General.Usage", "&cUsage: $USAGE$"),
    ("SinkChat.Commands.Nick.OtherChanged", "$PLAYER$'s name is now $NICK$!"),
    ("SinkChat.Commands.Nick.SelfChanged", "Your name is now $NICK$!"),
    ("SinkChat.Commands.Nick.IllegalNickname", "&cIllegal nickname!"),
    ("SinkChat.Commands.Nick.TooLong", "&cNickname is too long!"),
    ("SinkChat.Commands.Nick.Used", "&cNickname is already used by someone else!"),
    ("SinkChat.Commands.Channel.PlayerLeaves", "You left the $CHANNEL$ channel."),
    ("SinkChat.Commands.Channel.NoChannelGiven", "&cYou must write the name of the channel!"),
    ("SinkChat.Commands.Channel.ChannelUnknown", "&c$CHANNEL$ is an unknown channel."),
    ("SinkChat.Commands.Channel.List", "These channels are available: $CHANNELS$"),
    ("SinkChat.Commands.Channel.Part", "You have the following channels enabled: $CHANNELS$"),
    (
        "SinkChat.Commands.Channel.Help",
        "These commands are available: /channel join <channel>, /channel leave <channel>, /channel list, /channel part",
    ),
    ("SinkChat.Commands.Spy.Enabled", "&aSpy chat has been enabled!"),
    ("SinkChat.Commands.Spy.AlreadyEnabled", "&cSpy chat has already been enabled!"),
    ("SinkChat.Commands.Spy.Disabled", "&cSpy chat has been disabled!"),
    ("SinkChat.Commands.Spy.AlreadyDisabled", "&cSpy chat has already been disabled!"),
    ("SinkChat.MessageTooLong", "&cYour message is too long!"),
    ("SinkChat.Channel.PlayerJoined", "&7$PLAYER$ joined the $CHANNEL$ channel."),
    ("SinkChat.Channel.PlayerLeft", "&7$PLAYER$ left the $CHANNEL$ channel."),
    ("SinkChat.Towny.NotInTown", "&cYou are not a resident of any town."),
    ("SinkChat.Towny.Unavailable", "&cTown chat is not available on this server."),
    ("SinkChat.Prefix.Channel", "&a[Channel]"),
    ("SinkChat.Prefix.Nick", "&2[Nick]"),
    ("SinkChat.Prefix.Spy", "&7[Spy]"),
    ("SinkChat.Prefix.Local", "&7[Local]"),
    ("Permissions.General", "&4You don't have permission to do that."),
    ("Permissions.SinkChat.Channels.Shout", "&4You may not use the shout channel."),
    ("Permissions.SinkChat.Channels.Help", "&4You may not use the help channel."),
    ("Permissions.SinkChat.Channels.Trade", "&4You may not use the trade channel."),
    ("Permissions.SinkChat.Channels.Town", "&4You may not use the town channel."),
    ("Permissions.SinkChat.Nick.Other", "&4You may not change the nickname of other players!"),
    ("SinkCommands.GlobalMute.Prefix", "&4[GlobalMute]&r"),
    ("SinkCommands.GlobalMute.Blocked", "You can't chat while the global mute is active."),
    ("SinkCommands.GlobalMute.Enabled", "Global mute has been enabled by $PLAYER$."),
    ("SinkCommands.GlobalMute.Disabled", "Global mute has been disabled by $PLAYER$."),
    ("SinkCommands.TeamChat.Prefix", "&6[TeamChat]&r"),
];

pub struct Language {
    values: Table,
    defaults: BTreeMap<&'static str, &'static str>,
}

impl Language {
    /// Built-in defaults only, no file behind it.
    pub fn defaults() -> Self {
        Self {
            values: Table::new(),
            defaults: DEFAULTS.iter().copied().collect(),
        }
    }

    /// Parse language TOML without touching the filesystem.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let values: Table = toml::from_str(content).map_err(|e| anyhow!("invalid language file: {}", e))?;
        Ok(Self {
            values,
            defaults: DEFAULTS.iter().copied().collect(),
        })
    }

    /// Load the language file, creating or regenerating it when needed.
    pub async fn load_or_create(path: &str) -> Result<Self> {
        if fs::metadata(path).await.is_err() {
            info!("Creating new language file: {}", path);
            return Self::write_defaults(path).await;
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read language file {}: {}", path, e))?;
        let language = match Self::from_toml_str(&content) {
            Ok(language) => language,
            Err(e) => {
                error!("Invalid language file detected: {} ({})", path, e);
                return Self::recreate(path).await;
            }
        };

        let version = language.version();
        if version < CURRENT_VERSION {
            warn!(
                "Language file {} is too old! Current version: {}, required version: {}",
                path, version, CURRENT_VERSION
            );
            return Self::recreate(path).await;
        }

        let missing = language.missing_keys();
        if !missing.is_empty() {
            warn!("{}: {} keys missing, built-in defaults will be used", path, missing.len());
        }
        Ok(language)
    }

    async fn recreate(path: &str) -> Result<Self> {
        warn!("Recreating language file: {}", path);
        let backup = format!("{}.{}.bak", path, Utc::now().format("%Y%m%d%H%M%S"));
        fs::rename(path, &backup)
            .await
            .map_err(|e| anyhow!("Failed to back up {} to {}: {}", path, backup, e))?;
        info!("Backed up old language file to {}", backup);
        Self::write_defaults(path).await
    }

    async fn write_defaults(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = Self::render_defaults()?;
        fs::write(path, &content)
            .await
            .map_err(|e| anyhow!("Failed to write language file {}: {}", path, e))?;
        Self::from_toml_str(&content)
    }

    /// Default language file contents as nested TOML.
    pub fn render_defaults() -> Result<String> {
        let mut root = Table::new();
        insert_path(&mut root, VERSION_KEY, Value::Integer(CURRENT_VERSION));
        for (key, value) in DEFAULTS {
            insert_path(&mut root, key, Value::String(value.to_string()));
        }
        toml::to_string_pretty(&root).map_err(|e| anyhow!("Failed to serialize language defaults: {}", e))
    }

    pub fn version(&self) -> i64 {
        lookup_path(&self.values, VERSION_KEY)
            .and_then(Value::as_integer)
            .unwrap_or(0)
    }

    /// Raw (untranslated) value from the file.
    pub fn file_value(&self, key: &str) -> Option<&str> {
        lookup_path(&self.values, key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn default_value(&self, key: &str) -> Option<&'static str> {
        self.defaults.get(key).copied()
    }

    /// Default keys that the file does not provide.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        self.defaults
            .keys()
            .copied()
            .filter(|k| self.file_value(k).is_none())
            .collect()
    }
}

impl Localizer for Language {
    fn text(&self, key: &str) -> String {
        let raw = match self.file_value(key) {
            Some(value) => value.to_string(),
            None => match self.default_value(key) {
                Some(default) => default.to_string(),
                None => {
                    warn!("no language value or default for key {}", key);
                    key.to_string()
                }
            },
        };
        translate_color_codes('&', &raw)
    }
}

fn lookup_path<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = parts.next()?;
    let mut current = table.get(first)?;
    for part in parts {
        current = current.as_table()?.get(part)?;
    }
    Some(current)
}

fn insert_path(table: &mut Table, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            table.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let child = table
                .entry(head.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if let Value::Table(inner) = child {
                insert_path(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_value_wins_then_default_then_key() {
        let lang = Language::from_toml_str(
            "[Main]\nConfigVersion = 1\n[SinkChat.Prefix]\nSpy = \"&c[S]\"\n",
        )
        .unwrap();
        assert_eq!(lang.text("SinkChat.Prefix.Spy"), "§c[S]");
        assert_eq!(lang.text("SinkChat.Prefix.Local"), "§7[Local]");
        assert_eq!(lang.text("No.Such.Key"), "No.Such.Key");
    }

    #[test]
    fn rendered_defaults_round_trip_every_key() {
        let rendered = Language::render_defaults().unwrap();
        let lang = Language::from_toml_str(&rendered).unwrap();
        assert_eq!(lang.version(), CURRENT_VERSION);
        assert!(lang.missing_keys().is_empty());
    }

    #[test]
    fn tokens_are_substituted() {
        let lang = Language::defaults();
        let text = lang.format(
            "SinkChat.Channel.PlayerJoined",
            &[("PLAYER", "Alice"), ("CHANNEL", "Shout")],
        );
        assert_eq!(text, "§7Alice joined the Shout channel.");
    }
}
