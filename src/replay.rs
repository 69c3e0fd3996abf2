//! Scripted chat sessions against the in-memory host.
//!
//! A replay script is TOML: the players on the server, optional towns, and a
//! list of events applied in order. Used by `sinkchat replay` to try out a
//! channel configuration without a game server.
//!
//! ```toml
//! [[players]]
//! name = "alice"
//! x = 0.0
//! y = 64.0
//! z = 0.0
//! permissions = ["sinkchat.channel.shout", "sinkchat.spy"]
//!
//! [[events]]
//! player = "alice"
//! chat = "!hello"
//!
//! [[events]]
//! player = "alice"
//! command = "/channel leave shout"
//! ```

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use log::{debug, info};
use serde::Deserialize;

use crate::chat::memory::{MemoryDirectory, MemoryPlayer, MemoryTowns, RecordingRelay};
use crate::chat::{ChatServer, Localizer, Location, Player, PlayerDirectory, Town};
use crate::config::Config;
use crate::metrics::MetricsSnapshot;
use crate::storage::PlayerStore;

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub players: Vec<ScriptPlayer>,
    #[serde(default)]
    pub towns: Vec<ScriptTown>,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptPlayer {
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub group: Option<String>,
    /// Initial spy flag.
    #[serde(default)]
    pub spy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptTown {
    pub name: String,
    pub residents: Vec<String>,
    pub nation_tag: Option<String>,
}

/// One step. Exactly one of the action fields must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEvent {
    pub player: String,
    pub chat: Option<String>,
    pub command: Option<String>,
    pub join: Option<String>,
    pub leave: Option<String>,
    #[serde(rename = "move")]
    pub move_to: Option<[f64; 3]>,
    pub online: Option<bool>,
}

#[derive(Debug, Clone)]
enum Action {
    Chat(String),
    Command(String),
    Join(String),
    Leave(String),
    Move(Location),
    Online(bool),
}

impl ScriptEvent {
    fn action(&self) -> Result<Action> {
        let mut actions = Vec::new();
        if let Some(text) = &self.chat {
            actions.push(Action::Chat(text.clone()));
        }
        if let Some(line) = &self.command {
            actions.push(Action::Command(line.clone()));
        }
        if let Some(channel) = &self.join {
            actions.push(Action::Join(channel.clone()));
        }
        if let Some(channel) = &self.leave {
            actions.push(Action::Leave(channel.clone()));
        }
        if let Some([x, y, z]) = self.move_to {
            actions.push(Action::Move(Location::new(x, y, z)));
        }
        if let Some(online) = self.online {
            actions.push(Action::Online(online));
        }
        match actions.len() {
            1 => Ok(actions.remove(0)),
            0 => bail!("event for {} has no action", self.player),
            n => bail!("event for {} has {} actions, expected one", self.player, n),
        }
    }
}

impl ReplayScript {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("invalid replay script: {}", e))
    }
}

/// What every participant saw once the script finished.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    /// `(player name, lines received)` in script order.
    pub inboxes: Vec<(String, Vec<String>)>,
    pub console: Vec<String>,
    /// `(source, text)` pairs handed to the relay.
    pub relayed: Vec<(String, String)>,
    pub metrics: MetricsSnapshot,
}

/// Run `script` against a fresh in-memory server built from `config`.
pub async fn run(config: &Config, lang: Arc<dyn Localizer>, script: &ReplayScript) -> Result<ReplayReport> {
    let directory = Arc::new(MemoryDirectory::new());
    let store = Arc::new(PlayerStore::in_memory());
    let mut players = Vec::with_capacity(script.players.len());
    for p in &script.players {
        let nodes: Vec<&str> = p.permissions.iter().map(String::as_str).collect();
        let mut player = MemoryPlayer::new(&p.name).at(p.x, p.y, p.z).with_permissions(&nodes);
        if let Some(group) = &p.group {
            player = player.with_group(group);
        }
        let player = directory.add(player);
        if p.spy {
            store.set_spy_enabled(player.id(), &p.name, true);
        }
        players.push(player);
    }

    let relay = Arc::new(RecordingRelay::default());
    let mut server = ChatServer::new(config, directory.clone(), lang, store).with_relay(relay.clone());
    if !script.towns.is_empty() {
        let towns = script
            .towns
            .iter()
            .map(|t| Town {
                name: t.name.clone(),
                residents: t.residents.clone(),
                nation_tag: t.nation_tag.clone(),
            })
            .collect();
        server = server.with_towns(Arc::new(MemoryTowns::new(towns)));
    }

    for player in &players {
        server.on_player_join(player.id()).await?;
    }

    for (index, event) in script.events.iter().enumerate() {
        let player = players
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(&event.player))
            .ok_or_else(|| anyhow!("event {}: unknown player {}", index + 1, event.player))?;
        let action = event.action().map_err(|e| anyhow!("event {}: {}", index + 1, e))?;
        debug!("replay step {}: {} {:?}", index + 1, event.player, action);
        match action {
            Action::Chat(text) => {
                let mut cancelled = false;
                if !server.on_chat(player.id(), &text, &mut cancelled) {
                    directory.send_console(&format!("<{}> {}", player.name(), text));
                }
            }
            Action::Command(line) => {
                if !server.execute_command(player.id(), &line).await? {
                    directory.send_console(&format!("unknown command from {}: {}", player.name(), line));
                }
            }
            Action::Join(channel) => server.join_channel(&channel, player.id())?,
            Action::Leave(channel) => server.leave_channel(&channel, player.id())?,
            Action::Move(location) => player.set_location(location),
            Action::Online(online) => player.set_online(online),
        }
    }

    info!("replayed {} events for {} players", script.events.len(), players.len());
    Ok(ReplayReport {
        inboxes: players.iter().map(|p| (p.name(), p.inbox())).collect(),
        console: directory.console_lines(),
        relayed: relay.lines(),
        metrics: server.metrics().snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Language;

    #[test]
    fn event_needs_exactly_one_action() {
        let script = ReplayScript::from_toml_str(
            r#"
            [[events]]
            player = "a"

            [[events]]
            player = "a"
            chat = "hi"
            join = "Shout"
            "#,
        )
        .unwrap();
        assert!(script.events[0].action().is_err());
        assert!(script.events[1].action().is_err());
    }

    #[tokio::test]
    async fn shout_reaches_everyone_but_leavers() {
        let script = ReplayScript::from_toml_str(
            r#"
            [[players]]
            name = "alice"
            permissions = ["sinkchat.channel.shout"]

            [[players]]
            name = "bob"
            x = 500.0

            [[events]]
            player = "bob"
            leave = "Shout"

            [[events]]
            player = "alice"
            chat = "!hello"
            "#,
        )
        .unwrap();
        let report = run(&Config::default(), Arc::new(Language::defaults()), &script)
            .await
            .unwrap();
        // the leave notice, then the shout
        let alice = &report.inboxes[0].1;
        assert_eq!(alice.len(), 2, "{:?}", alice);
        assert!(alice[0].contains("bob left the Shout channel"));
        assert!(alice[1].ends_with("alice: hello"), "{:?}", alice);
        assert!(report.inboxes[1].1.iter().all(|l| !l.contains("hello")));
        assert_eq!(report.metrics.per_channel.get("Shout"), Some(&1));
        assert_eq!(report.relayed, vec![("Shout".to_string(), "alice: hello".to_string())]);
    }
}
