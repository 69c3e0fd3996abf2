//! Capability interfaces the routing core consumes from its host.
//!
//! The core never talks to a game server directly. Everything it needs (who is
//! online, where they stand, what they may do, how to reach them) is expressed
//! as the traits below. The game-server adapter implements them; tests and the
//! `replay` command use the in-memory host in [`crate::chat::memory`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::ChatError;

/// Stable player identity assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        PlayerId(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block position of a player. Only the three coordinates take part in range checks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A connected player session owned by the host.
pub trait Player: Send + Sync {
    fn id(&self) -> PlayerId;
    /// Login name. Never changes during a session.
    fn name(&self) -> String;
    fn display_name(&self) -> String;
    fn set_display_name(&self, name: &str);
    fn is_online(&self) -> bool;
    fn has_permission(&self, node: &str) -> bool;
    fn location(&self) -> Location;
    /// Primary permission group, if a permissions backend is present.
    fn group(&self) -> Option<String>;
    fn send_message(&self, text: &str) -> Result<(), ChatError>;
}

/// Lookup and enumeration of players, plus the server console.
pub trait PlayerDirectory: Send + Sync {
    fn online_players(&self) -> Vec<Arc<dyn Player>>;
    fn player(&self, id: PlayerId) -> Option<Arc<dyn Player>>;
    /// Case-insensitive lookup by login name.
    fn player_by_name(&self, name: &str) -> Option<Arc<dyn Player>>;
    fn send_console(&self, text: &str);
}

/// Resolves message keys to user-facing text.
pub trait Localizer: Send + Sync {
    /// Text for `key` with `&` color codes already translated.
    fn text(&self, key: &str) -> String;

    /// Text for `key` with every `$TOKEN$` placeholder replaced.
    fn format(&self, key: &str, tokens: &[(&str, &str)]) -> String {
        let mut out = self.text(key);
        for (token, value) in tokens {
            out = out.replace(&format!("${}$", token), value);
        }
        out
    }
}

/// A town as reported by the optional towns integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Town {
    pub name: String,
    /// Login names of every resident, online or not.
    pub residents: Vec<String>,
    pub nation_tag: Option<String>,
}

/// Optional integration with a towns plugin.
pub trait TownProvider: Send + Sync {
    /// Town of the named resident, `None` when the player has no town.
    fn town_of(&self, player_name: &str) -> Option<Town>;
}

/// Optional bridge that mirrors chat lines to an external network (IRC and the like).
pub trait ChatRelay: Send + Sync {
    /// `source` is the channel name or `"local"`; `text` has color codes stripped.
    fn relay(&self, source: &str, text: &str);
}
