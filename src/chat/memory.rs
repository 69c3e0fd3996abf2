//! In-memory host used by integration tests and the `replay` command.
//!
//! Players record every line they receive in an inbox instead of writing to a
//! network session.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::errors::ChatError;
use super::host::{ChatRelay, Location, Player, PlayerDirectory, PlayerId, Town, TownProvider};

pub struct MemoryPlayer {
    id: PlayerId,
    name: String,
    display_name: RwLock<String>,
    online: AtomicBool,
    location: RwLock<Location>,
    permissions: RwLock<HashSet<String>>,
    group: Option<String>,
    inbox: Mutex<Vec<String>>,
    reject_messages: AtomicBool,
}

impl MemoryPlayer {
    pub fn new(name: &str) -> Self {
        Self {
            id: PlayerId::new(),
            name: name.to_string(),
            display_name: RwLock::new(name.to_string()),
            online: AtomicBool::new(true),
            location: RwLock::new(Location::default()),
            permissions: RwLock::new(HashSet::new()),
            group: None,
            inbox: Mutex::new(Vec::new()),
            reject_messages: AtomicBool::new(false),
        }
    }

    pub fn at(self, x: f64, y: f64, z: f64) -> Self {
        self.set_location(Location::new(x, y, z));
        self
    }

    pub fn with_permissions(self, nodes: &[&str]) -> Self {
        for node in nodes {
            self.grant(node);
        }
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn set_location(&self, location: Location) {
        *self.location.write().unwrap_or_else(|e| e.into_inner()) = location;
    }

    pub fn grant(&self, node: &str) {
        self.permissions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(node.to_string());
    }

    pub fn revoke(&self, node: &str) {
        self.permissions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(node);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    /// Make every following `send_message` fail, as a dropped connection would.
    pub fn reject_messages(&self, reject: bool) {
        self.reject_messages.store(reject, Ordering::Release);
    }

    pub fn inbox(&self) -> Vec<String> {
        self.inbox.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn take_inbox(&self) -> Vec<String> {
        std::mem::take(&mut *self.inbox.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Player for MemoryPlayer {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn display_name(&self) -> String {
        self.display_name.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_display_name(&self, name: &str) {
        *self.display_name.write().unwrap_or_else(|e| e.into_inner()) = name.to_string();
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    fn has_permission(&self, node: &str) -> bool {
        self.permissions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(node)
    }

    fn location(&self) -> Location {
        *self.location.read().unwrap_or_else(|e| e.into_inner())
    }

    fn group(&self) -> Option<String> {
        self.group.clone()
    }

    fn send_message(&self, text: &str) -> Result<(), ChatError> {
        if self.reject_messages.load(Ordering::Acquire) || !self.is_online() {
            return Err(ChatError::delivery(&self.name, "connection closed"));
        }
        self.inbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    players: RwLock<Vec<Arc<MemoryPlayer>>>,
    console: Mutex<Vec<String>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, player: MemoryPlayer) -> Arc<MemoryPlayer> {
        let player = Arc::new(player);
        self.players
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(player.clone());
        player
    }

    pub fn remove(&self, id: PlayerId) {
        self.players
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|p| p.id != id);
    }

    pub fn all(&self) -> Vec<Arc<MemoryPlayer>> {
        self.players.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.console.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn take_console(&self) -> Vec<String> {
        std::mem::take(&mut *self.console.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl PlayerDirectory for MemoryDirectory {
    fn online_players(&self) -> Vec<Arc<dyn Player>> {
        self.players
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|p| p.is_online())
            .map(|p| p.clone() as Arc<dyn Player>)
            .collect()
    }

    fn player(&self, id: PlayerId) -> Option<Arc<dyn Player>> {
        self.players
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.clone() as Arc<dyn Player>)
    }

    fn player_by_name(&self, name: &str) -> Option<Arc<dyn Player>> {
        self.players
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.clone() as Arc<dyn Player>)
    }

    fn send_console(&self, text: &str) {
        self.console
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
    }
}

/// Fixed set of towns.
#[derive(Debug, Default, Clone)]
pub struct MemoryTowns {
    towns: Vec<Town>,
}

impl MemoryTowns {
    pub fn new(towns: Vec<Town>) -> Self {
        Self { towns }
    }
}

impl TownProvider for MemoryTowns {
    fn town_of(&self, player_name: &str) -> Option<Town> {
        self.towns
            .iter()
            .find(|t| t.residents.iter().any(|r| r.eq_ignore_ascii_case(player_name)))
            .cloned()
    }
}

/// Relay that keeps `(source, text)` pairs.
#[derive(Debug, Default)]
pub struct RecordingRelay {
    lines: Mutex<Vec<(String, String)>>,
}

impl RecordingRelay {
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ChatRelay for RecordingRelay {
    fn relay(&self, source: &str, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((source.to_string(), text.to_string()));
    }
}
