//! Test utilities & fixtures.
//! Builds a chat server on the in-memory host with the default language.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;

use sinkchat::chat::memory::{MemoryDirectory, MemoryPlayer, MemoryTowns};
use sinkchat::chat::{ChatServer, Player, PlayerId};
use sinkchat::config::Config;
use sinkchat::lang::Language;
use sinkchat::storage::PlayerStore;

pub const SHOUT: &str = "sinkchat.channel.shout";
pub const TRADE: &str = "sinkchat.channel.trade";
pub const HELP: &str = "sinkchat.channel.help";
pub const TOWN: &str = "sinkchat.channel.town";

pub struct Fixture {
    pub directory: Arc<MemoryDirectory>,
    pub store: Arc<PlayerStore>,
    pub server: ChatServer,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, None)
    }

    pub fn with_towns(config: Config, towns: MemoryTowns) -> Self {
        Self::build(config, Some(towns))
    }

    fn build(config: Config, towns: Option<MemoryTowns>) -> Self {
        let directory = Arc::new(MemoryDirectory::new());
        let store = Arc::new(PlayerStore::in_memory());
        let mut server = ChatServer::new(
            &config,
            directory.clone(),
            Arc::new(Language::defaults()),
            store.clone(),
        );
        if let Some(towns) = towns {
            server = server.with_towns(Arc::new(towns));
        }
        Self {
            directory,
            store,
            server,
        }
    }

    /// Player at the origin with every channel permission.
    pub fn member(&self, name: &str) -> Arc<MemoryPlayer> {
        self.directory
            .add(MemoryPlayer::new(name).with_permissions(&[SHOUT, TRADE, HELP, TOWN]))
    }

    pub fn add(&self, player: MemoryPlayer) -> Arc<MemoryPlayer> {
        self.directory.add(player)
    }

    pub fn chat(&self, player: &MemoryPlayer, message: &str) -> bool {
        let mut cancelled = false;
        self.server.on_chat(player.id(), message, &mut cancelled)
    }

    pub fn clear_inboxes(&self) {
        for player in self.directory.all() {
            player.take_inbox();
        }
        self.directory.take_console();
    }
}

pub fn id(player: &MemoryPlayer) -> PlayerId {
    player.id()
}
