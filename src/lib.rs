//! # SinkChat - Chat Channel Routing for Game Servers
//!
//! SinkChat sits between a game server's chat event and its players. Every
//! outgoing line is either claimed by a channel (selected by the first
//! character, e.g. `!` for Shout or `$` for Trade) or delivered as local chat
//! to players within range, with spy copies for staff out of range.
//!
//! ## Features
//!
//! - **Dispatch channels**: Shout, Trade, Help and Town channels with per-player opt-out rosters.
//! - **Local chat**: Per-axis range box, spy mode with bypass, console copy of everything.
//! - **Commands**: `/channel`, `/nick`, `/enablespy`, `/disablespy`, `/globalmute`, `/teamchat`, `/townchat`.
//! - **Localization**: Every user-facing line comes from a regenerating TOML language file.
//! - **Persistence**: Spy flag and nickname per player, written with file locks and atomic renames.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sinkchat::chat::memory::{MemoryDirectory, MemoryPlayer};
//! use sinkchat::chat::{ChatServer, Player};
//! use sinkchat::config::Config;
//! use sinkchat::lang::Language;
//! use sinkchat::storage::PlayerStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let lang = Language::load_or_create(&config.language.file).await?;
//!     let store = PlayerStore::open(&config.storage.data_dir).await?;
//!     let players = Arc::new(MemoryDirectory::new());
//!     let alice = players.add(MemoryPlayer::new("alice"));
//!
//!     let server = ChatServer::new(&config, players.clone(), Arc::new(lang), Arc::new(store));
//!     let mut cancelled = false;
//!     server.on_chat(alice.id(), "!hello", &mut cancelled);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`chat`] - Channels, registry, dispatcher, recipient filter and the server adapter
//! - [`config`] - Configuration management and validation
//! - [`lang`] - Language file with defaults and `$TOKEN$` substitution
//! - [`storage`] - Per-player configuration persistence
//! - [`validation`] - Nickname and chat line validation
//! - [`replay`] - Scripted sessions against the in-memory host
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │ ← Adapter: sanitize, mute, deliver, log
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Dispatcher    │ ← Pure routing: channel or local
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Host traits    │ ← Players, console, towns, relay
//! └─────────────────┘
//! ```

pub mod chat;
pub mod config;
pub mod lang;
pub mod logutil;
pub mod metrics;
pub mod replay;
pub mod storage;
pub mod validation;
