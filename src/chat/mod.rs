//! # Chat Routing Core
//!
//! Decides, for every outgoing chat line, which audience receives it:
//!
//! - a line starting with a registered dispatch character (`!`, `$`, ...) goes
//!   to that channel's members, i.e. every online player not on its excepted
//!   roster
//! - anything else is local chat, limited by range, with spy copies for
//!   eligible players out of range
//!
//! The host (game server, test harness, replay tool) plugs in through the
//! traits in [`host`]. [`ChatServer`] wires everything together.

pub mod channel;
pub mod commands;
pub mod context;
pub mod delivery;
pub mod dispatcher;
pub mod errors;
pub mod filter;
pub mod format;
pub mod host;
pub mod memory;
pub mod moderation;
pub mod registry;
pub mod server;

pub use channel::{Channel, ChannelKind, ChannelOutcome};
pub use commands::{ChannelAction, ChatCommand, ChatCommandParser};
pub use context::ChatContext;
pub use delivery::{deliver_all, Delivery, Recipient};
pub use dispatcher::{ChatEvent, ChatOutcome, Dispatcher, LocalChat, Route};
pub use errors::ChatError;
pub use filter::{Decision, RecipientFilter};
pub use host::{ChatRelay, Localizer, Location, Player, PlayerDirectory, PlayerId, Town, TownProvider};
pub use moderation::GlobalMute;
pub use registry::ChannelRegistry;
pub use server::ChatServer;
