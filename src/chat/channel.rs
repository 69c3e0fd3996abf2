//! Chat channels and their opt-out rosters.
//!
//! Every online player receives a channel by default. Leaving a channel puts
//! the player on the channel's *excepted* roster; joining takes them off it
//! again. The roster is in-memory only and resets on restart.
//!
//! A channel claims a chat line that starts with its dispatch character and
//! returns the deliveries for it. It never sends anything itself.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::context::ChatContext;
use super::delivery::Delivery;
use super::format::{translate_color_codes, GOLD, GRAY, RESET, WHITE};
use super::host::{Player, PlayerId};

/// Group label used when the host has no permissions backend.
pub const DEFAULT_GROUP: &str = "Default";

/// Players holding this permission read every town channel.
pub const PERM_TOWN_SPY: &str = "sinkchat.command.townyspy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Shout,
    Trade,
    Help,
    Town,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Shout => "shout",
            ChannelKind::Trade => "trade",
            ChannelKind::Help => "help",
            ChannelKind::Town => "town",
        }
    }
}

/// Result of offering a chat line to a channel.
#[derive(Debug, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The channel claimed the line; nothing else may handle it.
    Delivered(Vec<Delivery>),
    /// Claimed, but only the sender hears back (no permission, no town).
    Refused(Delivery),
    /// Not for this channel; the caller keeps looking.
    Declined,
}

impl ChannelOutcome {
    pub fn is_claimed(&self) -> bool {
        !matches!(self, ChannelOutcome::Declined)
    }
}

#[derive(Debug)]
pub struct Channel {
    name: String,
    kind: ChannelKind,
    call_char: char,
    prefix: String,
    permission: Option<String>,
    excepted: RwLock<HashSet<PlayerId>>,
}

impl Channel {
    /// `prefix` may use `&` color codes.
    pub fn new(name: impl Into<String>, kind: ChannelKind, call_char: char, prefix: &str) -> Self {
        Self {
            name: name.into(),
            kind,
            call_char,
            prefix: translate_color_codes('&', prefix),
            permission: None,
            excepted: RwLock::new(HashSet::new()),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn call_char(&self) -> char {
        self.call_char
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    /// True when the channel has no required permission or the player holds it.
    pub fn may_use(&self, player: &dyn Player) -> bool {
        self.permission
            .as_deref()
            .map_or(true, |node| player.has_permission(node))
    }

    /// Language key for the "may not use this channel" notice.
    pub fn permission_denied_key(&self) -> String {
        format!("Permissions.SinkChat.Channels.{}", self.name)
    }

    fn read_excepted(&self) -> RwLockReadGuard<'_, HashSet<PlayerId>> {
        self.excepted.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_excepted(&self) -> RwLockWriteGuard<'_, HashSet<PlayerId>> {
        self.excepted.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_excepted(&self, player: PlayerId) {
        self.write_excepted().insert(player);
    }

    pub fn remove_excepted(&self, player: PlayerId) {
        self.write_excepted().remove(&player);
    }

    pub fn is_excepted(&self, player: PlayerId) -> bool {
        self.read_excepted().contains(&player)
    }

    /// Copy of the roster. Broadcasts work from a snapshot so a concurrent
    /// join/leave lands either before or after them, never halfway.
    pub fn excepted_snapshot(&self) -> HashSet<PlayerId> {
        self.read_excepted().clone()
    }

    /// Opt the player back in (when permitted) and announce it to the audience.
    pub fn on_join(&self, player: &dyn Player, ctx: &ChatContext<'_>) -> Vec<Delivery> {
        if self.may_use(player) {
            self.remove_excepted(player.id());
        } else {
            debug!("{} joined {} without permission; roster unchanged", player.name(), self.name);
        }
        let notice = ctx.lang.format(
            "SinkChat.Channel.PlayerJoined",
            &[("PLAYER", &player.display_name()), ("CHANNEL", &self.name)],
        );
        self.broadcast_to_members(&format!("{} {}", self.prefix, notice), ctx)
    }

    /// Opt the player out and announce it to whoever still listens. The
    /// notice names the login name, the join notice the display name.
    pub fn on_leave(&self, player: &dyn Player, ctx: &ChatContext<'_>) -> Vec<Delivery> {
        self.add_excepted(player.id());
        let notice = ctx.lang.format(
            "SinkChat.Channel.PlayerLeft",
            &[("PLAYER", &player.name()), ("CHANNEL", &self.name)],
        );
        self.broadcast_to_members(&format!("{} {}", self.prefix, notice), ctx)
    }

    /// Offer a raw chat line to this channel.
    pub fn dispatch(&self, sender: &dyn Player, raw: &str, ctx: &ChatContext<'_>) -> ChannelOutcome {
        let Some(body) = raw.strip_prefix(self.call_char) else {
            return ChannelOutcome::Declined;
        };
        if !self.may_use(sender) {
            trace!("{} lacks permission for {}", sender.name(), self.name);
            let denial = ctx.lang.text(&self.permission_denied_key());
            return ChannelOutcome::Refused(Delivery::to_player(sender.id(), denial));
        }
        match self.kind {
            ChannelKind::Town => self.dispatch_town(sender, body, ctx),
            ChannelKind::Shout | ChannelKind::Trade | ChannelKind::Help => {
                let line = self.format_line(sender, body);
                ChannelOutcome::Delivered(self.broadcast_to_members(&line, ctx))
            }
        }
    }

    /// `prefix [group] displayName: body`, with `&` codes translated.
    pub fn format_line(&self, sender: &dyn Player, body: &str) -> String {
        let group = sender.group().unwrap_or_else(|| DEFAULT_GROUP.to_string());
        let line = format!(
            "{} [{}{}] {}: {}",
            self.prefix,
            group,
            RESET,
            sender.display_name(),
            body
        );
        translate_color_codes('&', &line)
    }

    fn broadcast_to_members(&self, text: &str, ctx: &ChatContext<'_>) -> Vec<Delivery> {
        let excepted = self.excepted_snapshot();
        ctx.directory
            .online_players()
            .into_iter()
            .filter(|p| !excepted.contains(&p.id()))
            .map(|p| Delivery::to_player(p.id(), text))
            .collect()
    }

    fn dispatch_town(&self, sender: &dyn Player, body: &str, ctx: &ChatContext<'_>) -> ChannelOutcome {
        let Some(towns) = ctx.towns else {
            let notice = ctx.lang.text("SinkChat.Towny.Unavailable");
            return ChannelOutcome::Refused(Delivery::to_player(sender.id(), notice));
        };
        let Some(town) = towns.town_of(&sender.name()) else {
            let notice = ctx.lang.text("SinkChat.Towny.NotInTown");
            return ChannelOutcome::Refused(Delivery::to_player(sender.id(), notice));
        };

        let line = format!(
            "{}[{}{}{}] {}{}: {}{}",
            GRAY,
            GOLD,
            town.name,
            GRAY,
            sender.display_name(),
            GRAY,
            WHITE,
            body.trim()
        );

        let excepted = self.excepted_snapshot();
        let mut seen: HashSet<PlayerId> = HashSet::new();
        let mut deliveries = Vec::new();
        let residents = town
            .residents
            .iter()
            .filter_map(|name| ctx.directory.player_by_name(name))
            .filter(|p| p.is_online());
        let spies = ctx
            .directory
            .online_players()
            .into_iter()
            .filter(|p| p.has_permission(PERM_TOWN_SPY));
        for player in residents.chain(spies) {
            let id = player.id();
            if excepted.contains(&id) || !seen.insert(id) {
                continue;
            }
            deliveries.push(Delivery::to_player(id, line.clone()));
        }
        ChannelOutcome::Delivered(deliveries)
    }
}
