//! # Chat Server
//!
//! [`ChatServer`] is the adapter between the host and the routing core. It owns
//! the channel registry, the dispatcher, the global mute switch and the
//! counters, and it is the only place that actually sends text to players.
//!
//! ```text
//! host chat event ─▶ sanitize ─▶ GlobalMute ─▶ Dispatcher ─▶ deliver_all
//!                                                   │
//!                                                   └─▶ log / relay / metrics
//! ```
//!
//! Commands (`/channel`, `/nick`, ...) enter through [`ChatServer::execute_command`].

use std::sync::Arc;

use log::{debug, info, warn};

use super::channel::{Channel, ChannelKind, ChannelOutcome};
use super::commands::{ChannelAction, ChatCommand, ChatCommandParser, PERM_NICK_OTHER, PERM_TEAMCHAT};
use super::context::ChatContext;
use super::delivery::{deliver_all, Delivery};
use super::dispatcher::{ChatEvent, Dispatcher, LocalChat, Route};
use super::errors::ChatError;
use super::filter::RecipientFilter;
use super::format::{strip_colors, translate_color_codes, RESET, WHITE};
use super::host::{ChatRelay, Localizer, Player, PlayerDirectory, PlayerId, TownProvider};
use super::moderation::{GlobalMute, PERM_GLOBALMUTE};
use super::registry::ChannelRegistry;
use crate::config::{ChatConfig, Config};
use crate::logutil::{chat_log_line, CHAT_TARGET};
use crate::metrics::ChatMetrics;
use crate::storage::PlayerStore;
use crate::validation::{sanitize_chat_message, validate_nickname, NicknameError};

pub struct ChatServer {
    settings: ChatConfig,
    directory: Arc<dyn PlayerDirectory>,
    lang: Arc<dyn Localizer>,
    store: Arc<PlayerStore>,
    towns: Option<Arc<dyn TownProvider>>,
    relay: Option<Arc<dyn ChatRelay>>,
    dispatcher: Dispatcher,
    global_mute: GlobalMute,
    metrics: ChatMetrics,
    parser: ChatCommandParser,
    rejected: Vec<ChatError>,
}

impl ChatServer {
    /// Register every enabled channel from `config` and set up local chat.
    ///
    /// Channels that cannot be registered (bad or duplicate dispatch
    /// character, duplicate name) are logged and kept in [`Self::rejected`];
    /// start-up continues with the rest.
    pub fn new(
        config: &Config,
        directory: Arc<dyn PlayerDirectory>,
        lang: Arc<dyn Localizer>,
        store: Arc<PlayerStore>,
    ) -> Self {
        let mut registry = ChannelRegistry::new();
        let mut rejected = Vec::new();
        let channels: Vec<Channel> = config
            .enabled_channels()
            .filter_map(|c| {
                let channel = c.to_channel();
                if channel.is_none() {
                    warn!("channel {} skipped: unusable call_char '{}'", c.name, c.call_char);
                }
                channel
            })
            .collect();
        rejected.extend(registry.register_all(channels));

        let local = LocalChat {
            filter: RecipientFilter::new(f64::from(config.chat.local_chat_range)),
            format: config.chat.local_format.clone(),
            show_local_prefix: config.chat.show_local_prefix,
            towny_enabled: config.chat.towny_enabled,
        };
        info!(
            "chat server ready: {} channels, local range {}",
            registry.len(),
            config.chat.local_chat_range
        );

        Self {
            settings: config.chat.clone(),
            directory,
            lang,
            store,
            towns: None,
            relay: None,
            dispatcher: Dispatcher::new(Arc::new(registry), local),
            global_mute: GlobalMute::new(),
            metrics: ChatMetrics::new(),
            parser: ChatCommandParser::with_prefix(config.chat.command_char()),
            rejected,
        }
    }

    /// Attach the towns integration. Without it the town channel only answers
    /// "unavailable" and local chat shows no nation tags.
    pub fn with_towns(mut self, towns: Arc<dyn TownProvider>) -> Self {
        self.towns = Some(towns);
        self
    }

    pub fn with_relay(mut self, relay: Arc<dyn ChatRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        self.dispatcher.registry()
    }

    pub fn metrics(&self) -> &ChatMetrics {
        &self.metrics
    }

    pub fn global_mute(&self) -> &GlobalMute {
        &self.global_mute
    }

    pub fn store(&self) -> &Arc<PlayerStore> {
        &self.store
    }

    /// Registration errors collected at start-up.
    pub fn rejected(&self) -> &[ChatError] {
        &self.rejected
    }

    fn context(&self) -> ChatContext<'_> {
        ChatContext {
            directory: self.directory.as_ref(),
            lang: self.lang.as_ref(),
            store: &self.store,
            towns: self.towns.as_deref(),
        }
    }

    fn deliver(&self, deliveries: &[Delivery]) -> usize {
        deliver_all(deliveries, self.directory.as_ref(), &self.metrics)
    }

    fn reply(&self, player: &dyn Player, text: String) {
        self.deliver(&[Delivery::to_player(player.id(), text)]);
    }

    /// Host chat hook.
    ///
    /// `cancelled` carries the upstream state in and the final state out.
    /// Returns true when the host must not deliver the line itself.
    pub fn on_chat(&self, sender: PlayerId, message: &str, cancelled: &mut bool) -> bool {
        let mut event = ChatEvent::new(sender, message);
        event.cancelled = *cancelled;

        let player = self.directory.player(sender);
        if let (Some(player), false) = (&player, event.cancelled) {
            match sanitize_chat_message(message, self.settings.max_message_bytes) {
                Ok(clean) => event.message = clean,
                Err(e) => {
                    warn!("chat from {} refused: {}", player.name(), e);
                    event.cancelled = true;
                    self.reply(player.as_ref(), self.lang.text("SinkChat.MessageTooLong"));
                }
            }
            if let Some(notice) = self
                .global_mute
                .intercept(&mut event, player.as_ref(), self.lang.as_ref())
            {
                self.deliver(&[notice]);
            }
        }

        let outcome = self.dispatcher.dispatch(&event, &self.context());
        let delivered = self.deliver(&outcome.deliveries);

        match (&outcome.route, &player) {
            (Route::Cancelled, _) => self.metrics.inc_cancelled(),
            (Route::Channel(name), Some(player)) => {
                self.metrics.inc_channel_message(name);
                if let Some(channel) = self.registry().by_name(name) {
                    let body = event
                        .message
                        .strip_prefix(channel.call_char())
                        .unwrap_or(&event.message);
                    self.record_line(channel, player.as_ref(), body);
                }
            }
            (Route::Local, Some(player)) => {
                self.metrics.inc_local_message();
                self.metrics.add_spy_copies(outcome.spy_copies as u64);
                info!(
                    target: CHAT_TARGET,
                    "[local] {}: {} ({} recipients)",
                    player.name(),
                    chat_log_line(&event.message),
                    delivered.saturating_sub(1)
                );
            }
            (Route::Refused(name), _) => debug!("{} refused chat from {}", name, sender),
            _ => {}
        }

        *cancelled = outcome.handled;
        outcome.handled
    }

    /// Log a channel line and mirror it to the relay. Town lines stay private.
    fn record_line(&self, channel: &Channel, player: &dyn Player, body: &str) {
        info!(
            target: CHAT_TARGET,
            "[{}] {}: {}",
            channel.name(),
            player.name(),
            chat_log_line(body)
        );
        if channel.kind() == ChannelKind::Town {
            return;
        }
        if let Some(relay) = &self.relay {
            let text = format!(
                "{}: {}",
                strip_colors(&player.display_name()),
                strip_colors(&translate_color_codes('&', body))
            );
            relay.relay(channel.name(), &text);
        }
    }

    /// Opt `player` back into the named channel and announce it.
    pub fn join_channel(&self, channel: &str, player: PlayerId) -> Result<(), ChatError> {
        let (channel, player) = self.lookup(channel, player)?;
        let deliveries = channel.on_join(player.as_ref(), &self.context());
        self.deliver(&deliveries);
        Ok(())
    }

    /// Opt `player` out of the named channel and announce it.
    pub fn leave_channel(&self, channel: &str, player: PlayerId) -> Result<(), ChatError> {
        let (channel, player) = self.lookup(channel, player)?;
        let deliveries = channel.on_leave(player.as_ref(), &self.context());
        self.deliver(&deliveries);
        Ok(())
    }

    fn lookup(&self, channel: &str, player: PlayerId) -> Result<(Arc<Channel>, Arc<dyn Player>), ChatError> {
        let channel = self
            .registry()
            .by_name(channel)
            .cloned()
            .ok_or_else(|| ChatError::UnknownChannel(channel.to_string()))?;
        let player = self
            .directory
            .player(player)
            .ok_or_else(|| ChatError::UnknownPlayer(player.to_string()))?;
        Ok((channel, player))
    }

    /// Restore the stored nickname when a player logs in.
    ///
    /// A nickname equal to the login name is redundant and gets cleared.
    pub async fn on_player_join(&self, id: PlayerId) -> Result<(), ChatError> {
        let player = self
            .directory
            .player(id)
            .ok_or_else(|| ChatError::UnknownPlayer(id.to_string()))?;
        let name = player.name();
        match self.store.nickname(id) {
            Some(nick) if nick == name => {
                debug!("clearing redundant nickname of {}", name);
                self.store.set_nickname(id, &name, None);
                player.set_display_name(&name);
                self.store.flush().await?;
            }
            Some(nick) => player.set_display_name(&nick),
            None => player.set_display_name(&name),
        }
        Ok(())
    }

    /// Send `text` to every online player and the console. Returns the number
    /// of players reached.
    pub fn broadcast(&self, text: &str) -> usize {
        let mut deliveries: Vec<Delivery> = self
            .directory
            .online_players()
            .iter()
            .map(|p| Delivery::to_player(p.id(), text))
            .collect();
        let players = deliveries.len();
        deliveries.push(Delivery::to_console(text));
        let delivered = self.deliver(&deliveries);
        info!(target: CHAT_TARGET, "[broadcast] {}", chat_log_line(text));
        delivered.min(players)
    }

    /// Run a chat command. Returns `Ok(false)` for commands this plugin does
    /// not own, so the host can offer them elsewhere.
    pub async fn execute_command(&self, sender: PlayerId, line: &str) -> Result<bool, ChatError> {
        let command = self.parser.parse(line);
        if command == ChatCommand::Unknown {
            return Ok(false);
        }
        let player = self
            .directory
            .player(sender)
            .ok_or_else(|| ChatError::UnknownPlayer(sender.to_string()))?;
        debug!("{} issued {:?}", player.name(), command);

        match command {
            ChatCommand::Channel(action) => self.channel_command(player.as_ref(), action)?,
            ChatCommand::Nick { target, nickname } => {
                self.nick_command(player.as_ref(), target.as_deref(), &nickname)
                    .await?
            }
            ChatCommand::EnableSpy => self.spy_command(player.as_ref(), true).await?,
            ChatCommand::DisableSpy => self.spy_command(player.as_ref(), false).await?,
            ChatCommand::GlobalMute => self.globalmute_command(player.as_ref()),
            ChatCommand::TeamChat(message) => self.teamchat_command(player.as_ref(), &message),
            ChatCommand::TownChat(message) => self.townchat_command(player.as_ref(), &message),
            ChatCommand::Invalid(usage) => {
                self.reply(player.as_ref(), self.lang.format("General.Usage", &[("USAGE", &usage)]))
            }
            ChatCommand::Unknown => return Ok(false),
        }
        Ok(true)
    }

    fn channel_reply(&self, player: &dyn Player, key: &str, tokens: &[(&str, &str)]) {
        let text = format!(
            "{} {}",
            self.lang.text("SinkChat.Prefix.Channel"),
            self.lang.format(key, tokens)
        );
        self.reply(player, text);
    }

    fn channel_command(&self, player: &dyn Player, action: ChannelAction) -> Result<(), ChatError> {
        match action {
            ChannelAction::Join(name) => {
                let Some(channel) = self.registry().by_name(&name) else {
                    self.channel_reply(player, "SinkChat.Commands.Channel.ChannelUnknown", &[("CHANNEL", &name)]);
                    return Ok(());
                };
                if !channel.may_use(player) {
                    self.reply(player, self.lang.text(&channel.permission_denied_key()));
                    return Ok(());
                }
                self.join_channel(channel.name(), player.id())?;
            }
            ChannelAction::Leave(name) => {
                let Some(channel) = self.registry().by_name(&name) else {
                    self.channel_reply(player, "SinkChat.Commands.Channel.ChannelUnknown", &[("CHANNEL", &name)]);
                    return Ok(());
                };
                self.leave_channel(channel.name(), player.id())?;
                self.channel_reply(
                    player,
                    "SinkChat.Commands.Channel.PlayerLeaves",
                    &[("CHANNEL", channel.name())],
                );
            }
            ChannelAction::List => {
                let names = self
                    .registry()
                    .channels()
                    .map(|c| format!("{} ({})", c.name(), c.call_char()))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.channel_reply(player, "SinkChat.Commands.Channel.List", &[("CHANNELS", &names)]);
            }
            ChannelAction::Part => {
                let names = self
                    .registry()
                    .channels()
                    .filter(|c| !c.is_excepted(player.id()) && c.may_use(player))
                    .map(|c| c.name().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.channel_reply(player, "SinkChat.Commands.Channel.Part", &[("CHANNELS", &names)]);
            }
            ChannelAction::Help => self.channel_reply(player, "SinkChat.Commands.Channel.Help", &[]),
            ChannelAction::MissingName => {
                self.channel_reply(player, "SinkChat.Commands.Channel.NoChannelGiven", &[])
            }
        }
        Ok(())
    }

    fn nick_reply(&self, player: &dyn Player, key: &str, tokens: &[(&str, &str)]) {
        let text = format!(
            "{} {}",
            self.lang.text("SinkChat.Prefix.Nick"),
            self.lang.format(key, tokens)
        );
        self.reply(player, text);
    }

    async fn nick_command(
        &self,
        sender: &dyn Player,
        target: Option<&str>,
        nickname: &str,
    ) -> Result<(), ChatError> {
        let target: Arc<dyn Player> = match target {
            None => self
                .directory
                .player(sender.id())
                .ok_or_else(|| ChatError::UnknownPlayer(sender.name()))?,
            Some(name) => {
                if !name.eq_ignore_ascii_case(&sender.name()) && !sender.has_permission(PERM_NICK_OTHER) {
                    self.reply(sender, self.lang.text("Permissions.SinkChat.Nick.Other"));
                    return Ok(());
                }
                match self.directory.player_by_name(name).filter(|p| p.is_online()) {
                    Some(player) => player,
                    None => {
                        self.reply(sender, self.lang.format("General.NotOnline", &[("PLAYER", name)]));
                        return Ok(());
                    }
                }
            }
        };

        let login = target.name();
        let display = if nickname.eq_ignore_ascii_case("off") {
            login.clone()
        } else {
            match self.check_nickname(target.as_ref(), nickname) {
                Ok(display) => display,
                Err(e) => {
                    debug!("nickname '{}' for {} rejected: {}", nickname, login, e);
                    self.nick_reply(sender, e.language_key(), &[]);
                    return Ok(());
                }
            }
        };

        target.set_display_name(&display);
        let stored = (display != login).then(|| display.clone());
        self.store.set_nickname(target.id(), &login, stored);
        info!("{} is now known as {}", login, strip_colors(&display));

        if target.id() == sender.id() {
            self.nick_reply(sender, "SinkChat.Commands.Nick.SelfChanged", &[("NICK", &display)]);
        } else {
            self.nick_reply(
                sender,
                "SinkChat.Commands.Nick.OtherChanged",
                &[("PLAYER", &login), ("NICK", &display)],
            );
            self.nick_reply(target.as_ref(), "SinkChat.Commands.Nick.SelfChanged", &[("NICK", &display)]);
        }
        self.store.flush().await?;
        Ok(())
    }

    /// Validate and make sure no other online player already shows this name.
    fn check_nickname(&self, target: &dyn Player, nickname: &str) -> Result<String, NicknameError> {
        let display = validate_nickname(nickname, self.settings.max_nickname_length)?;
        let visible = strip_colors(&display);
        let taken = self.directory.online_players().into_iter().find(|p| {
            p.id() != target.id()
                && (p.name().eq_ignore_ascii_case(&visible)
                    || strip_colors(&p.display_name()).eq_ignore_ascii_case(&visible))
        });
        match taken {
            Some(owner) => Err(NicknameError::Used { owner: owner.name() }),
            None => Ok(display),
        }
    }

    async fn spy_command(&self, player: &dyn Player, enable: bool) -> Result<(), ChatError> {
        let changed = self.store.set_spy_enabled(player.id(), &player.name(), enable);
        let key = match (enable, changed) {
            (true, true) => "SinkChat.Commands.Spy.Enabled",
            (true, false) => "SinkChat.Commands.Spy.AlreadyEnabled",
            (false, true) => "SinkChat.Commands.Spy.Disabled",
            (false, false) => "SinkChat.Commands.Spy.AlreadyDisabled",
        };
        self.reply(player, self.lang.text(key));
        if changed {
            self.store.flush().await?;
        }
        Ok(())
    }

    fn globalmute_command(&self, player: &dyn Player) {
        if !player.has_permission(PERM_GLOBALMUTE) {
            self.reply(player, self.lang.text("Permissions.General"));
            return;
        }
        let enabled = self.global_mute.toggle();
        let key = if enabled {
            "SinkCommands.GlobalMute.Enabled"
        } else {
            "SinkCommands.GlobalMute.Disabled"
        };
        let text = format!(
            "{} {}",
            self.lang.text("SinkCommands.GlobalMute.Prefix"),
            self.lang.format(key, &[("PLAYER", &player.display_name())])
        );
        self.broadcast(&text);
    }

    fn teamchat_command(&self, player: &dyn Player, message: &str) {
        if !player.has_permission(PERM_TEAMCHAT) {
            self.reply(player, self.lang.text("Permissions.General"));
            return;
        }
        let line = format!(
            "{} {}{}: {}",
            self.lang.text("SinkCommands.TeamChat.Prefix"),
            player.display_name(),
            WHITE,
            translate_color_codes('&', message)
        );
        let mut deliveries: Vec<Delivery> = self
            .directory
            .online_players()
            .iter()
            .filter(|p| p.has_permission(PERM_TEAMCHAT))
            .map(|p| Delivery::to_player(p.id(), line.as_str()))
            .collect();
        deliveries.push(Delivery::to_console(format!("{}{}", line, RESET)));
        self.deliver(&deliveries);
        info!(target: CHAT_TARGET, "[team] {}: {}", player.name(), chat_log_line(message));
    }

    fn townchat_command(&self, player: &dyn Player, message: &str) {
        let Some(channel) = self
            .registry()
            .channels()
            .find(|c| c.kind() == ChannelKind::Town)
            .cloned()
        else {
            self.reply(player, self.lang.text("SinkChat.Towny.Unavailable"));
            return;
        };
        let raw = format!("{}{}", channel.call_char(), message);
        match channel.dispatch(player, &raw, &self.context()) {
            ChannelOutcome::Delivered(deliveries) => {
                self.deliver(&deliveries);
                self.metrics.inc_channel_message(channel.name());
                self.record_line(&channel, player, message);
            }
            ChannelOutcome::Refused(notice) => {
                self.deliver(&[notice]);
            }
            ChannelOutcome::Declined => {}
        }
    }
}
