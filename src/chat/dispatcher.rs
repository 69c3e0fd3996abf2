//! Chat interception: decides who owns an outgoing chat line.
//!
//! [`Dispatcher::dispatch`] is a pure function of the event and the current
//! state. It returns the deliveries to perform and whether the line is now
//! handled; [`crate::chat::ChatServer`] applies the result to the host.
//!
//! Evaluation order, first match wins:
//! 1. already cancelled upstream: leave it alone
//! 2. first character is a registered dispatch character: the channel decides
//! 3. anything else: local chat, filtered by range and spy rules

use std::sync::Arc;

use log::{trace, warn};

use super::context::ChatContext;
use super::delivery::Delivery;
use super::filter::{Decision, RecipientFilter};
use super::format::{strip_colors, translate_color_codes, GRAY, RESET};
use super::host::{Player, PlayerId};
use super::channel::ChannelOutcome;
use super::registry::ChannelRegistry;

/// An outgoing chat line as seen by the host's chat event.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub sender: PlayerId,
    pub message: String,
    /// Set by an earlier interceptor (mute, freeze, ...).
    pub cancelled: bool,
}

impl ChatEvent {
    pub fn new(sender: PlayerId, message: impl Into<String>) -> Self {
        Self {
            sender,
            message: message.into(),
            cancelled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Cancelled before reaching us.
    Cancelled,
    /// Claimed by the named channel.
    Channel(String),
    /// Claimed by the named channel, which only answered the sender.
    Refused(String),
    /// Local (range-limited) chat.
    Local,
    /// The sender is not known to the directory; the host keeps the event.
    Unhandled,
}

#[derive(Debug)]
pub struct ChatOutcome {
    /// True when the host must suppress its own chat delivery.
    pub handled: bool,
    pub route: Route,
    pub deliveries: Vec<Delivery>,
    /// Player deliveries that carry the spy marker.
    pub spy_copies: usize,
}

impl ChatOutcome {
    fn untouched(route: Route, handled: bool) -> Self {
        Self {
            handled,
            route,
            deliveries: Vec::new(),
            spy_copies: 0,
        }
    }
}

/// Settings for the local chat path.
#[derive(Debug, Clone)]
pub struct LocalChat {
    pub filter: RecipientFilter,
    /// Template with `$PLAYER$` and `$MESSAGE$`; `&` color codes allowed.
    pub format: String,
    pub show_local_prefix: bool,
    pub towny_enabled: bool,
}

pub struct Dispatcher {
    registry: Arc<ChannelRegistry>,
    local: LocalChat,
}

impl Dispatcher {
    pub fn new(registry: Arc<ChannelRegistry>, local: LocalChat) -> Self {
        Self { registry, local }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn local(&self) -> &LocalChat {
        &self.local
    }

    pub fn dispatch(&self, event: &ChatEvent, ctx: &ChatContext<'_>) -> ChatOutcome {
        if event.cancelled {
            trace!("chat from {} already cancelled", event.sender);
            return ChatOutcome::untouched(Route::Cancelled, true);
        }
        let Some(sender) = ctx.directory.player(event.sender) else {
            warn!("chat event from unknown player {}", event.sender);
            return ChatOutcome::untouched(Route::Unhandled, false);
        };

        if let Some(first) = event.message.chars().next() {
            for channel in self.registry.channels() {
                if channel.call_char() != first {
                    continue;
                }
                match channel.dispatch(sender.as_ref(), &event.message, ctx) {
                    ChannelOutcome::Delivered(deliveries) => {
                        return ChatOutcome {
                            handled: true,
                            route: Route::Channel(channel.name().to_string()),
                            deliveries,
                            spy_copies: 0,
                        };
                    }
                    ChannelOutcome::Refused(notice) => {
                        return ChatOutcome {
                            handled: true,
                            route: Route::Refused(channel.name().to_string()),
                            deliveries: vec![notice],
                            spy_copies: 0,
                        };
                    }
                    ChannelOutcome::Declined => {
                        trace!("channel {} declined '{}'", channel.name(), first);
                    }
                }
            }
        }

        let (deliveries, spy_copies) = self.local_broadcast(sender.as_ref(), &event.message, ctx);
        ChatOutcome {
            handled: true,
            route: Route::Local,
            deliveries,
            spy_copies,
        }
    }

    /// Plain line for local chat, before any spy marker.
    pub fn format_local(&self, sender: &dyn Player, message: &str, ctx: &ChatContext<'_>) -> String {
        let template = translate_color_codes('&', &self.local.format);
        let mut line = template
            .replace("$PLAYER$", &sender.display_name())
            .replace("$MESSAGE$", message);

        if self.local.towny_enabled {
            if let Some(tag) = ctx
                .towns
                .and_then(|t| t.town_of(&sender.name()))
                .and_then(|town| town.nation_tag)
            {
                let tag = strip_colors(&translate_color_codes('&', &tag));
                line = format!("{}[{}{}] {}", GRAY, tag, GRAY, line);
            }
        }
        if self.local.show_local_prefix {
            line = format!("{}{}{} {}", GRAY, ctx.lang.text("SinkChat.Prefix.Local"), RESET, line);
        }
        line
    }

    fn local_broadcast(
        &self,
        sender: &dyn Player,
        message: &str,
        ctx: &ChatContext<'_>,
    ) -> (Vec<Delivery>, usize) {
        let line = self.format_local(sender, message, ctx);
        let spy_prefix = format!("{}{} {}", GRAY, ctx.lang.text("SinkChat.Prefix.Spy"), RESET);
        let spy_line = format!("{}{}", spy_prefix, line);

        let mut deliveries = Vec::new();
        let mut spy_copies = 0;
        for recipient in ctx.directory.online_players() {
            let spy_enabled = ctx.store.spy_enabled(recipient.id());
            match self.local.filter.decide(sender, recipient.as_ref(), spy_enabled) {
                Decision::Plain => deliveries.push(Delivery::to_player(recipient.id(), line.clone())),
                Decision::Spy => {
                    spy_copies += 1;
                    deliveries.push(Delivery::to_player(recipient.id(), spy_line.clone()));
                }
                Decision::Skip => {}
            }
        }
        deliveries.push(Delivery::to_console(spy_line));
        (deliveries, spy_copies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::channel::{Channel, ChannelKind};
    use crate::chat::delivery::Recipient;
    use crate::chat::memory::{MemoryDirectory, MemoryPlayer};
    use crate::lang::Language;
    use crate::storage::PlayerStore;

    fn dispatcher() -> Dispatcher {
        let mut registry = ChannelRegistry::new();
        registry
            .register(Arc::new(Channel::new("Shout", ChannelKind::Shout, '!', "[Shout]")))
            .unwrap();
        let local = LocalChat {
            filter: RecipientFilter::new(10.0),
            format: "$PLAYER$: $MESSAGE$".into(),
            show_local_prefix: false,
            towny_enabled: false,
        };
        Dispatcher::new(Arc::new(registry), local)
    }

    #[test]
    fn plans_without_sending() {
        let directory = MemoryDirectory::new();
        let alice = directory.add(MemoryPlayer::new("alice"));
        let lang = Language::defaults();
        let store = PlayerStore::in_memory();
        let ctx = ChatContext {
            directory: &directory,
            lang: &lang,
            store: &store,
            towns: None,
        };

        let outcome = dispatcher().dispatch(&ChatEvent::new(alice.id(), "!hey"), &ctx);
        assert!(outcome.handled);
        assert_eq!(outcome.route, Route::Channel("Shout".into()));
        assert_eq!(outcome.deliveries.len(), 1);
        assert!(alice.inbox().is_empty());

        let outcome = dispatcher().dispatch(&ChatEvent::new(alice.id(), "hey"), &ctx);
        assert_eq!(outcome.route, Route::Local);
        assert_eq!(outcome.deliveries.last().map(|d| d.recipient), Some(Recipient::Console));
    }

    #[test]
    fn cancelled_event_is_untouched() {
        let directory = MemoryDirectory::new();
        let alice = directory.add(MemoryPlayer::new("alice"));
        let lang = Language::defaults();
        let store = PlayerStore::in_memory();
        let ctx = ChatContext {
            directory: &directory,
            lang: &lang,
            store: &store,
            towns: None,
        };
        let mut event = ChatEvent::new(alice.id(), "!hey");
        event.cancelled = true;
        let outcome = dispatcher().dispatch(&event, &ctx);
        assert!(outcome.handled);
        assert_eq!(outcome.route, Route::Cancelled);
        assert!(outcome.deliveries.is_empty());
    }
}
