//! Moderation interceptors that run before channel dispatch.

use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use super::delivery::Delivery;
use super::dispatcher::ChatEvent;
use super::host::{Localizer, Player};

pub const PERM_GLOBALMUTE: &str = "sinkcommands.globalmute";
pub const PERM_GLOBALMUTE_BYPASS: &str = "sinkcommands.globalmute.bypass";

/// Server-wide mute switch. Owned by the chat server, never a global.
#[derive(Debug, Default)]
pub struct GlobalMute {
    enabled: AtomicBool,
}

impl GlobalMute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Flip the switch and return the new state.
    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::AcqRel)
    }

    /// Lowest-priority interceptor. Cancels the event and tells the sender
    /// why when the mute is on and they cannot bypass it.
    pub fn intercept(
        &self,
        event: &mut ChatEvent,
        sender: &dyn Player,
        lang: &dyn Localizer,
    ) -> Option<Delivery> {
        if event.cancelled || !self.is_enabled() || sender.has_permission(PERM_GLOBALMUTE_BYPASS) {
            return None;
        }
        info!("globalmute: blocked chat from {}", sender.name());
        event.cancelled = true;
        let notice = format!(
            "{} {}",
            lang.text("SinkCommands.GlobalMute.Prefix"),
            lang.text("SinkCommands.GlobalMute.Blocked")
        );
        Some(Delivery::to_player(sender.id(), notice))
    }
}
