//! Dispatch-character registry.
//!
//! Built once at start-up by a single thread, then frozen behind an `Arc` and
//! read concurrently by every chat event. There is no lock: callers must
//! finish all `register` calls before sharing the registry.

use std::sync::Arc;

use log::{error, info};

use super::channel::Channel;
use super::errors::ChatError;

#[derive(Debug, Default)]
pub struct ChannelRegistry {
    // Insertion order doubles as scan order for the dispatcher.
    channels: Vec<Arc<Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a channel to its dispatch character.
    ///
    /// Re-registering the same instance is a no-op. A different channel on an
    /// already bound character, or under an already used name, is rejected and
    /// the earlier registration stays in force.
    pub fn register(&mut self, channel: Arc<Channel>) -> Result<Arc<Channel>, ChatError> {
        if let Some(existing) = self.resolve(channel.call_char()) {
            if Arc::ptr_eq(existing, &channel) {
                return Ok(channel);
            }
            return Err(ChatError::DuplicatePrefix {
                prefix: channel.call_char(),
                existing: existing.name().to_string(),
            });
        }
        if self.by_name(channel.name()).is_some() {
            return Err(ChatError::DuplicateName(channel.name().to_string()));
        }
        info!(
            "registered channel {} ({}) on '{}'",
            channel.name(),
            channel.kind().as_str(),
            channel.call_char()
        );
        self.channels.push(channel.clone());
        Ok(channel)
    }

    /// Register a batch, logging and collecting rejections instead of stopping.
    pub fn register_all(&mut self, channels: impl IntoIterator<Item = Channel>) -> Vec<ChatError> {
        let mut rejected = Vec::new();
        for channel in channels {
            if let Err(e) = self.register(Arc::new(channel)) {
                error!("channel configuration error: {}", e);
                rejected.push(e);
            }
        }
        rejected
    }

    pub fn resolve(&self, call_char: char) -> Option<&Arc<Channel>> {
        self.channels.iter().find(|c| c.call_char() == call_char)
    }

    /// Case-insensitive lookup for user commands.
    pub fn by_name(&self, name: &str) -> Option<&Arc<Channel>> {
        self.channels
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Registered dispatch characters in registration order.
    pub fn prefixes(&self) -> Vec<char> {
        self.channels.iter().map(|c| c.call_char()).collect()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Arc<Channel>> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::channel::ChannelKind;

    #[test]
    fn same_instance_registers_twice() {
        let mut registry = ChannelRegistry::new();
        let shout = Arc::new(Channel::new("Shout", ChannelKind::Shout, '!', "[Shout]"));
        registry.register(shout.clone()).unwrap();
        registry.register(shout).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut registry = ChannelRegistry::new();
        registry
            .register(Arc::new(Channel::new("Help", ChannelKind::Help, '?', "[Help]")))
            .unwrap();
        let err = registry
            .register(Arc::new(Channel::new("help", ChannelKind::Help, '+', "[Help]")))
            .unwrap_err();
        assert!(matches!(err, ChatError::DuplicateName(_)));
    }
}
