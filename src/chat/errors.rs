use thiserror::Error;

/// Errors raised by the chat routing core and its persistence layer.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The dispatch character is already bound to another channel.
    #[error("dispatch prefix '{prefix}' is already bound to channel {existing}")]
    DuplicatePrefix { prefix: char, existing: String },

    /// A channel with the same name (case-insensitive) is already registered.
    #[error("channel name already registered: {0}")]
    DuplicateName(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// A single recipient could not be reached (disconnected, closed socket).
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },

    /// Player configuration could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ChatError {
    pub fn delivery(recipient: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        ChatError::Delivery {
            recipient: recipient.to_string(),
            reason: reason.to_string(),
        }
    }
}
