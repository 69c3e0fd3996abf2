//! Delivery plans and the adapter that executes them against the host.
//!
//! Routing code never calls `send_message` itself. It returns a list of
//! [`Delivery`] values and [`deliver_all`] applies them, isolating failures
//! per recipient.

use log::{debug, warn};

use super::host::{PlayerDirectory, PlayerId};
use crate::logutil::escape_log;
use crate::metrics::ChatMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    Player(PlayerId),
    Console,
}

/// One line of text addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: Recipient,
    pub text: String,
}

impl Delivery {
    pub fn to_player(id: PlayerId, text: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::Player(id),
            text: text.into(),
        }
    }

    pub fn to_console(text: impl Into<String>) -> Self {
        Self {
            recipient: Recipient::Console,
            text: text.into(),
        }
    }
}

/// Send every delivery, best effort. Returns how many reached their recipient.
///
/// A recipient that went offline between planning and sending, or whose
/// session rejects the write, is logged and skipped.
pub fn deliver_all(
    deliveries: &[Delivery],
    directory: &dyn PlayerDirectory,
    metrics: &ChatMetrics,
) -> usize {
    let mut delivered = 0;
    for delivery in deliveries {
        match delivery.recipient {
            Recipient::Console => {
                directory.send_console(&delivery.text);
                delivered += 1;
            }
            Recipient::Player(id) => {
                let Some(player) = directory.player(id) else {
                    debug!("recipient {} vanished before delivery", id);
                    metrics.inc_delivery_failures();
                    continue;
                };
                if !player.is_online() {
                    debug!("recipient {} went offline before delivery", player.name());
                    metrics.inc_delivery_failures();
                    continue;
                }
                match player.send_message(&delivery.text) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        warn!(
                            "delivery to {} failed: {} (line='{}')",
                            player.name(),
                            e,
                            escape_log(&delivery.text)
                        );
                        metrics.inc_delivery_failures();
                    }
                }
            }
        }
    }
    delivered
}
