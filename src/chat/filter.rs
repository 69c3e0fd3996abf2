//! Per-recipient decisions for local (non-channel) chat.
//!
//! Local chat is heard inside a box around the sender: every axis is checked
//! on its own against the radius, boundary included. This is deliberately not
//! a Euclidean distance. Players outside the box may still read the line as a
//! spy, marked with the spy prefix.

use super::host::{Location, Player};

pub const PERM_SPY: &str = "sinkchat.spy";
pub const PERM_SPY_ALL: &str = "sinkchat.spy.all";
pub const PERM_SPY_BYPASS: &str = "sinkchat.spy.bypass";

/// What a single recipient gets for one local chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Within range: the plain line.
    Plain,
    /// Out of range but spying: the spy-prefixed line.
    Spy,
    /// Nothing.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecipientFilter {
    radius: f64,
}

impl RecipientFilter {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn in_range(&self, sender: Location, recipient: Location) -> bool {
        (sender.x - recipient.x).abs() <= self.radius
            && (sender.y - recipient.y).abs() <= self.radius
            && (sender.z - recipient.z).abs() <= self.radius
    }

    /// Spy rule: `(spy.all || (spy && !sender bypass)) && spy mode on`.
    pub fn can_spy(&self, sender: &dyn Player, recipient: &dyn Player, spy_enabled: bool) -> bool {
        let spy_all = recipient.has_permission(PERM_SPY_ALL);
        let can_spy = recipient.has_permission(PERM_SPY) && !sender.has_permission(PERM_SPY_BYPASS);
        (spy_all || can_spy) && spy_enabled
    }

    /// Range wins over spying, so a recipient never gets both copies.
    pub fn decide(&self, sender: &dyn Player, recipient: &dyn Player, spy_enabled: bool) -> Decision {
        if self.in_range(sender.location(), recipient.location()) {
            Decision::Plain
        } else if self.can_spy(sender, recipient, spy_enabled) {
            Decision::Spy
        } else {
            Decision::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_not_sphere() {
        let filter = RecipientFilter::new(10.0);
        let origin = Location::new(0.0, 0.0, 0.0);
        // Euclidean distance ~17.3, still inside the box
        assert!(filter.in_range(origin, Location::new(10.0, 10.0, 10.0)));
        assert!(!filter.in_range(origin, Location::new(10.0, 10.5, 0.0)));
    }

    #[test]
    fn boundary_is_inclusive_per_axis() {
        let filter = RecipientFilter::new(5.0);
        let origin = Location::new(100.0, 64.0, -20.0);
        for (dx, dy, dz) in [(5.0, 0.0, 0.0), (0.0, -5.0, 0.0), (0.0, 0.0, 5.0)] {
            let at = Location::new(origin.x + dx, origin.y + dy, origin.z + dz);
            assert!(filter.in_range(origin, at), "({dx},{dy},{dz}) should be in range");
        }
        for (dx, dy, dz) in [(6.0, 0.0, 0.0), (0.0, 6.0, 0.0), (0.0, 0.0, -6.0)] {
            let at = Location::new(origin.x + dx, origin.y + dy, origin.z + dz);
            assert!(!filter.in_range(origin, at), "({dx},{dy},{dz}) should be out of range");
        }
    }
}
