use super::host::{Localizer, PlayerDirectory, TownProvider};
use crate::storage::PlayerStore;

/// Read-only view of the collaborators a routing decision needs.
///
/// Built per event by [`crate::chat::ChatServer`]; channels and the dispatcher
/// only ever borrow it.
#[derive(Clone, Copy)]
pub struct ChatContext<'a> {
    pub directory: &'a dyn PlayerDirectory,
    pub lang: &'a dyn Localizer,
    pub store: &'a PlayerStore,
    pub towns: Option<&'a dyn TownProvider>,
}
