//! Boundary to the proxy network.

use crate::common::messages::ChatEvent;

/// What the relay needs from the proxy side.
pub trait ProxySideAdapter: Send + Sync {
    fn online_player_count(&self) -> usize;

    fn max_player_count(&self) -> usize;

    /// Broadcast a message that arrived from Discord to the proxy's players.
    fn dispatch_to_proxy_network(&self, event: ChatEvent);
}
