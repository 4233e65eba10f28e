//! Inbound side of the relay: Discord messages to the proxy network.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::common::messages::{ChatEvent, InboundMessage};
use crate::config::store::ConfigStore;
use crate::relay::adapter::ProxySideAdapter;

/// Filters Discord messages and hands the rest to the proxy side unchanged.
pub struct InboundListener {
    config: ConfigStore,
    proxy: Arc<dyn ProxySideAdapter>,
}

impl InboundListener {
    pub fn new(config: ConfigStore, proxy: Arc<dyn ProxySideAdapter>) -> Self {
        Self { config, proxy }
    }

    /// Forward `message` if it was posted by a person in the bridge channel.
    ///
    /// Returns whether the message reached the proxy side. Bot authors are
    /// dropped, which also keeps relayed messages from echoing back.
    pub fn on_external_message(&self, message: InboundMessage) -> bool {
        let config = self.config.current();

        if !message
            .channel_id
            .trim()
            .eq_ignore_ascii_case(config.discord.channel_id.trim())
        {
            return false;
        }
        if message.author_is_bot {
            debug!("Ignoring bot message from {}", message.author_name);
            return false;
        }
        if message.content.trim().is_empty() {
            debug!("Ignoring empty message from {}", message.author_name);
            return false;
        }

        let event = ChatEvent::from_external(message.channel_id, message.author_name, message.content);
        self.proxy.dispatch_to_proxy_network(event);
        true
    }

    /// Consume the ingress channel until it closes or shutdown is signalled.
    pub async fn run(
        self,
        mut inbound_rx: mpsc::UnboundedReceiver<InboundMessage>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                message = inbound_rx.recv() => match message {
                    Some(message) => {
                        self.on_external_message(message);
                    }
                    None => break,
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Inbound listener stopped");
    }
}
