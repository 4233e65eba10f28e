//! Discord event handling.
//!
//! Converts gateway events into relay inputs: messages become
//! [`InboundMessage`]s on the ingress channel, the first `Ready` hands the
//! session context to whoever is waiting in `connect`.

use std::sync::Mutex;

use serenity::all::ChunkGuildFilter;
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::common::messages::InboundMessage;

/// Discord event handler.
pub struct RelayHandler {
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    ready_tx: Mutex<Option<oneshot::Sender<Context>>>,
}

impl RelayHandler {
    pub fn new(
        inbound_tx: mpsc::UnboundedSender<InboundMessage>,
        ready_tx: oneshot::Sender<Context>,
    ) -> Self {
        Self {
            inbound_tx,
            ready_tx: Mutex::new(Some(ready_tx)),
        }
    }
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn message(&self, _ctx: Context, msg: Message) {
        // Only handle guild (server) messages
        if msg.guild_id.is_none() {
            return;
        }

        let author_name = msg
            .member
            .as_ref()
            .and_then(|m| m.nick.clone())
            .unwrap_or_else(|| msg.author.display_name().to_string());

        let inbound = InboundMessage {
            channel_id: msg.channel_id.to_string(),
            author_name,
            author_is_bot: msg.author.bot,
            content: with_attachments(&msg),
        };

        if let Err(e) = self.inbound_tx.send(inbound) {
            debug!("Inbound channel closed, message dropped: {}", e);
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);

        // Large guilds only send online members up front; mention
        // resolution needs the whole member list in the cache.
        for guild in &ready.guilds {
            ctx.shard
                .chunk_guild(guild.id, None, false, ChunkGuildFilter::None, None);
        }

        let waiting = self.ready_tx.lock().ok().and_then(|mut tx| tx.take());
        if let Some(tx) = waiting {
            if tx.send(ctx).is_err() {
                warn!("Discord became ready after the connection attempt was abandoned");
            }
        }
    }
}

/// Message content followed by the URL of every attachment.
fn with_attachments(msg: &Message) -> String {
    let mut content = msg.content.trim().to_string();
    for attachment in &msg.attachments {
        if !content.is_empty() {
            content.push(' ');
        }
        content.push_str(&attachment.url);
    }
    content
}
