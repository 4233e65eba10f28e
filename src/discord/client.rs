//! Discord bot client.
//!
//! [`SerenityService`] implements [`ChatService`] on top of a serenity
//! client, hiding serenity details from the relay.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{
    ActivityData, ChannelId, CreateMessage, EditChannel, GatewayError, ModelError, ShardManager,
};
use serenity::http::{HttpBuilder, HttpError};
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::common::error::{ServiceError, ServiceResult};
use crate::common::messages::{InboundMessage, RichContent, RosterEntry};
use crate::discord::embed::{to_activity, to_embed, to_online_status};
use crate::discord::handler::RelayHandler;
use crate::relay::presence::Presence;
use crate::relay::service::ChatService;

/// How long `connect` waits for the gateway `Ready` event.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// A live gateway session.
#[derive(Clone)]
struct Session {
    ctx: Context,
    shard_manager: Arc<ShardManager>,
}

/// The running serenity client and the task that logs how it ended.
struct ClientTask {
    client: AbortHandle,
    watcher: JoinHandle<()>,
}

impl ClientTask {
    fn spawn(task: JoinHandle<serenity::Result<()>>) -> Self {
        let client = task.abort_handle();
        let watcher = tokio::spawn(async move {
            match task.await {
                Ok(Ok(())) => info!("Discord client disconnected normally"),
                Ok(Err(e)) => error!("Discord client error: {}", e),
                Err(e) if e.is_cancelled() => debug!("Discord client aborted"),
                Err(e) => error!("Discord client task failed: {}", e),
            }
        });
        Self { client, watcher }
    }

    /// Wait for the client to end on its own.
    async fn join(&mut self) {
        if let Err(e) = (&mut self.watcher).await {
            warn!("Discord client task ended abnormally: {}", e);
        }
    }

    /// Abort the client and wait until it is gone.
    async fn terminate(mut self) {
        self.client.abort();
        self.join().await;
    }
}

pub struct SerenityService {
    token: String,
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    session: RwLock<Option<Session>>,
    client_task: tokio::sync::Mutex<Option<ClientTask>>,
}

impl SerenityService {
    /// Messages received from Discord are pushed into `inbound_tx`.
    pub fn new(token: impl Into<String>, inbound_tx: mpsc::UnboundedSender<InboundMessage>) -> Self {
        Self {
            token: token.into(),
            inbound_tx,
            session: RwLock::new(None),
            client_task: tokio::sync::Mutex::new(None),
        }
    }

    fn session(&self) -> ServiceResult<Session> {
        self.session
            .read()
            .ok()
            .and_then(|session| session.clone())
            .ok_or(ServiceError::NotConnected)
    }

    fn take_session(&self) -> Option<Session> {
        self.session.write().ok().and_then(|mut session| session.take())
    }
}

async fn build_client(token: &str, handler: RelayHandler) -> ServiceResult<Client> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ServiceError::ConnectionFailed {
            message: e.to_string(),
        })?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    serenity::client::ClientBuilder::new_with_http(http, intents)
        .activity(ActivityData::watching("Starting Proxy..."))
        .event_handler(handler)
        .await
        .map_err(|e| ServiceError::ConnectionFailed {
            message: e.to_string(),
        })
}

#[async_trait]
impl ChatService for SerenityService {
    async fn connect(&self) -> ServiceResult<()> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let handler = RelayHandler::new(self.inbound_tx.clone(), ready_tx);
        let mut client = build_client(&self.token, handler).await?;
        let shard_manager = client.shard_manager.clone();

        let mut task = tokio::spawn(async move { client.start().await });

        let ctx = tokio::select! {
            ready = timeout(READY_TIMEOUT, ready_rx) => match ready {
                Ok(Ok(ctx)) => ctx,
                Ok(Err(_)) => {
                    task.abort();
                    return Err(ServiceError::ConnectionFailed {
                        message: "client stopped before becoming ready".to_string(),
                    });
                }
                Err(_) => {
                    task.abort();
                    return Err(ServiceError::ConnectionFailed {
                        message: format!("not ready after {:?}", READY_TIMEOUT),
                    });
                }
            },
            result = &mut task => {
                return Err(match result {
                    Ok(Err(e)) => classify_client_error(e),
                    Ok(Ok(())) => ServiceError::ConnectionFailed {
                        message: "client exited during startup".to_string(),
                    },
                    Err(e) => ServiceError::ConnectionFailed { message: e.to_string() },
                });
            }
        };

        if let Ok(mut session) = self.session.write() {
            *session = Some(Session { ctx, shard_manager });
        }
        *self.client_task.lock().await = Some(ClientTask::spawn(task));
        Ok(())
    }

    async fn channel_members(&self, channel_id: &str) -> ServiceResult<Vec<RosterEntry>> {
        let session = self.session()?;
        let id = parse_channel_id(channel_id)?;

        let channel = id
            .to_channel(&session.ctx.http)
            .await
            .map_err(|e| classify_request_error(e, channel_id))?;
        let Some(channel) = channel.guild() else {
            return Err(ServiceError::ChannelNotFound {
                channel_id: channel_id.to_string(),
            });
        };

        let members = channel
            .members(&session.ctx.cache)
            .map_err(|e| classify_request_error(e, channel_id))?;

        Ok(members
            .iter()
            .map(|member| RosterEntry {
                id: member.user.id.get(),
                nickname: member.nick.clone(),
                effective_name: member.display_name().to_string(),
            })
            .collect())
    }

    async fn send_text(&self, channel_id: &str, text: &str) -> ServiceResult<()> {
        let session = self.session()?;
        let id = parse_channel_id(channel_id)?;

        id.say(&session.ctx.http, text)
            .await
            .map_err(|e| classify_request_error(e, channel_id))?;
        debug!("Proxy -> Discord [{}]: {}", channel_id, text);
        Ok(())
    }

    async fn send_rich(&self, channel_id: &str, content: &RichContent) -> ServiceResult<()> {
        let session = self.session()?;
        let id = parse_channel_id(channel_id)?;

        id.send_message(&session.ctx.http, CreateMessage::new().embed(to_embed(content)))
            .await
            .map_err(|e| classify_request_error(e, channel_id))?;
        Ok(())
    }

    async fn set_topic(&self, channel_id: &str, topic: &str) -> ServiceResult<()> {
        let session = self.session()?;
        let id = parse_channel_id(channel_id)?;

        id.edit(&session.ctx.http, EditChannel::new().topic(topic))
            .await
            .map_err(|e| classify_request_error(e, channel_id))?;
        Ok(())
    }

    async fn set_presence(&self, presence: &Presence) -> ServiceResult<()> {
        let session = self.session()?;
        session
            .ctx
            .set_presence(Some(to_activity(presence)), to_online_status(presence.status));
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(session) = self.take_session() {
            info!("Initiating graceful Discord shutdown...");
            session.shard_manager.shutdown_all().await;
        }
        // The task stays in place until it has finished, so a forced
        // disconnect after a timed out wait can still reach it.
        let mut running = self.client_task.lock().await;
        if let Some(task) = running.as_mut() {
            task.join().await;
        }
        *running = None;
        info!("Discord shutdown complete");
    }

    async fn disconnect_now(&self) {
        self.take_session();
        let running = self.client_task.lock().await.take();
        if let Some(task) = running {
            task.terminate().await;
        }
        warn!("Discord client terminated");
    }
}

fn parse_channel_id(channel_id: &str) -> ServiceResult<ChannelId> {
    channel_id
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
        .ok_or_else(|| ServiceError::ChannelNotFound {
            channel_id: channel_id.to_string(),
        })
}

fn classify_request_error(error: serenity::Error, channel_id: &str) -> ServiceError {
    match &error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            classify_status(response.status_code.as_u16(), channel_id, error.to_string())
        }
        serenity::Error::Model(ModelError::InvalidPermissions { .. }) => {
            ServiceError::PermissionDenied {
                message: error.to_string(),
            }
        }
        _ => ServiceError::Request {
            message: error.to_string(),
        },
    }
}

fn classify_status(status: u16, channel_id: &str, message: String) -> ServiceError {
    match status {
        403 => ServiceError::PermissionDenied { message },
        404 => ServiceError::ChannelNotFound {
            channel_id: channel_id.to_string(),
        },
        _ => ServiceError::Request { message },
    }
}

/// A rejected token or intent will be rejected again.
fn classify_client_error(error: serenity::Error) -> ServiceError {
    match &error {
        serenity::Error::Gateway(
            GatewayError::InvalidAuthentication | GatewayError::DisallowedGatewayIntents,
        ) => ServiceError::PermissionDenied {
            message: error.to_string(),
        },
        _ => ServiceError::ConnectionFailed {
            message: error.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_id() {
        assert_eq!(parse_channel_id(" 1234 ").unwrap().get(), 1234);
        assert!(matches!(
            parse_channel_id("general"),
            Err(ServiceError::ChannelNotFound { .. })
        ));
        assert!(parse_channel_id("0").is_err());
        assert!(parse_channel_id("").is_err());
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(403, "1", "forbidden".to_string()),
            ServiceError::PermissionDenied { .. }
        ));
        assert!(classify_status(404, "1", "missing".to_string()).is_unreachable());
        assert!(matches!(
            classify_status(500, "1", "boom".to_string()),
            ServiceError::Request { .. }
        ));
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = SerenityService::new("token", tx);

        assert!(matches!(
            service.send_text("1", "hi").await,
            Err(ServiceError::NotConnected)
        ));
        assert!(matches!(
            service.channel_members("1").await,
            Err(ServiceError::NotConnected)
        ));
        // Nothing to tear down.
        service.disconnect().await;
        service.disconnect_now().await;
    }

    /// A client task that never finishes; dropping it fires `dropped`.
    fn stuck_client() -> (JoinHandle<serenity::Result<()>>, oneshot::Receiver<()>) {
        let (guard, dropped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<serenity::Result<()>>().await
        });
        (task, dropped)
    }

    #[tokio::test]
    async fn test_terminate_aborts_client() {
        let (task, dropped) = stuck_client();

        ClientTask::spawn(task).terminate().await;

        assert!(dropped.await.is_err());
    }

    #[tokio::test]
    async fn test_forced_disconnect_after_timed_out_wait() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let service = SerenityService::new("token", tx);
        let (task, dropped) = stuck_client();
        *service.client_task.lock().await = Some(ClientTask::spawn(task));

        tokio_test::assert_err!(timeout(Duration::from_millis(50), service.disconnect()).await);
        service.disconnect_now().await;

        assert!(dropped.await.is_err());
        assert!(service.client_task.lock().await.is_none());
    }
}
