//! Outbound side of the relay: the Discord connection state machine.
//!
//! Every outward-facing operation is a [`PendingAction`] handed to
//! [`OutboundGateway::enqueue_or_run`]. Before the connection is ready the
//! actions wait in a FIFO queue; once ready they go to a single dispatcher
//! task, so everything reaches Discord in the order it was issued.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use backon::BackoffBuilder;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::common::error::{ServiceError, ServiceResult};
use crate::common::messages::{ChatEvent, RichContent};
use crate::common::report::ErrorReporter;
use crate::config::store::ConfigStore;
use crate::config::types::DiscordConfig;
use crate::relay::adapter::ProxySideAdapter;
use crate::relay::formatter::{FormatContext, MessageFormatter};
use crate::relay::mention::resolve_mentions;
use crate::relay::presence::Presence;
use crate::relay::sanitizer::{sanitize, sanitize_rich};
use crate::relay::service::ChatService;

pub const CHANNEL_ERROR_MESSAGE: &str = "There was an error sending a message to Discord. \
     Does the channel exist? Does the bot have access to the channel?";

pub const TOPIC_PERMISSION_MESSAGE: &str = "No permission to edit channel topic. \
     If you don't want the channel topics to be updated, simply ignore this message. \
     Otherwise, please give the Discord bot the MANAGE_CHANNELS permission. \
     This message will only be sent once per restart.";

pub const TOPIC_CHANNEL_ERROR_MESSAGE: &str = "There was an error updating the Discord channel topic. \
     Does the channel exist? Does the bot have access to the channel?";

pub const STATUS_ENABLED_COLOR: u32 = 0x00FF00;
pub const STATUS_DISABLED_COLOR: u32 = 0xFF0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    ShuttingDown,
}

/// Which configured channel a plain text message goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The bridge channel (`discord.channel-id`).
    Bridge,
    /// The staff channel (`discord.private-channel-id`).
    Private,
}

/// Deferred outbound work.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    /// Format a proxy chat event and post it to the bridge channel.
    Relay(ChatEvent),
    SendText(Destination, String),
    SendRich(RichContent),
    /// "Proxy enabled" / "Proxy disabled" notification.
    ProxyStatus(bool),
    SetTopic(String),
    /// Recompute the online topic from the current player count.
    RefreshTopic,
    UpdatePresence,
}

/// Timing knobs for connecting and shutting down.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub shutdown_timeout: Duration,
    /// Retries after the first failed connection attempt, `None` for no limit.
    pub connect_retries: Option<usize>,
    pub min_retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(10),
            connect_retries: None,
            min_retry_delay: Duration::from_secs(5),
            max_retry_delay: Duration::from_secs(60),
        }
    }
}

impl GatewaySettings {
    pub fn from_config(config: &DiscordConfig) -> Self {
        Self {
            shutdown_timeout: config.shutdown_timeout(),
            connect_retries: config.connect_retries,
            ..Default::default()
        }
    }

    /// Exponential backoff with jitter, bounded by `connect_retries` when set.
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        let builder = backon::ExponentialBuilder::default()
            .with_min_delay(self.min_retry_delay)
            .with_max_delay(self.max_retry_delay)
            .with_factor(2.0)
            .with_jitter();

        let builder = match self.connect_retries {
            Some(retries) => builder.with_max_times(retries),
            None => builder.without_max_times(),
        };
        builder.build()
    }
}

struct Shared {
    state: ConnectionState,
    queue: VecDeque<PendingAction>,
    /// Dispatcher input, present while Ready.
    outbox: Option<mpsc::UnboundedSender<PendingAction>>,
    worker: Option<JoinHandle<()>>,
    /// No usable token or connecting gave up: everything is dropped from now on.
    disabled: bool,
    /// `stop()` was called; the gateway never starts again.
    stopped: bool,
}

/// Owns the Discord connection and the outbound queue.
pub struct OutboundGateway {
    outbound: Arc<Outbound>,
    settings: GatewaySettings,
    shared: Mutex<Shared>,
    /// Flipped by `stop()` to cut a retry delay short.
    stop_tx: watch::Sender<bool>,
}

impl OutboundGateway {
    pub fn new(
        service: Arc<dyn ChatService>,
        config: ConfigStore,
        proxy: Arc<dyn ProxySideAdapter>,
        reporter: Arc<dyn ErrorReporter>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            outbound: Arc::new(Outbound {
                service,
                config,
                proxy,
                reporter,
                topic_warning_sent: AtomicBool::new(false),
            }),
            settings,
            shared: Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                queue: VecDeque::new(),
                outbox: None,
                worker: None,
                disabled: false,
                stopped: false,
            }),
            stop_tx: watch::channel(false).0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Number of actions waiting for the connection.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Connect and release queued work.
    ///
    /// Does nothing unless the gateway is Disconnected and has never been stopped.
    pub async fn start(&self) {
        let config = self.outbound.config.current();

        {
            let mut shared = self.lock();
            if shared.state != ConnectionState::Disconnected || shared.stopped || shared.disabled {
                debug!("Gateway start ignored in state {:?}", shared.state);
                return;
            }
            if !config.discord.is_active() {
                shared.disabled = true;
                let dropped = shared.queue.len();
                shared.queue.clear();
                info!("Discord relay disabled, no bot token configured");
                if dropped > 0 {
                    debug!("Dropped {} queued Discord actions", dropped);
                }
                return;
            }
            shared.state = ConnectionState::Connecting;
        }

        if let Err(e) = self.connect().await {
            let dropped = {
                let mut shared = self.lock();
                shared.state = ConnectionState::Disconnected;
                if shared.stopped {
                    debug!("Connection attempt ended after stop: {}", e);
                    return;
                }
                shared.disabled = true;
                let dropped = shared.queue.len();
                shared.queue.clear();
                dropped
            };
            self.outbound.reporter.report(&format!(
                "Failed to connect to Discord, relay disabled: {}",
                e
            ));
            if dropped > 0 {
                debug!("Dropped {} queued Discord actions", dropped);
            }
            return;
        }

        let stopped_while_connecting = {
            let mut shared = self.lock();
            if shared.stopped {
                true
            } else {
                let (tx, rx) = mpsc::unbounded_channel();
                let queued = shared.queue.drain(..).collect::<Vec<_>>();
                let count = queued.len();
                std::iter::once(PendingAction::ProxyStatus(true))
                    .chain(queued)
                    .chain([PendingAction::UpdatePresence, PendingAction::RefreshTopic])
                    .for_each(|action| {
                        // The receiver is alive until the worker below exits.
                        let _ = tx.send(action);
                    });
                shared.worker = Some(tokio::spawn(run_dispatcher(Arc::clone(&self.outbound), rx)));
                shared.outbox = Some(tx);
                shared.state = ConnectionState::Ready;
                info!("Discord relay ready, released {} queued actions", count);
                false
            }
        };

        if stopped_while_connecting {
            info!("Relay stopped while connecting, closing Discord session");
            self.outbound.service.disconnect().await;
            self.lock().state = ConnectionState::Disconnected;
        }
    }

    /// Run `action` now if ready, queue it if not yet connected, drop it otherwise.
    ///
    /// Topic and presence refreshes are not queued: becoming Ready runs both.
    pub fn enqueue_or_run(&self, action: PendingAction) {
        let mut shared = self.lock();
        if shared.disabled || shared.stopped {
            debug!("Discord relay not running, dropping {:?}", action);
            return;
        }

        match shared.state {
            ConnectionState::Ready => {
                let closed = shared
                    .outbox
                    .as_ref()
                    .map_or(true, |tx| tx.send(action).is_err());
                if closed {
                    debug!("Outbound dispatcher closed, action dropped");
                }
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => match action {
                PendingAction::RefreshTopic | PendingAction::UpdatePresence => {}
                action => shared.queue.push_back(action),
            },
            ConnectionState::ShuttingDown => {
                debug!("Discord relay shutting down, dropping {:?}", action);
            }
        }
    }

    pub fn send_text(&self, destination: Destination, text: impl Into<String>) {
        self.enqueue_or_run(PendingAction::SendText(destination, text.into()));
    }

    pub fn send_rich(&self, content: RichContent) {
        self.enqueue_or_run(PendingAction::SendRich(content));
    }

    pub fn update_channel_topic(&self, topic: impl Into<String>) {
        self.enqueue_or_run(PendingAction::SetTopic(topic.into()));
    }

    /// Announce shutdown, drain the dispatcher and disconnect.
    ///
    /// Waits up to `shutdown_timeout` for a graceful disconnect, then forces it.
    pub async fn stop(&self) {
        self.stop_tx.send_replace(true);
        let (outbox, mut worker) = {
            let mut shared = self.lock();
            shared.stopped = true;
            match shared.state {
                ConnectionState::Disconnected => {
                    shared.queue.clear();
                    debug!("Gateway stop: not connected");
                    return;
                }
                ConnectionState::Connecting => {
                    shared.queue.clear();
                    info!("Gateway stop requested while connecting");
                    return;
                }
                ConnectionState::ShuttingDown => return,
                ConnectionState::Ready => {}
            }
            shared.state = ConnectionState::ShuttingDown;
            (shared.outbox.take(), shared.worker.take())
        };

        if let Some(tx) = outbox {
            let offline = self.outbound.config.current().topic.offline.clone();
            let _ = tx.send(PendingAction::ProxyStatus(false));
            let _ = tx.send(PendingAction::SetTopic(offline));
        }

        let grace = self.settings.shutdown_timeout;
        let graceful = timeout(grace, async {
            if let Some(handle) = worker.as_mut() {
                if let Err(e) = handle.await {
                    warn!("Outbound dispatcher ended abnormally: {}", e);
                }
            }
            self.outbound.service.disconnect().await;
        })
        .await;

        if graceful.is_err() {
            warn!("Discord shutdown exceeded {:?}, forcing disconnect", grace);
            if let Some(handle) = &worker {
                handle.abort();
            }
            self.outbound.service.disconnect_now().await;
        }

        self.lock().state = ConnectionState::Disconnected;
        info!("Discord relay stopped");
    }

    async fn connect(&self) -> ServiceResult<()> {
        let mut backoff = self.settings.backoff();
        let mut stop_rx = self.stop_tx.subscribe();

        loop {
            info!("Connecting to Discord...");
            let error = match self.outbound.service.connect().await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            let stopped = self.lock().stopped;
            if stopped || !error.is_retryable() {
                return Err(error);
            }
            match backoff.next() {
                Some(delay) => {
                    warn!(
                        "Discord connection failed: {}. Retrying in {:.1}s...",
                        error,
                        delay.as_secs_f64()
                    );
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = stop_rx.wait_for(|stopped| *stopped) => return Err(error),
                    }
                }
                None => return Err(error),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn run_dispatcher(outbound: Arc<Outbound>, mut rx: mpsc::UnboundedReceiver<PendingAction>) {
    while let Some(action) = rx.recv().await {
        outbound.execute(action).await;
    }
    debug!("Outbound dispatcher finished");
}

/// Executes actions against the chat service. Only the dispatcher calls it.
struct Outbound {
    service: Arc<dyn ChatService>,
    config: ConfigStore,
    proxy: Arc<dyn ProxySideAdapter>,
    reporter: Arc<dyn ErrorReporter>,
    topic_warning_sent: AtomicBool,
}

impl Outbound {
    async fn execute(&self, action: PendingAction) {
        let config = self.config.current();

        match action {
            PendingAction::Relay(event) => {
                let ctx = FormatContext::new(event.sender_display_name(), event.raw_text())
                    .with_server(event.server_name().unwrap_or_default())
                    .with_counts(self.proxy.online_player_count(), self.proxy.max_player_count());
                let text = MessageFormatter::new(&config.messages.proxy_to_discord).format(&ctx);
                self.send_to_channel(&config.discord.channel_id, &text).await;
            }
            PendingAction::SendText(Destination::Bridge, text) => {
                self.send_to_channel(&config.discord.channel_id, &text).await;
            }
            PendingAction::SendText(Destination::Private, text) => {
                if config.discord.private_channel_id.trim().is_empty() {
                    debug!("No private channel configured, message dropped");
                    return;
                }
                self.send_to_channel(&config.discord.private_channel_id, &text).await;
            }
            PendingAction::SendRich(content) => {
                self.send_rich(&config.discord.channel_id, content).await;
            }
            PendingAction::ProxyStatus(enabled) => {
                if !config.proxy_status.enabled {
                    return;
                }
                let content = if enabled {
                    RichContent::new()
                        .title(&config.proxy_status.module_enabled)
                        .color(STATUS_ENABLED_COLOR)
                } else {
                    RichContent::new()
                        .title(&config.proxy_status.module_disabled)
                        .color(STATUS_DISABLED_COLOR)
                };
                self.send_rich(&config.discord.channel_id, content).await;
            }
            PendingAction::SetTopic(topic) => {
                self.update_channel_topic(&config.discord.channel_id, &topic).await;
            }
            PendingAction::RefreshTopic => {
                let ctx = FormatContext::counts(
                    self.proxy.online_player_count(),
                    self.proxy.max_player_count(),
                );
                let topic = MessageFormatter::new(&config.topic.online).format(&ctx);
                self.update_channel_topic(&config.discord.channel_id, &topic).await;
            }
            PendingAction::UpdatePresence => {
                let presence = Presence::from_config(
                    &config.presence,
                    self.proxy.online_player_count(),
                    self.proxy.max_player_count(),
                );
                if let Err(e) = self.service.set_presence(&presence).await {
                    warn!("Failed to update Discord presence: {}", e);
                }
            }
        }
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) {
        let text = sanitize(text);

        let roster = match self.service.channel_members(channel_id).await {
            Ok(roster) => roster,
            Err(e) if e.is_unreachable() => {
                self.reporter.report(CHANNEL_ERROR_MESSAGE);
                return;
            }
            Err(e) => {
                warn!("Could not fetch members of {}, mentions left as text: {}", channel_id, e);
                Vec::new()
            }
        };

        let text = resolve_mentions(&text, &roster);
        if text.is_empty() {
            debug!("Nothing left to send after sanitizing");
            return;
        }

        if let Err(e) = self.service.send_text(channel_id, &text).await {
            self.report_send_failure(e);
        }
    }

    async fn send_rich(&self, channel_id: &str, content: RichContent) {
        let content = sanitize_rich(content);
        if let Err(e) = self.service.send_rich(channel_id, &content).await {
            self.report_send_failure(e);
        }
    }

    async fn update_channel_topic(&self, channel_id: &str, topic: &str) {
        match self.service.set_topic(channel_id, topic).await {
            Ok(()) => debug!("Channel topic set to {:?}", topic),
            Err(ServiceError::PermissionDenied { .. }) => {
                if !self.topic_warning_sent.swap(true, Ordering::SeqCst) {
                    self.reporter.report(TOPIC_PERMISSION_MESSAGE);
                }
            }
            Err(e) if e.is_unreachable() => self.reporter.report(TOPIC_CHANNEL_ERROR_MESSAGE),
            Err(e) => warn!("Failed to update channel topic: {}", e),
        }
    }

    fn report_send_failure(&self, error: ServiceError) {
        if error.is_unreachable() {
            self.reporter.report(CHANNEL_ERROR_MESSAGE);
        } else {
            warn!("Failed to send message to Discord: {}", error);
        }
    }
}
