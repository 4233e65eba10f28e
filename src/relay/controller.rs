//! Relay lifecycle and the operations exposed to the proxy side.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::common::messages::{ChatEvent, InboundMessage, RichContent};
use crate::common::report::ErrorReporter;
use crate::config::store::ConfigStore;
use crate::config::types::Config;
use crate::relay::adapter::ProxySideAdapter;
use crate::relay::gateway::{
    ConnectionState, Destination, GatewaySettings, OutboundGateway, PendingAction,
};
use crate::relay::listener::InboundListener;
use crate::relay::service::ChatService;

/// Ties the gateway, the inbound listener and the periodic tasks together.
pub struct RelayController {
    gateway: Arc<OutboundGateway>,
    config: ConfigStore,
    proxy: Arc<dyn ProxySideAdapter>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<InboundMessage>>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RelayController {
    pub fn new(
        service: Arc<dyn ChatService>,
        config: ConfigStore,
        proxy: Arc<dyn ProxySideAdapter>,
        reporter: Arc<dyn ErrorReporter>,
        inbound_rx: mpsc::UnboundedReceiver<InboundMessage>,
    ) -> Self {
        let settings = GatewaySettings::from_config(&config.current().discord);
        Self::with_settings(service, config, proxy, reporter, inbound_rx, settings)
    }

    pub fn with_settings(
        service: Arc<dyn ChatService>,
        config: ConfigStore,
        proxy: Arc<dyn ProxySideAdapter>,
        reporter: Arc<dyn ErrorReporter>,
        inbound_rx: mpsc::UnboundedReceiver<InboundMessage>,
        settings: GatewaySettings,
    ) -> Self {
        let gateway = OutboundGateway::new(service, config.clone(), proxy.clone(), reporter, settings);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            gateway: Arc::new(gateway),
            config,
            proxy,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.gateway.state()
    }

    /// Spawn the background tasks and start connecting.
    ///
    /// Returns without waiting for the connection; work issued meanwhile is queued.
    pub fn start(&self) {
        let Some(inbound_rx) = self.inbound_rx.lock().ok().and_then(|mut rx| rx.take()) else {
            debug!("Relay already started");
            return;
        };

        let mut tasks = Vec::new();

        let listener = InboundListener::new(self.config.clone(), self.proxy.clone());
        tasks.push(tokio::spawn(listener.run(inbound_rx, self.shutdown_tx.subscribe())));

        tasks.push(tokio::spawn(watch_reloads(
            self.gateway.clone(),
            self.config.subscribe(),
            self.shutdown_tx.subscribe(),
        )));

        if let Some(period) = self.config.current().discord.topic_update_interval() {
            tasks.push(tokio::spawn(tick_topic(
                self.gateway.clone(),
                period,
                self.shutdown_tx.subscribe(),
            )));
        }

        let gateway = self.gateway.clone();
        tasks.push(tokio::spawn(async move { gateway.start().await }));

        if let Ok(mut running) = self.tasks.lock() {
            running.extend(tasks);
        }
        info!("Relay started");
    }

    /// Push the online topic with the current player count.
    pub fn on_tick(&self) {
        self.gateway.enqueue_or_run(PendingAction::RefreshTopic);
    }

    pub fn update_presence(&self) {
        self.gateway.enqueue_or_run(PendingAction::UpdatePresence);
    }

    pub fn relay_from_proxy(&self, event: ChatEvent) {
        self.gateway.enqueue_or_run(PendingAction::Relay(event));
    }

    /// Post `text` to the private staff channel.
    pub fn relay_private(&self, text: impl Into<String>) {
        self.gateway.send_text(Destination::Private, text);
    }

    pub fn relay_rich(&self, content: RichContent) {
        self.gateway.send_rich(content);
    }

    pub fn set_topic(&self, topic: impl Into<String>) {
        self.gateway.update_channel_topic(topic);
    }

    /// Stop background tasks and shut the gateway down.
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        self.gateway.stop().await;

        let tasks = self
            .tasks
            .lock()
            .map(|mut tasks| std::mem::take(&mut *tasks))
            .unwrap_or_default();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Relay task ended abnormally: {}", e);
            }
        }
        info!("Relay stopped");
    }
}

/// Refresh the presence whenever the configuration is replaced.
async fn watch_reloads(
    gateway: Arc<OutboundGateway>,
    mut config_rx: watch::Receiver<Arc<Config>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = config_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Configuration changed, refreshing presence");
                gateway.enqueue_or_run(PendingAction::UpdatePresence);
            }
            _ = shutdown_rx.changed() => break,
        }
    }
}

async fn tick_topic(
    gateway: Arc<OutboundGateway>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => gateway.enqueue_or_run(PendingAction::RefreshTopic),
            _ = shutdown_rx.changed() => break,
        }
    }
}
