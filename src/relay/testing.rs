//! Test doubles shared by the relay tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::common::error::{ServiceError, ServiceResult};
use crate::common::messages::{ChatEvent, RichContent, RosterEntry};
use crate::common::report::ErrorReporter;
use crate::config::parser::load_config_str;
use crate::config::types::Config;
use crate::relay::adapter::ProxySideAdapter;
use crate::relay::presence::Presence;
use crate::relay::service::ChatService;

/// A call made against [`MockService`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Members(String),
    Text(String, String),
    Rich(String, RichContent),
    Topic(String, String),
    Presence(Presence),
    Disconnect,
    DisconnectNow,
}

/// Records every call; failure modes are opted into with the builder methods.
#[derive(Default)]
pub struct MockService {
    calls: Mutex<Vec<Call>>,
    connect_failures: AtomicUsize,
    missing_channels: HashSet<String>,
    denied_channels: HashSet<String>,
    deny_topic: bool,
    hang_disconnect: bool,
    reject_token: bool,
    hold_connect: AtomicBool,
    connect_gate: Notify,
    roster: Vec<RosterEntry>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` connection attempts.
    pub fn failing_connects(self, count: usize) -> Self {
        self.connect_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn missing_channel(mut self, channel_id: &str) -> Self {
        self.missing_channels.insert(channel_id.to_string());
        self
    }

    /// Reject every request against `channel_id` as forbidden.
    pub fn deny_channel(mut self, channel_id: &str) -> Self {
        self.denied_channels.insert(channel_id.to_string());
        self
    }

    pub fn deny_topic(mut self) -> Self {
        self.deny_topic = true;
        self
    }

    /// Fail every connection attempt the way an invalid token does.
    pub fn reject_token(mut self) -> Self {
        self.reject_token = true;
        self
    }

    pub fn hanging_disconnect(mut self) -> Self {
        self.hang_disconnect = true;
        self
    }

    /// Block `connect` until [`MockService::release_connect`] is called.
    pub fn hold_connect(self) -> Self {
        self.hold_connect.store(true, Ordering::SeqCst);
        self
    }

    pub fn release_connect(&self) {
        self.hold_connect.store(false, Ordering::SeqCst);
        self.connect_gate.notify_one();
    }

    pub fn with_roster(mut self, roster: Vec<RosterEntry>) -> Self {
        self.roster = roster;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_channel(&self, channel_id: &str) -> ServiceResult<()> {
        if self.missing_channels.contains(channel_id) {
            Err(ServiceError::ChannelNotFound {
                channel_id: channel_id.to_string(),
            })
        } else if self.denied_channels.contains(channel_id) {
            Err(ServiceError::PermissionDenied {
                message: format!("missing access to {}", channel_id),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatService for MockService {
    async fn connect(&self) -> ServiceResult<()> {
        self.record(Call::Connect);
        if self.hold_connect.load(Ordering::SeqCst) {
            self.connect_gate.notified().await;
        }
        if self.reject_token {
            return Err(ServiceError::PermissionDenied {
                message: "invalid token".to_string(),
            });
        }
        let remaining = self.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.connect_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ServiceError::ConnectionFailed {
                message: "gateway unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn channel_members(&self, channel_id: &str) -> ServiceResult<Vec<RosterEntry>> {
        self.record(Call::Members(channel_id.to_string()));
        self.check_channel(channel_id)?;
        Ok(self.roster.clone())
    }

    async fn send_text(&self, channel_id: &str, text: &str) -> ServiceResult<()> {
        self.check_channel(channel_id)?;
        self.record(Call::Text(channel_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_rich(&self, channel_id: &str, content: &RichContent) -> ServiceResult<()> {
        self.check_channel(channel_id)?;
        self.record(Call::Rich(channel_id.to_string(), content.clone()));
        Ok(())
    }

    async fn set_topic(&self, channel_id: &str, topic: &str) -> ServiceResult<()> {
        self.record(Call::Topic(channel_id.to_string(), topic.to_string()));
        self.check_channel(channel_id)?;
        if self.deny_topic {
            return Err(ServiceError::PermissionDenied {
                message: "MANAGE_CHANNELS".to_string(),
            });
        }
        Ok(())
    }

    async fn set_presence(&self, presence: &Presence) -> ServiceResult<()> {
        self.record(Call::Presence(presence.clone()));
        Ok(())
    }

    async fn disconnect(&self) {
        self.record(Call::Disconnect);
        if self.hang_disconnect {
            std::future::pending::<()>().await;
        }
    }

    async fn disconnect_now(&self) {
        self.record(Call::DisconnectNow);
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self, message: &str) -> usize {
        self.messages.lock().unwrap().iter().filter(|m| *m == message).count()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Proxy with settable player counts that records dispatched events.
pub struct FixedProxy {
    online: AtomicUsize,
    max: usize,
    received: Mutex<Vec<ChatEvent>>,
}

impl FixedProxy {
    pub fn new(online: usize, max: usize) -> Self {
        Self {
            online: AtomicUsize::new(online),
            max,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn set_online(&self, online: usize) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<ChatEvent> {
        self.received.lock().unwrap().clone()
    }
}

impl ProxySideAdapter for FixedProxy {
    fn online_player_count(&self) -> usize {
        self.online.load(Ordering::SeqCst)
    }

    fn max_player_count(&self) -> usize {
        self.max
    }

    fn dispatch_to_proxy_network(&self, event: ChatEvent) {
        self.received.lock().unwrap().push(event);
    }
}

pub fn test_config() -> Config {
    load_config_str(
        r#"
        discord {
          token = "abc.def.ghi"
          channel-id = "100"
          private-channel-id = "200"
          topic-update-interval = 0
        }
        proxy-status {
          module-enabled = "Proxy enabled!"
          module-disabled = "Proxy disabled."
        }
        topic {
          online = "%online% online"
          offline = "offline"
        }
        "#,
    )
    .unwrap()
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}
