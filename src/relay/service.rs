//! Boundary to the external chat service.

use async_trait::async_trait;

use crate::common::error::ServiceResult;
use crate::common::messages::{RichContent, RosterEntry};
use crate::relay::presence::Presence;

/// Operations the relay needs from a chat service connection.
///
/// Channel ids are opaque strings; implementations map an id they cannot
/// use to [`ServiceError::ChannelNotFound`](crate::common::error::ServiceError::ChannelNotFound).
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Establish the session and wait until it is usable.
    async fn connect(&self) -> ServiceResult<()>;

    /// Members able to see `channel_id`.
    async fn channel_members(&self, channel_id: &str) -> ServiceResult<Vec<RosterEntry>>;

    async fn send_text(&self, channel_id: &str, text: &str) -> ServiceResult<()>;

    async fn send_rich(&self, channel_id: &str, content: &RichContent) -> ServiceResult<()>;

    async fn set_topic(&self, channel_id: &str, topic: &str) -> ServiceResult<()>;

    async fn set_presence(&self, presence: &Presence) -> ServiceResult<()>;

    /// Close the session, letting in-flight requests finish.
    async fn disconnect(&self);

    /// Tear the session down immediately.
    async fn disconnect_now(&self);
}
