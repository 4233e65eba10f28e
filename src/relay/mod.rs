//! The relay engine: message transforms, the outbound gateway and lifecycle.

pub mod adapter;
pub mod controller;
pub mod formatter;
pub mod gateway;
pub mod listener;
pub mod mention;
pub mod presence;
pub mod sanitizer;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::ProxySideAdapter;
pub use controller::RelayController;
pub use formatter::{FormatContext, MessageFormatter};
pub use gateway::{ConnectionState, Destination, GatewaySettings, OutboundGateway, PendingAction};
pub use listener::InboundListener;
pub use presence::{ActivityKind, Presence, PresenceStatus};
pub use service::ChatService;
