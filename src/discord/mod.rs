//! Discord backend built on serenity.

pub mod client;
pub mod embed;
pub mod handler;

pub use client::SerenityService;
pub use handler::RelayHandler;
