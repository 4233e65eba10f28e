//! Proxychat - Discord chat relay for multi-server game proxy networks
//!
//! Mirrors public proxy chat into a Discord channel and Discord messages
//! back to the proxy, with mention handling, templated formatting and a
//! channel topic that tracks the player count.

pub mod common;
pub mod config;
pub mod console;
pub mod discord;
pub mod relay;
