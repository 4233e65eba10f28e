//! Configuration parsing, validation and reloading.

pub mod env;
pub mod parser;
pub mod store;
pub mod types;
pub mod validate;

pub use parser::{load_and_validate, load_config, load_config_str};
pub use store::ConfigStore;
pub use types::*;
