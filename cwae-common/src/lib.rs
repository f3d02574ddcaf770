//! # ColorWeight Audio Engine Common Library
//!
//! Shared code for the cwae binaries including:
//! - Host configuration model and resolution
//! - Host event types (HostEvent enum) and engine lifecycle states
//! - Common error type

pub mod config;
pub mod error;
pub mod events;

pub use config::HostConfig;
pub use error::{Error, Result};
pub use events::{EngineState, HostEvent};
