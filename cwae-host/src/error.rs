//! Error types for cwae-host
//!
//! Host operations surface one of these; engine-level failures are mapped into
//! the host taxonomy at the component that called the engine.

use crate::engine::{EngineError, GameObjectId, Subsystem};
use thiserror::Error;

/// Main error type for cwae-host
#[derive(Error, Debug)]
pub enum Error {
    /// Operation attempted before `initialize` succeeded or after `terminate`
    #[error("Sound engine not initialized")]
    NotInitialized,

    /// Lifecycle bring-up failed
    #[error("Initialization failed: {0}")]
    Init(#[from] InitError),

    /// Bank could not be loaded or released
    #[error("Bank load error: {0}")]
    Load(#[from] LoadError),

    /// Event could not be queued
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Game object is not registered
    #[error("Unknown game object: {0}")]
    UnknownGameObject(GameObjectId),

    /// Engine call failed outside of init, load or dispatch
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] cwae_common::Error),
}

/// Lifecycle bring-up failures
#[derive(Error, Debug)]
pub enum InitError {
    /// `initialize` called while the engine is (partially) up
    #[error("sound engine already initialized")]
    AlreadyInitialized,

    /// A subsystem refused to start
    #[error("could not initialize {subsystem}: {reason}")]
    Subsystem { subsystem: Subsystem, reason: String },
}

/// Bank loading failures
#[derive(Error, Debug)]
pub enum LoadError {
    /// Bank could not be resolved under the base path/language
    #[error("bank not found: {0}")]
    BankNotFound(String),

    /// Bank content is malformed
    #[error("malformed bank {name}: {reason}")]
    BankFormat { name: String, reason: String },

    /// Handle does not refer to a loaded bank
    #[error("bank not loaded: {0}")]
    NotLoaded(String),

    /// Engine refused the load for another reason
    #[error("engine rejected bank {name}: {reason}")]
    Engine { name: String, reason: String },
}

/// Event dispatch failures
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No loaded bank defines the event
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Target emitter is not registered
    #[error("unknown game object: {0}")]
    UnknownGameObject(GameObjectId),

    /// Engine refused the request (queue full, etc.)
    #[error("event {event} rejected: {reason}")]
    Rejected { event: String, reason: String },
}

/// Convenience Result type using cwae-host Error
pub type Result<T> = std::result::Result<T, Error>;
