//! Sound engine seam
//!
//! The host never mixes or streams audio itself. Everything below the host
//! (memory manager, streaming manager, low-level I/O, the sound engine proper)
//! is reached through [`SoundEngine`]. [`SimulatedEngine`] is the in-process
//! backend used by the binary and the tests.

pub mod bank;
pub mod resolver;
pub mod simulated;

pub use bank::{BankManifest, EventDef};
pub use resolver::FileLocationResolver;
pub use simulated::{EngineStats, LifecycleCall, SimulatedEngine};

use cwae_common::config::{DeviceSettings, EngineSettings, MemorySettings, StreamingSettings};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifier of a bank loaded in the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BankId(pub u32);

/// Identifier of a registered emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObjectId(pub u64);

/// Identifier of one posted event instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayingId(pub u32);

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Display for GameObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PlayingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine subsystems, in initialization order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Memory,
    Streaming,
    LowLevelIo,
    SoundEngine,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Subsystem::Memory => "memory manager",
            Subsystem::Streaming => "streaming manager",
            Subsystem::LowLevelIo => "low-level I/O device",
            Subsystem::SoundEngine => "sound engine",
        };
        f.write_str(name)
    }
}

/// Errors reported by a sound engine backend
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("bank {name} not found (searched {searched:?})")]
    BankNotFound { name: String, searched: Vec<PathBuf> },

    #[error("bank {name} is malformed: {reason}")]
    BankFormat { name: String, reason: String },

    #[error("no loaded bank defines event {0}")]
    UnknownEvent(String),

    #[error("game object {0} is not registered")]
    UnknownGameObject(GameObjectId),

    #[error("{subsystem}: {reason}")]
    Subsystem { subsystem: Subsystem, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Capabilities of the external sound engine
///
/// Init calls may fail; term calls release whatever the matching init
/// acquired and cannot fail. Callers are responsible for ordering: memory,
/// streaming, I/O, engine on the way up and the reverse on the way down.
pub trait SoundEngine: Send {
    fn init_memory(&mut self, settings: &MemorySettings) -> EngineResult<()>;
    fn term_memory(&mut self);

    fn create_stream_manager(&mut self, settings: &StreamingSettings) -> EngineResult<()>;
    fn destroy_stream_manager(&mut self);

    /// Create the streaming device and register it as the file location resolver
    fn init_io_device(&mut self, settings: &DeviceSettings) -> EngineResult<()>;
    fn term_io_device(&mut self);

    /// Base folder for bank resolution
    fn set_base_path(&mut self, path: &Path) -> EngineResult<()>;
    /// Language subfolder for localized banks
    fn set_current_language(&mut self, language: &str) -> EngineResult<()>;

    fn init_sound_engine(&mut self, settings: &EngineSettings) -> EngineResult<()>;
    fn term_sound_engine(&mut self);

    fn load_bank(&mut self, name: &str) -> EngineResult<BankId>;
    fn unload_bank(&mut self, bank: BankId) -> EngineResult<()>;

    fn register_game_object(&mut self, id: GameObjectId, name: &str) -> EngineResult<()>;
    /// Unregistering stops every voice owned by the object
    fn unregister_game_object(&mut self, id: GameObjectId) -> EngineResult<()>;

    /// Queue an event; playback starts on a later render
    fn post_event(&mut self, event: &str, target: GameObjectId) -> EngineResult<PlayingId>;

    /// Advance the audio graph by one quantum
    fn render_audio(&mut self) -> EngineResult<()>;
}
