//! # ColorWeight Audio Host Library (cwae-host)
//!
//! Bring-up harness around a sound engine: lifecycle ordering, bank loading,
//! game object registration, event dispatch and a frame-driven render loop.
//!
//! **Architecture:** every operation goes through one [`EngineHandle`] that owns
//! a [`SoundEngine`] backend. [`SimulatedEngine`] is the in-process backend.

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod registry;
pub mod render;

pub use engine::{BankId, GameObjectId, PlayingId, SimulatedEngine, SoundEngine, Subsystem};
pub use error::{DispatchError, Error, InitError, LoadError, Result};
pub use lifecycle::EngineHandle;
pub use loader::BankHandle;
pub use render::{FrameClock, ImmediateClock, IntervalClock, RenderLoop, RenderSummary};
