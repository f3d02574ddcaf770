//! Engine lifecycle - bring-up and teardown ordering
//!
//! **Responsibilities:**
//! - EngineHandle definition (the one owner of the engine and host-side tables)
//! - initialize: memory, streaming, low-level I/O, sound engine, in that order
//! - terminate: outstanding banks and emitters released, then the reverse order
//! - Lifecycle state tracking and StateChanged broadcasting
//!
//! A failed `initialize` unwinds whatever already came up before returning,
//! so the handle is back in `Uninitialized` and may be initialized again.

use crate::engine::{EngineError, SoundEngine, Subsystem};
use crate::error::{Error, InitError, Result};
use crate::loader::BankLoader;
use crate::registry::GameObjectRegistry;
use cwae_common::events::{EngineState, HostEvent};
use cwae_common::HostConfig;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Capacity of the host event channel
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Handle to the (single) sound engine instance
///
/// Every host operation goes through this handle. It is not `Clone`: exactly
/// one owner drives the engine, and `&mut self` on every call keeps
/// `initialize`/`terminate` from overlapping a tick or a dispatch.
pub struct EngineHandle<E: SoundEngine> {
    pub(crate) engine: E,
    pub(crate) config: HostConfig,
    pub(crate) state: EngineState,
    pub(crate) banks: BankLoader,
    pub(crate) game_objects: GameObjectRegistry,
    pub(crate) event_tx: broadcast::Sender<HostEvent>,
    /// StateChanged events held back while `initialize` is in progress
    deferred_events: Option<Vec<HostEvent>>,
}

impl<E: SoundEngine> EngineHandle<E> {
    /// Wrap an engine; nothing is initialized yet
    pub fn new(engine: E, config: HostConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine,
            config,
            state: EngineState::Uninitialized,
            banks: BankLoader::new(),
            game_objects: GameObjectRegistry::new(),
            event_tx,
            deferred_events: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Borrow the engine backend (for inspection)
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Subscribe to host events
    pub fn subscribe_events(&self) -> broadcast::Receiver<HostEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event to all subscribers
    pub(crate) fn broadcast_event(&mut self, event: HostEvent) {
        if let Some(deferred) = self.deferred_events.as_mut() {
            deferred.push(event);
            return;
        }
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Fail with NotInitialized unless the engine is fully up
    pub(crate) fn ensure_ready(&self) -> Result<()> {
        if self.state.is_ready() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Bring up memory, streaming, low-level I/O and the sound engine
    ///
    /// Aborts on the first failure after tearing down, in reverse order,
    /// every subsystem that had already started. State changes are only
    /// broadcast once the whole bring-up has succeeded.
    pub fn initialize(&mut self) -> Result<()> {
        if !self.state.can_initialize() {
            return Err(InitError::AlreadyInitialized.into());
        }

        info!("Initializing sound engine");
        self.deferred_events = Some(Vec::new());
        let result = self.bring_up();
        if result.is_err() {
            self.unwind();
        }
        let deferred = self.deferred_events.take().unwrap_or_default();

        match result {
            Ok(()) => {
                for event in deferred {
                    self.broadcast_event(event);
                }
                info!(
                    "Sound engine ready (base path {}, language {})",
                    self.config.bank_root.display(),
                    self.config.language
                );
                Ok(())
            }
            Err(err) => {
                error!("Sound engine initialization failed: {}", err);
                Err(err)
            }
        }
    }

    fn bring_up(&mut self) -> Result<()> {
        self.engine
            .init_memory(&self.config.memory)
            .map_err(|e| init_failure(Subsystem::Memory, e))?;
        self.transition(EngineState::MemoryReady);

        self.engine
            .create_stream_manager(&self.config.streaming)
            .map_err(|e| init_failure(Subsystem::Streaming, e))?;
        self.transition(EngineState::StreamingReady);

        self.engine
            .init_io_device(&self.config.device)
            .map_err(|e| init_failure(Subsystem::LowLevelIo, e))?;
        self.transition(EngineState::IoReady);

        self.engine
            .set_base_path(&self.config.bank_root)
            .map_err(|e| init_failure(Subsystem::LowLevelIo, e))?;
        self.engine
            .set_current_language(&self.config.language)
            .map_err(|e| init_failure(Subsystem::LowLevelIo, e))?;

        self.engine
            .init_sound_engine(&self.config.engine)
            .map_err(|e| init_failure(Subsystem::SoundEngine, e))?;
        self.transition(EngineState::EngineReady);

        Ok(())
    }

    /// Unload all outstanding banks, release emitters, then tear down the
    /// sound engine, I/O device, streaming manager and memory manager
    pub fn terminate(&mut self) -> Result<()> {
        self.ensure_ready()?;
        info!("Terminating sound engine");

        for (handle, ref_count) in self.banks.drain() {
            if ref_count > 1 {
                debug!("Releasing bank {} with {} outstanding references", handle.name(), ref_count);
            }
            match self.engine.unload_bank(handle.id()) {
                Ok(()) => self.broadcast_event(HostEvent::BankUnloaded {
                    name: handle.name().to_string(),
                    bank_id: handle.id().0,
                    timestamp: chrono::Utc::now(),
                }),
                Err(e) => warn!("Failed to unload bank {}: {}", handle.name(), e),
            }
        }

        for (id, name) in self.game_objects.drain() {
            debug!("Unregistering game object {} ({}) at shutdown", id, name);
            if let Err(e) = self.engine.unregister_game_object(id) {
                warn!("Failed to unregister game object {}: {}", id, e);
            }
        }

        self.unwind();
        self.transition(EngineState::Terminated);
        info!("Sound engine terminated");
        Ok(())
    }

    /// Tear down from the current state back to Uninitialized
    fn unwind(&mut self) {
        loop {
            match self.state {
                EngineState::EngineReady => {
                    self.engine.term_sound_engine();
                    self.transition(EngineState::IoReady);
                }
                EngineState::IoReady => {
                    self.engine.term_io_device();
                    self.transition(EngineState::StreamingReady);
                }
                EngineState::StreamingReady => {
                    self.engine.destroy_stream_manager();
                    self.transition(EngineState::MemoryReady);
                }
                EngineState::MemoryReady => {
                    self.engine.term_memory();
                    self.transition(EngineState::Uninitialized);
                }
                EngineState::Uninitialized | EngineState::Terminated => break,
            }
        }
    }

    fn transition(&mut self, to: EngineState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!("Engine state {} -> {}", from, to);
        self.state = to;
        self.broadcast_event(HostEvent::StateChanged {
            from,
            to,
            timestamp: chrono::Utc::now(),
        });
    }
}

impl<E: SoundEngine> Drop for EngineHandle<E> {
    fn drop(&mut self) {
        if self.state.is_ready() {
            warn!("Engine handle dropped without terminate, shutting down");
            let _ = self.terminate();
        }
    }
}

fn init_failure(subsystem: Subsystem, err: EngineError) -> Error {
    let reason = match err {
        EngineError::Subsystem { reason, .. } => reason,
        other => other.to_string(),
    };
    InitError::Subsystem { subsystem, reason }.into()
}
