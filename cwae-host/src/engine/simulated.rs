//! In-process sound engine backend
//!
//! Stands in for the vendor runtime. It keeps the same subsystem layering
//! (memory, streaming, low-level I/O, sound engine) and enforces the same
//! prerequisites, but "plays" events by counting samples instead of mixing.

use super::bank::BankManifest;
use super::resolver::{bank_stem, FileLocationResolver};
use super::{
    BankId, EngineError, EngineResult, GameObjectId, PlayingId, SoundEngine, Subsystem,
};
use cwae_common::config::{DeviceSettings, EngineSettings, MemorySettings, StreamingSettings};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use tracing::{debug, info, warn};

/// One recorded lifecycle call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCall {
    Init(Subsystem),
    Term(Subsystem),
}

/// Resource counters exposed for inspection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub banks_loaded: usize,
    pub memory_in_use: u64,
    pub game_objects: usize,
    pub pending_events: usize,
    pub active_voices: usize,
    pub renders: u64,
}

impl EngineStats {
    /// Resources that must be released before shutdown
    pub fn resource_count(&self) -> usize {
        self.banks_loaded + self.game_objects + self.pending_events + self.active_voices
    }
}

#[derive(Debug)]
struct MemoryPool {
    capacity: u64,
    in_use: u64,
}

#[derive(Debug)]
struct LoadedBank {
    manifest: BankManifest,
    size: u64,
}

#[derive(Debug)]
struct PendingEvent {
    playing_id: PlayingId,
    event: String,
    target: GameObjectId,
    duration_ms: u64,
    looping: bool,
}

#[derive(Debug)]
struct Voice {
    playing_id: PlayingId,
    event: String,
    target: GameObjectId,
    /// None for looping voices
    remaining_samples: Option<u64>,
}

#[derive(Debug)]
struct EngineCore {
    settings: EngineSettings,
    banks: HashMap<BankId, LoadedBank>,
    game_objects: HashMap<GameObjectId, String>,
    pending: VecDeque<PendingEvent>,
    voices: Vec<Voice>,
    next_playing_id: u32,
}

impl EngineCore {
    fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            banks: HashMap::new(),
            game_objects: HashMap::new(),
            pending: VecDeque::new(),
            voices: Vec::new(),
            next_playing_id: 1,
        }
    }

    fn allocate_playing_id(&mut self) -> PlayingId {
        let id = PlayingId(self.next_playing_id);
        self.next_playing_id = self.next_playing_id.checked_add(1).unwrap_or(1);
        id
    }
}

/// Simulated sound engine
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    memory: Option<MemoryPool>,
    streaming: Option<StreamingSettings>,
    io: Option<DeviceSettings>,
    resolver: FileLocationResolver,
    core: Option<EngineCore>,
    renders: u64,
    fail_at: Option<Subsystem>,
    fail_unload: bool,
    fail_unregister: bool,
    render_failure_after: Option<u64>,
    journal: Vec<LifecycleCall>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make initialization of `subsystem` fail
    pub fn with_failure_at(mut self, subsystem: Subsystem) -> Self {
        self.fail_at = Some(subsystem);
        self
    }

    /// Make every `unload_bank` fail, leaving the bank loaded
    pub fn with_unload_failure(mut self) -> Self {
        self.fail_unload = true;
        self
    }

    /// Make every `unregister_game_object` fail, leaving the object registered
    pub fn with_unregister_failure(mut self) -> Self {
        self.fail_unregister = true;
        self
    }

    /// Let `renders` quanta succeed, then fail every `render_audio`
    pub fn with_render_failure_after(mut self, renders: u64) -> Self {
        self.render_failure_after = Some(renders);
        self
    }

    /// Clear any injected failure
    pub fn clear_failure(&mut self) {
        self.fail_at = None;
        self.fail_unload = false;
        self.fail_unregister = false;
        self.render_failure_after = None;
    }

    /// Successful init/term calls, in the order they happened
    pub fn journal(&self) -> &[LifecycleCall] {
        &self.journal
    }

    pub fn stats(&self) -> EngineStats {
        let mut stats = EngineStats {
            memory_in_use: self.memory.as_ref().map_or(0, |m| m.in_use),
            renders: self.renders,
            ..EngineStats::default()
        };
        if let Some(core) = &self.core {
            stats.banks_loaded = core.banks.len();
            stats.game_objects = core.game_objects.len();
            stats.pending_events = core.pending.len();
            stats.active_voices = core.voices.len();
        }
        stats
    }

    /// Events currently audible on `target`
    pub fn voices_on(&self, target: GameObjectId) -> Vec<String> {
        self.core
            .as_ref()
            .map(|core| {
                core.voices
                    .iter()
                    .filter(|v| v.target == target)
                    .map(|v| v.event.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resolver(&self) -> &FileLocationResolver {
        &self.resolver
    }

    fn check_injected(&self, subsystem: Subsystem) -> EngineResult<()> {
        if self.fail_at == Some(subsystem) {
            return Err(EngineError::Subsystem {
                subsystem,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn require(&self, subsystem: Subsystem, up: bool) -> EngineResult<()> {
        if up {
            Ok(())
        } else {
            Err(EngineError::Subsystem {
                subsystem,
                reason: "not initialized".to_string(),
            })
        }
    }

    fn core_mut(&mut self) -> EngineResult<&mut EngineCore> {
        self.core.as_mut().ok_or(EngineError::Subsystem {
            subsystem: Subsystem::SoundEngine,
            reason: "not initialized".to_string(),
        })
    }

    fn release_memory(&mut self, bytes: u64) {
        if let Some(pool) = self.memory.as_mut() {
            pool.in_use = pool.in_use.saturating_sub(bytes);
        }
    }
}

impl SoundEngine for SimulatedEngine {
    fn init_memory(&mut self, settings: &MemorySettings) -> EngineResult<()> {
        self.check_injected(Subsystem::Memory)?;
        if self.memory.is_some() {
            return Err(EngineError::Subsystem {
                subsystem: Subsystem::Memory,
                reason: "already initialized".to_string(),
            });
        }
        if settings.pool_size_bytes == 0 {
            return Err(EngineError::Subsystem {
                subsystem: Subsystem::Memory,
                reason: "pool size must be greater than zero".to_string(),
            });
        }
        self.memory = Some(MemoryPool {
            capacity: settings.pool_size_bytes,
            in_use: 0,
        });
        self.journal.push(LifecycleCall::Init(Subsystem::Memory));
        Ok(())
    }

    fn term_memory(&mut self) {
        if let Some(pool) = self.memory.take() {
            if pool.in_use > 0 {
                warn!("Memory manager terminated with {} bytes still allocated", pool.in_use);
            }
            self.journal.push(LifecycleCall::Term(Subsystem::Memory));
        }
    }

    fn create_stream_manager(&mut self, settings: &StreamingSettings) -> EngineResult<()> {
        self.check_injected(Subsystem::Streaming)?;
        self.require(Subsystem::Memory, self.memory.is_some())?;
        if settings.max_concurrent_streams == 0 {
            return Err(EngineError::Subsystem {
                subsystem: Subsystem::Streaming,
                reason: "max_concurrent_streams must be greater than zero".to_string(),
            });
        }
        self.streaming = Some(settings.clone());
        self.journal.push(LifecycleCall::Init(Subsystem::Streaming));
        Ok(())
    }

    fn destroy_stream_manager(&mut self) {
        if self.streaming.take().is_some() {
            self.journal.push(LifecycleCall::Term(Subsystem::Streaming));
        }
    }

    fn init_io_device(&mut self, settings: &DeviceSettings) -> EngineResult<()> {
        self.check_injected(Subsystem::LowLevelIo)?;
        self.require(Subsystem::Streaming, self.streaming.is_some())?;
        if settings.granularity_bytes == 0 {
            return Err(EngineError::Subsystem {
                subsystem: Subsystem::LowLevelIo,
                reason: "granularity must be greater than zero".to_string(),
            });
        }
        if let Some(pool) = &self.memory {
            if settings.io_memory_bytes > pool.capacity {
                return Err(EngineError::Subsystem {
                    subsystem: Subsystem::LowLevelIo,
                    reason: format!(
                        "I/O memory ({} bytes) exceeds memory pool ({} bytes)",
                        settings.io_memory_bytes, pool.capacity
                    ),
                });
            }
        }
        self.io = Some(settings.clone());
        self.resolver = FileLocationResolver::default();
        self.journal.push(LifecycleCall::Init(Subsystem::LowLevelIo));
        Ok(())
    }

    fn term_io_device(&mut self) {
        if self.io.take().is_some() {
            self.resolver = FileLocationResolver::default();
            self.journal.push(LifecycleCall::Term(Subsystem::LowLevelIo));
        }
    }

    fn set_base_path(&mut self, path: &Path) -> EngineResult<()> {
        self.require(Subsystem::LowLevelIo, self.io.is_some())?;
        self.resolver.set_base_path(path);
        debug!("Bank base path set to {}", path.display());
        Ok(())
    }

    fn set_current_language(&mut self, language: &str) -> EngineResult<()> {
        self.require(Subsystem::LowLevelIo, self.io.is_some())?;
        self.resolver.set_language(language);
        debug!("Current language set to {}", language);
        Ok(())
    }

    fn init_sound_engine(&mut self, settings: &EngineSettings) -> EngineResult<()> {
        self.check_injected(Subsystem::SoundEngine)?;
        self.require(Subsystem::LowLevelIo, self.io.is_some())?;
        if self.core.is_some() {
            return Err(EngineError::Subsystem {
                subsystem: Subsystem::SoundEngine,
                reason: "already initialized".to_string(),
            });
        }
        self.core = Some(EngineCore::new(settings.clone()));
        self.renders = 0;
        self.journal.push(LifecycleCall::Init(Subsystem::SoundEngine));
        Ok(())
    }

    fn term_sound_engine(&mut self) {
        if let Some(core) = self.core.take() {
            let leaked: u64 = core.banks.values().map(|b| b.size).sum();
            if leaked > 0 {
                warn!("Sound engine terminated with {} bank(s) still loaded", core.banks.len());
                self.release_memory(leaked);
            }
            self.journal.push(LifecycleCall::Term(Subsystem::SoundEngine));
        }
    }

    fn load_bank(&mut self, name: &str) -> EngineResult<BankId> {
        self.require(Subsystem::LowLevelIo, self.io.is_some())?;
        let stem = bank_stem(name);
        let path = self.resolver.resolve(stem)?;
        let bytes = std::fs::read(&path)?;
        let manifest = BankManifest::parse(stem, &bytes)?;
        let size = bytes.len() as u64;

        let id = manifest.id;
        if self.core_mut()?.banks.contains_key(&id) {
            debug!("Bank {} already loaded", manifest.name);
            return Ok(id);
        }

        let pool = self.memory.as_mut().ok_or(EngineError::Subsystem {
            subsystem: Subsystem::Memory,
            reason: "not initialized".to_string(),
        })?;
        if pool.in_use + size > pool.capacity {
            return Err(EngineError::Subsystem {
                subsystem: Subsystem::Memory,
                reason: format!(
                    "pool exhausted loading {} ({} of {} bytes in use)",
                    manifest.name, pool.in_use, pool.capacity
                ),
            });
        }
        pool.in_use += size;

        info!(
            "Loaded bank {} ({} events, {} bytes) from {}",
            manifest.name,
            manifest.events.len(),
            size,
            path.display()
        );
        self.core_mut()?.banks.insert(id, LoadedBank { manifest, size });
        Ok(id)
    }

    fn unload_bank(&mut self, bank: BankId) -> EngineResult<()> {
        if self.fail_unload {
            return Err(injected_failure("unload"));
        }
        let core = self.core_mut()?;
        let removed = core.banks.remove(&bank).ok_or_else(|| EngineError::Subsystem {
            subsystem: Subsystem::SoundEngine,
            reason: format!("bank {} is not loaded", bank),
        })?;
        self.release_memory(removed.size);
        debug!("Unloaded bank {}", removed.manifest.name);
        Ok(())
    }

    fn register_game_object(&mut self, id: GameObjectId, name: &str) -> EngineResult<()> {
        let core = self.core_mut()?;
        if core.game_objects.contains_key(&id) {
            return Err(EngineError::Subsystem {
                subsystem: Subsystem::SoundEngine,
                reason: format!("game object {} already registered", id),
            });
        }
        core.game_objects.insert(id, name.to_string());
        Ok(())
    }

    fn unregister_game_object(&mut self, id: GameObjectId) -> EngineResult<()> {
        if self.fail_unregister {
            return Err(injected_failure("unregister"));
        }
        let core = self.core_mut()?;
        if core.game_objects.remove(&id).is_none() {
            return Err(EngineError::UnknownGameObject(id));
        }

        let voices_before = core.voices.len();
        core.voices.retain(|v| v.target != id);
        core.pending.retain(|p| p.target != id);
        let stopped = voices_before - core.voices.len();
        if stopped > 0 {
            debug!("Stopped {} voice(s) on game object {}", stopped, id);
        }
        Ok(())
    }

    fn post_event(&mut self, event: &str, target: GameObjectId) -> EngineResult<PlayingId> {
        let core = self.core_mut()?;
        if !core.game_objects.contains_key(&target) {
            return Err(EngineError::UnknownGameObject(target));
        }

        let def = core
            .banks
            .values()
            .find_map(|b| b.manifest.event(event))
            .cloned()
            .ok_or_else(|| EngineError::UnknownEvent(event.to_string()))?;

        if core.pending.len() >= core.settings.command_queue_size {
            return Err(EngineError::Subsystem {
                subsystem: Subsystem::SoundEngine,
                reason: "event queue full".to_string(),
            });
        }

        let playing_id = core.allocate_playing_id();
        core.pending.push_back(PendingEvent {
            playing_id,
            event: def.name,
            target,
            duration_ms: def.duration_ms,
            looping: def.looping,
        });
        Ok(playing_id)
    }

    fn render_audio(&mut self) -> EngineResult<()> {
        if self.render_failure_after.is_some_and(|limit| self.renders >= limit) {
            return Err(injected_failure("render"));
        }
        let core = self.core_mut()?;
        let sample_rate = u64::from(core.settings.sample_rate);
        let quantum = u64::from(core.settings.samples_per_frame);
        let max_voices = core.settings.max_voices as usize;

        while let Some(pending) = core.pending.pop_front() {
            if core.voices.len() >= max_voices {
                warn!(
                    "Voice limit ({}) reached, dropping {} (playing id {})",
                    max_voices, pending.event, pending.playing_id
                );
                continue;
            }
            let remaining_samples = if pending.looping {
                None
            } else {
                Some(pending.duration_ms.saturating_mul(sample_rate) / 1000)
            };
            debug!(
                "Starting voice for {} on game object {} (playing id {})",
                pending.event, pending.target, pending.playing_id
            );
            core.voices.push(Voice {
                playing_id: pending.playing_id,
                event: pending.event,
                target: pending.target,
                remaining_samples,
            });
        }

        for voice in core.voices.iter_mut() {
            if let Some(remaining) = voice.remaining_samples.as_mut() {
                *remaining = remaining.saturating_sub(quantum);
            }
        }
        core.voices.retain(|v| {
            let finished = v.remaining_samples == Some(0);
            if finished {
                debug!("Voice {} ({}) finished", v.playing_id, v.event);
            }
            !finished
        });

        self.renders += 1;
        Ok(())
    }
}

fn injected_failure(operation: &str) -> EngineError {
    EngineError::Subsystem {
        subsystem: Subsystem::SoundEngine,
        reason: format!("injected {} failure", operation),
    }
}
