//! Bank loading with per-name reference counting
//!
//! Loading a name that is already loaded hands back the same handle and bumps
//! its reference count; the engine is asked to load a bank at most once.

use crate::engine::resolver::bank_stem;
use crate::engine::{BankId, EngineError, SoundEngine};
use crate::error::{Error, LoadError, Result};
use crate::lifecycle::EngineHandle;
use cwae_common::events::HostEvent;
use std::collections::HashMap;
use tracing::{debug, info};

/// Handle to a loaded bank
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BankHandle {
    id: BankId,
    name: String,
}

impl BankHandle {
    pub fn id(&self) -> BankId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
struct LoadedBank {
    handle: BankHandle,
    ref_count: usize,
    load_order: u64,
}

/// Host-side table of loaded banks, keyed by normalized bank name
#[derive(Debug, Default)]
pub struct BankLoader {
    banks: HashMap<String, LoadedBank>,
    next_order: u64,
}

impl BankLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Banks currently loaded
    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Reference count for `name` (0 when not loaded)
    pub fn ref_count(&self, name: &str) -> usize {
        self.banks.get(&bank_key(name)).map_or(0, |b| b.ref_count)
    }

    /// Handle for `name` if loaded
    pub fn get(&self, name: &str) -> Option<&BankHandle> {
        self.banks.get(&bank_key(name)).map(|b| &b.handle)
    }

    /// Bump the count of an already-loaded bank
    fn acquire(&mut self, name: &str) -> Option<(BankHandle, usize)> {
        let entry = self.banks.get_mut(&bank_key(name))?;
        entry.ref_count += 1;
        Some((entry.handle.clone(), entry.ref_count))
    }

    fn insert(&mut self, handle: BankHandle) {
        let order = self.next_order;
        self.next_order += 1;
        self.banks.insert(
            bank_key(handle.name()),
            LoadedBank {
                handle,
                ref_count: 1,
                load_order: order,
            },
        );
    }

    /// Current count for exactly this handle (None for unknown or stale handles)
    fn count_for(&self, handle: &BankHandle) -> Option<usize> {
        self.banks
            .get(&bank_key(handle.name()))
            .filter(|b| b.handle.id == handle.id)
            .map(|b| b.ref_count)
    }

    /// Drop one reference; returns the remaining count
    fn release(&mut self, handle: &BankHandle) -> Option<usize> {
        let key = bank_key(handle.name());
        let entry = self.banks.get_mut(&key)?;
        if entry.handle.id != handle.id {
            return None;
        }
        entry.ref_count -= 1;
        let remaining = entry.ref_count;
        if remaining == 0 {
            self.banks.remove(&key);
        }
        Some(remaining)
    }

    /// Remove every bank, most recently loaded first
    pub(crate) fn drain(&mut self) -> Vec<(BankHandle, usize)> {
        let mut banks: Vec<LoadedBank> = self.banks.drain().map(|(_, b)| b).collect();
        banks.sort_by(|a, b| b.load_order.cmp(&a.load_order));
        banks.into_iter().map(|b| (b.handle, b.ref_count)).collect()
    }
}

fn bank_key(name: &str) -> String {
    bank_stem(name.trim()).to_ascii_lowercase()
}

impl<E: SoundEngine> EngineHandle<E> {
    /// Load a bank by name (with or without the `.bnk` extension)
    pub fn load_bank(&mut self, name: &str) -> Result<BankHandle> {
        self.ensure_ready()?;

        if let Some((handle, ref_count)) = self.banks.acquire(name) {
            debug!("Bank {} already loaded (refs: {})", handle.name(), ref_count);
            self.broadcast_event(HostEvent::BankLoaded {
                name: handle.name().to_string(),
                bank_id: handle.id().0,
                ref_count,
                timestamp: chrono::Utc::now(),
            });
            return Ok(handle);
        }

        let display_name = bank_stem(name.trim()).to_string();
        let id = self
            .engine
            .load_bank(&display_name)
            .map_err(|e| load_failure(&display_name, e))?;

        let handle = BankHandle {
            id,
            name: display_name,
        };
        info!("Bank {} loaded (id {})", handle.name(), handle.id());
        self.banks.insert(handle.clone());
        self.broadcast_event(HostEvent::BankLoaded {
            name: handle.name().to_string(),
            bank_id: id.0,
            ref_count: 1,
            timestamp: chrono::Utc::now(),
        });
        Ok(handle)
    }

    /// Release one reference to a bank; the engine unloads it at zero
    pub fn unload_bank(&mut self, handle: &BankHandle) -> Result<()> {
        self.ensure_ready()?;

        let not_loaded = || LoadError::NotLoaded(handle.name().to_string());
        let current = self.banks.count_for(handle).ok_or_else(not_loaded)?;
        if current > 1 {
            let remaining = self.banks.release(handle).ok_or_else(not_loaded)?;
            debug!("Bank {} still referenced (refs: {})", handle.name(), remaining);
            return Ok(());
        }

        // The entry stays until the engine has actually let go of the bank
        self.engine
            .unload_bank(handle.id())
            .map_err(|e| load_failure(handle.name(), e))?;
        self.banks.release(handle);
        info!("Bank {} unloaded", handle.name());
        self.broadcast_event(HostEvent::BankUnloaded {
            name: handle.name().to_string(),
            bank_id: handle.id().0,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Release one reference to the bank loaded under `name`
    pub fn unload_bank_by_name(&mut self, name: &str) -> Result<()> {
        self.ensure_ready()?;
        let handle = self
            .banks
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotLoaded(name.to_string()))?;
        self.unload_bank(&handle)
    }

    /// Number of banks the host holds handles to
    pub fn loaded_bank_count(&self) -> usize {
        self.banks.len()
    }

    /// Reference count of a loaded bank (0 when not loaded)
    pub fn bank_ref_count(&self, name: &str) -> usize {
        self.banks.ref_count(name)
    }
}

fn load_failure(name: &str, err: EngineError) -> Error {
    let load_error = match err {
        EngineError::BankNotFound { searched, .. } => {
            debug!("Bank {} not found in {:?}", name, searched);
            LoadError::BankNotFound(name.to_string())
        }
        EngineError::BankFormat { reason, .. } => LoadError::BankFormat {
            name: name.to_string(),
            reason,
        },
        other => LoadError::Engine {
            name: name.to_string(),
            reason: other.to_string(),
        },
    };
    load_error.into()
}
