//! Game object registry
//!
//! Hands out emitter IDs and keeps the ID -> name mapping. IDs are unique among
//! currently registered objects; `u64::MAX` is reserved as the invalid ID.

use crate::engine::{GameObjectId, SoundEngine};
use crate::error::{Error, Result};
use crate::lifecycle::EngineHandle;
use cwae_common::events::HostEvent;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Reserved "no game object" ID
pub const INVALID_GAME_OBJECT: GameObjectId = GameObjectId(u64::MAX);

/// ID -> name table for registered emitters
#[derive(Debug)]
pub struct GameObjectRegistry {
    objects: BTreeMap<GameObjectId, String>,
    next_id: u64,
}

impl Default for GameObjectRegistry {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl GameObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next free ID for `name`
    pub fn register(&mut self, name: &str) -> GameObjectId {
        loop {
            let candidate = GameObjectId(self.next_id);
            self.next_id = if self.next_id >= INVALID_GAME_OBJECT.0 - 1 {
                1
            } else {
                self.next_id + 1
            };
            if !self.objects.contains_key(&candidate) {
                self.objects.insert(candidate, name.to_string());
                return candidate;
            }
        }
    }

    /// Remove `id`, returning its name
    pub fn unregister(&mut self, id: GameObjectId) -> Option<String> {
        self.objects.remove(&id)
    }

    pub fn contains(&self, id: GameObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn name_of(&self, id: GameObjectId) -> Option<&str> {
        self.objects.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn drain(&mut self) -> Vec<(GameObjectId, String)> {
        std::mem::take(&mut self.objects).into_iter().collect()
    }

    #[cfg(test)]
    fn with_next_id(next_id: u64) -> Self {
        Self {
            objects: BTreeMap::new(),
            next_id,
        }
    }
}

impl<E: SoundEngine> EngineHandle<E> {
    /// Register an emitter under `name` and return its ID
    pub fn register_game_object(&mut self, name: &str) -> Result<GameObjectId> {
        self.ensure_ready()?;

        let id = self.game_objects.register(name);
        if let Err(e) = self.engine.register_game_object(id, name) {
            warn!("Engine rejected game object {} ({}): {}", id, name, e);
            self.game_objects.unregister(id);
            return Err(e.into());
        }

        debug!("Registered game object {} ({})", id, name);
        self.broadcast_event(HostEvent::GameObjectRegistered {
            game_object_id: id.0,
            name: name.to_string(),
            timestamp: chrono::Utc::now(),
        });
        Ok(id)
    }

    /// Unregister an emitter; its voices stop
    pub fn unregister_game_object(&mut self, id: GameObjectId) -> Result<()> {
        self.ensure_ready()?;

        if !self.game_objects.contains(id) {
            return Err(Error::UnknownGameObject(id));
        }
        self.engine.unregister_game_object(id)?;
        let name = self.game_objects.unregister(id).unwrap_or_default();

        debug!("Unregistered game object {} ({})", id, name);
        self.broadcast_event(HostEvent::GameObjectUnregistered {
            game_object_id: id.0,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    pub fn is_registered(&self, id: GameObjectId) -> bool {
        self.game_objects.contains(id)
    }

    pub fn game_object_name(&self, id: GameObjectId) -> Option<&str> {
        self.game_objects.name_of(id)
    }

    pub fn registered_game_objects(&self) -> usize {
        self.game_objects.len()
    }
}
