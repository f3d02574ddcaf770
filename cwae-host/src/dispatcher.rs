//! Event dispatch
//!
//! Posting only queues the event inside the engine. Whether (and when) a voice
//! starts is decided on a later render tick.

use crate::engine::{EngineError, GameObjectId, SoundEngine};
use crate::error::{DispatchError, Result};
use crate::lifecycle::EngineHandle;
use cwae_common::events::HostEvent;
use tracing::debug;

impl<E: SoundEngine> EngineHandle<E> {
    /// Queue `event` against `target`
    ///
    /// Fails with `UnknownGameObject` before the engine is touched when the
    /// target is not registered, and with `UnknownEvent` when no loaded bank
    /// defines the event.
    pub fn post_event(&mut self, event: &str, target: GameObjectId) -> Result<()> {
        self.ensure_ready()?;

        if !self.game_objects.contains(target) {
            return Err(DispatchError::UnknownGameObject(target).into());
        }

        let playing_id = self
            .engine
            .post_event(event, target)
            .map_err(|e| match e {
                EngineError::UnknownEvent(name) => DispatchError::UnknownEvent(name),
                EngineError::UnknownGameObject(id) => DispatchError::UnknownGameObject(id),
                other => DispatchError::Rejected {
                    event: event.to_string(),
                    reason: other.to_string(),
                },
            })?;

        debug!("Posted {} on game object {} (playing id {})", event, target, playing_id);
        self.broadcast_event(HostEvent::EventPosted {
            event: event.to_string(),
            game_object_id: target.0,
            playing_id: playing_id.0,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }
}
