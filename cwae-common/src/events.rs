//! Event types for the cwae host event system

use serde::{Deserialize, Serialize};

/// Engine lifecycle state
///
/// Variants are declared in initialization order, so `>=` comparisons express
/// "at least this far initialized". `Terminated` sorts last but is not a ready
/// state; use [`EngineState::is_ready`] to test readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    MemoryReady,
    StreamingReady,
    IoReady,
    EngineReady,
    Terminated,
}

impl EngineState {
    /// True only when banks, events and renders are accepted
    pub fn is_ready(self) -> bool {
        self == EngineState::EngineReady
    }

    /// True when `initialize` may be called
    pub fn can_initialize(self) -> bool {
        matches!(self, EngineState::Uninitialized | EngineState::Terminated)
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::MemoryReady => "memory_ready",
            EngineState::StreamingReady => "streaming_ready",
            EngineState::IoReady => "io_ready",
            EngineState::EngineReady => "engine_ready",
            EngineState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Host event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostEvent {
    /// Lifecycle state changed
    StateChanged {
        from: EngineState,
        to: EngineState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Bank loaded (or its reference count raised)
    BankLoaded {
        name: String,
        bank_id: u32,
        ref_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Bank released by the engine
    BankUnloaded {
        name: String,
        bank_id: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Game object registered
    GameObjectRegistered {
        game_object_id: u64,
        name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Game object unregistered
    GameObjectUnregistered {
        game_object_id: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Event queued into the engine
    EventPosted {
        event: String,
        game_object_id: u64,
        playing_id: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Render loop stopped
    RenderLoopFinished {
        ticks: u64,
        interrupted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl HostEvent {
    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            HostEvent::StateChanged { .. } => "StateChanged",
            HostEvent::BankLoaded { .. } => "BankLoaded",
            HostEvent::BankUnloaded { .. } => "BankUnloaded",
            HostEvent::GameObjectRegistered { .. } => "GameObjectRegistered",
            HostEvent::GameObjectUnregistered { .. } => "GameObjectUnregistered",
            HostEvent::EventPosted { .. } => "EventPosted",
            HostEvent::RenderLoopFinished { .. } => "RenderLoopFinished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ordering_follows_init_order() {
        assert!(EngineState::Uninitialized < EngineState::MemoryReady);
        assert!(EngineState::MemoryReady < EngineState::StreamingReady);
        assert!(EngineState::StreamingReady < EngineState::IoReady);
        assert!(EngineState::IoReady < EngineState::EngineReady);
    }

    #[test]
    fn test_readiness() {
        assert!(EngineState::EngineReady.is_ready());
        assert!(!EngineState::Terminated.is_ready());
        assert!(!EngineState::IoReady.is_ready());

        assert!(EngineState::Uninitialized.can_initialize());
        assert!(EngineState::Terminated.can_initialize());
        assert!(!EngineState::EngineReady.can_initialize());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = HostEvent::EventPosted {
            event: "PlayCombo".to_string(),
            game_object_id: 1,
            playing_id: 7,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "EventPosted");
        assert_eq!(json["event"], "PlayCombo");
        assert_eq!(json["game_object_id"], 1);
        assert_eq!(event.event_type(), "EventPosted");
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&EngineState::EngineReady).unwrap();
        assert_eq!(json, "\"engine_ready\"");
        assert_eq!(EngineState::IoReady.to_string(), "io_ready");
    }
}
