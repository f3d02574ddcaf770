//! Bank manifest format used by the simulated engine
//!
//! A bank file is a TOML document:
//!
//! ```toml
//! [bank]
//! name = "TestBank"
//!
//! [[event]]
//! name = "PlayCombo"
//! duration_ms = 2400
//! ```

use super::{BankId, EngineError, EngineResult};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    bank: BankHeader,
    #[serde(default, rename = "event")]
    events: Vec<EventDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BankHeader {
    name: String,
}

/// One event defined by a bank
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventDef {
    pub name: String,
    /// Playback length of the voice started by this event
    #[serde(default)]
    pub duration_ms: u64,
    /// Looping voices play until their game object is unregistered
    #[serde(default)]
    pub looping: bool,
}

/// Parsed and validated bank
#[derive(Debug, Clone)]
pub struct BankManifest {
    pub id: BankId,
    pub name: String,
    pub events: Vec<EventDef>,
}

impl BankManifest {
    /// Parse bank bytes loaded for `requested`
    ///
    /// The header name must match the requested bank (case-insensitively)
    /// and event names must be non-empty and unique within the bank.
    pub fn parse(requested: &str, bytes: &[u8]) -> EngineResult<Self> {
        let format_error = |reason: String| EngineError::BankFormat {
            name: requested.to_string(),
            reason,
        };

        let text = std::str::from_utf8(bytes)
            .map_err(|e| format_error(format!("not valid UTF-8: {}", e)))?;
        let raw: RawManifest =
            toml::from_str(text).map_err(|e| format_error(e.to_string()))?;

        if !raw.bank.name.eq_ignore_ascii_case(requested) {
            return Err(format_error(format!(
                "header names bank '{}'",
                raw.bank.name
            )));
        }

        let mut seen = HashSet::new();
        for event in &raw.events {
            if event.name.trim().is_empty() {
                return Err(format_error("event with empty name".to_string()));
            }
            if !seen.insert(event.name.to_ascii_lowercase()) {
                return Err(format_error(format!("duplicate event '{}'", event.name)));
            }
        }

        Ok(Self {
            id: bank_id_for(&raw.bank.name),
            name: raw.bank.name,
            events: raw.events,
        })
    }

    /// Case-insensitive event lookup
    pub fn event(&self, name: &str) -> Option<&EventDef> {
        self.events.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

/// Bank ID derived from the bank name: 32-bit FNV-1 over the lowercased name
pub fn bank_id_for(name: &str) -> BankId {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let hash = name
        .bytes()
        .map(|b| b.to_ascii_lowercase())
        .fold(OFFSET_BASIS, |hash, b| hash.wrapping_mul(PRIME) ^ u32::from(b));
    BankId(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BANK: &str = r#"
        [bank]
        name = "TestBank"

        [[event]]
        name = "PlayCombo"
        duration_ms = 2400

        [[event]]
        name = "PlayAmbience"
        looping = true
    "#;

    #[test]
    fn test_parse_valid_bank() {
        let bank = BankManifest::parse("TestBank", TEST_BANK.as_bytes()).unwrap();
        assert_eq!(bank.name, "TestBank");
        assert_eq!(bank.events.len(), 2);
        assert_eq!(bank.event("playcombo").unwrap().duration_ms, 2400);
        assert!(bank.event("PlayAmbience").unwrap().looping);
        assert!(bank.event("Missing").is_none());
    }

    #[test]
    fn test_header_only_bank() {
        let bank = BankManifest::parse("Init", b"[bank]\nname = \"Init\"\n").unwrap();
        assert!(bank.events.is_empty());
    }

    #[test]
    fn test_name_mismatch_is_format_error() {
        let err = BankManifest::parse("Other", TEST_BANK.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::BankFormat { .. }));
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = BankManifest::parse("TestBank", &[0x42, 0x4b, 0x48, 0x44, 0xff, 0x00]).unwrap_err();
        assert!(matches!(err, EngineError::BankFormat { .. }));

        let err = BankManifest::parse("TestBank", b"[bank\nname=").unwrap_err();
        assert!(matches!(err, EngineError::BankFormat { .. }));
    }

    #[test]
    fn test_duplicate_event_rejected() {
        let text = r#"
            [bank]
            name = "Dup"
            [[event]]
            name = "Play"
            [[event]]
            name = "PLAY"
        "#;
        let err = BankManifest::parse("Dup", text.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::BankFormat { .. }));
    }

    #[test]
    fn test_bank_id_is_case_insensitive() {
        assert_eq!(bank_id_for("TestBank"), bank_id_for("testbank"));
        assert_ne!(bank_id_for("TestBank"), bank_id_for("Init"));
    }
}
