//! Test helpers for cwae-host integration tests
//!
//! BankFixture writes bank files into a temporary folder and builds engine
//! handles pointed at it.

#![allow(dead_code)]

use cwae_common::HostConfig;
use cwae_host::{EngineHandle, SimulatedEngine};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Event definition for generated banks
#[derive(Debug, Clone, Copy)]
pub struct TestEvent {
    pub name: &'static str,
    pub duration_ms: u64,
    pub looping: bool,
}

impl TestEvent {
    pub const fn one_shot(name: &'static str, duration_ms: u64) -> Self {
        Self { name, duration_ms, looping: false }
    }

    pub const fn looping(name: &'static str) -> Self {
        Self { name, duration_ms: 0, looping: true }
    }
}

/// Temporary bank folder
pub struct BankFixture {
    temp_dir: TempDir,
}

impl BankFixture {
    /// Empty bank folder
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Init + TestBank (PlayCombo 2400 ms, PlayAmbience looping)
    pub fn standard() -> Self {
        let fixture = Self::new();
        fixture.write_bank("Init", &[]);
        fixture.write_bank(
            "TestBank",
            &[
                TestEvent::one_shot("PlayCombo", 2400),
                TestEvent::looping("PlayAmbience"),
            ],
        );
        fixture
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `<root>/<name>.bnk`
    pub fn write_bank(&self, name: &str, events: &[TestEvent]) -> PathBuf {
        let path = self.path().join(format!("{}.bnk", name));
        fs::write(&path, manifest(name, events)).expect("write bank");
        path
    }

    /// Write `<root>/<language>/<name>.bnk`
    pub fn write_localized_bank(&self, language: &str, name: &str, events: &[TestEvent]) -> PathBuf {
        let dir = self.path().join(language);
        fs::create_dir_all(&dir).expect("create language dir");
        let path = dir.join(format!("{}.bnk", name));
        fs::write(&path, manifest(name, events)).expect("write bank");
        path
    }

    /// Write arbitrary bytes as `<root>/<file_name>`
    pub fn write_raw(&self, file_name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path().join(file_name);
        fs::write(&path, bytes).expect("write raw bank");
        path
    }

    /// Default config pointed at this folder
    pub fn config(&self) -> HostConfig {
        HostConfig {
            bank_root: self.path().to_path_buf(),
            ..HostConfig::default()
        }
    }

    /// Uninitialized handle using the simulated engine
    pub fn handle(&self) -> EngineHandle<SimulatedEngine> {
        EngineHandle::new(SimulatedEngine::new(), self.config())
    }

    /// Initialized handle using the simulated engine
    pub fn ready_handle(&self) -> EngineHandle<SimulatedEngine> {
        self.ready_handle_with(SimulatedEngine::new())
    }

    /// Initialized handle around a preconfigured engine (e.g. with injected failures)
    pub fn ready_handle_with(&self, engine: SimulatedEngine) -> EngineHandle<SimulatedEngine> {
        let mut handle = EngineHandle::new(engine, self.config());
        handle.initialize().expect("initialize");
        handle
    }
}

fn manifest(name: &str, events: &[TestEvent]) -> String {
    let mut text = format!("[bank]\nname = \"{}\"\n", name);
    for event in events {
        write!(
            text,
            "\n[[event]]\nname = \"{}\"\nduration_ms = {}\nlooping = {}\n",
            event.name, event.duration_ms, event.looping
        )
        .expect("format manifest");
    }
    text
}
