//! Bank loader behavior: resolution, reference counting and format errors

mod helpers;

use cwae_host::{Error, LoadError};
use helpers::{BankFixture, TestEvent};

#[test]
fn test_same_name_loads_once() {
    let fixture = BankFixture::standard();
    let mut handle = fixture.ready_handle();

    let first = handle.load_bank("TestBank").unwrap();
    let memory_after_first = handle.engine().stats().memory_in_use;
    let second = handle.load_bank("TestBank.bnk").unwrap();

    assert_eq!(first, second);
    assert_eq!(handle.engine().stats().banks_loaded, 1);
    assert_eq!(handle.engine().stats().memory_in_use, memory_after_first);
    assert_eq!(handle.loaded_bank_count(), 1);
    assert_eq!(handle.bank_ref_count("testbank"), 2);

    handle.terminate().unwrap();
}

#[test]
fn test_unload_releases_at_last_reference() {
    let fixture = BankFixture::standard();
    let mut handle = fixture.ready_handle();

    let bank = handle.load_bank("TestBank").unwrap();
    handle.load_bank("TestBank").unwrap();

    handle.unload_bank(&bank).unwrap();
    assert_eq!(handle.engine().stats().banks_loaded, 1);

    handle.unload_bank(&bank).unwrap();
    assert_eq!(handle.engine().stats().banks_loaded, 0);
    assert_eq!(handle.engine().stats().memory_in_use, 0);

    let err = handle.unload_bank(&bank).unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::NotLoaded(_))));

    handle.terminate().unwrap();
}

#[test]
fn test_unload_by_name() {
    let fixture = BankFixture::standard();
    let mut handle = fixture.ready_handle();
    handle.load_bank("Init").unwrap();

    handle.unload_bank_by_name("Init.bnk").unwrap();
    assert_eq!(handle.loaded_bank_count(), 0);
    assert!(matches!(
        handle.unload_bank_by_name("Init"),
        Err(Error::Load(LoadError::NotLoaded(_)))
    ));
    handle.terminate().unwrap();
}

#[test]
fn test_localized_bank_resolution() {
    let fixture = BankFixture::standard();
    fixture.write_localized_bank(
        "English(US)",
        "Dialogue",
        &[TestEvent::one_shot("PlayGreeting", 500)],
    );
    let mut handle = fixture.ready_handle();

    handle.load_bank("Dialogue").unwrap();
    let id = handle.register_game_object("Npc").unwrap();
    handle.post_event("PlayGreeting", id).unwrap();
    handle.terminate().unwrap();
}

#[test]
fn test_other_language_not_resolved() {
    let fixture = BankFixture::standard();
    fixture.write_localized_bank("French(France)", "Dialogue", &[]);
    let mut handle = fixture.ready_handle();

    let err = handle.load_bank("Dialogue").unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::BankNotFound(_))));
    handle.terminate().unwrap();
}

#[test]
fn test_malformed_bank() {
    let fixture = BankFixture::standard();
    fixture.write_raw("Broken.bnk", b"BKHD\x00\x00\x00\x10garbage");
    fixture.write_raw("Mislabeled.bnk", b"[bank]\nname = \"SomethingElse\"\n");
    let mut handle = fixture.ready_handle();

    let err = handle.load_bank("Broken").unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::BankFormat { ref name, .. }) if name == "Broken"));

    let err = handle.load_bank("Mislabeled").unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::BankFormat { .. })));

    // Failed loads hold nothing
    assert_eq!(handle.loaded_bank_count(), 0);
    assert_eq!(handle.engine().stats().memory_in_use, 0);
    handle.terminate().unwrap();
}

#[test]
fn test_pool_exhaustion_is_engine_load_error() {
    let fixture = BankFixture::standard();
    let mut config = fixture.config();
    config.memory.pool_size_bytes = 4 * 1024 * 1024;
    config.device.io_memory_bytes = 1024;
    // Larger than the remaining pool
    fixture.write_raw(
        "Huge.bnk",
        format!("[bank]\nname = \"Huge\"\n# {}\n", "x".repeat(5 * 1024 * 1024)).as_bytes(),
    );

    let mut handle = cwae_host::EngineHandle::new(cwae_host::SimulatedEngine::new(), config);
    handle.initialize().unwrap();
    let err = handle.load_bank("Huge").unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::Engine { .. })));
    handle.terminate().unwrap();
}

#[test]
fn test_shipped_example_config_loads_every_bank() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
    let mut config = cwae_common::HostConfig::from_file(&repo_root.join("cwae.example.toml")).unwrap();
    config.bank_root = repo_root.join(&config.bank_root);
    config.validate().unwrap();

    let mut handle = cwae_host::EngineHandle::new(cwae_host::SimulatedEngine::new(), config.clone());
    handle.initialize().unwrap();
    for bank in &config.banks {
        handle.load_bank(bank).unwrap();
    }
    assert_eq!(handle.loaded_bank_count(), config.banks.len());

    // Localized bank resolved through the language folder
    let obj = handle.register_game_object(&config.game_object).unwrap();
    handle.post_event("PlayGreeting", obj).unwrap();
    handle.post_event(&config.event, obj).unwrap();
    handle.terminate().unwrap();
}
