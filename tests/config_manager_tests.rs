//! Configuration manager tests
//!
//! End-to-end behavior of the manager against a real file in a temp dir:
//! - Merge completeness and unknown-key passthrough
//! - Save/load round trip
//! - Dot-path get/set with write-through
//! - Validation and directory provisioning
//! - Concurrent updates

use std::fs;
use std::thread;

use tempfile::TempDir;
use upscale_server_config::config::{
    builtin_defaults, deep_merge, keys, leaf_paths, lookup, ConfigOrigin, ConfigStore,
    ConfigTree, ConfigValue,
};
use upscale_server_config::ConfigManager;

fn open(temp: &TempDir) -> ConfigManager {
    ConfigManager::open(ConfigStore::new(temp.path())).with_base_dir(temp.path())
}

fn write_config(temp: &TempDir, json: &str) {
    fs::write(temp.path().join("config.json"), json).unwrap();
}

// =============================================================================
// Loading and merging
// =============================================================================

#[test]
fn test_first_start_creates_file() {
    let temp = TempDir::new().unwrap();

    let manager = open(&temp);

    assert_eq!(manager.source().origin, ConfigOrigin::Defaults);
    assert!(temp.path().join("config.json").exists());
    assert_eq!(manager.snapshot(), builtin_defaults());
    assert!(manager.diagnostics().is_empty());
}

#[test]
fn test_merge_completeness_for_empty_override() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, "{}");

    let manager = open(&temp);

    assert_eq!(manager.source().origin, ConfigOrigin::File);
    assert_eq!(manager.snapshot(), builtin_defaults());
}

#[test]
fn test_merge_keeps_every_default_path() {
    let temp = TempDir::new().unwrap();
    write_config(
        &temp,
        r#"{
            "server": {"port": 9443, "use_ssl": true},
            "video": {"supported_formats": ["mkv"]},
            "experimental": {"frame_interpolation": "rife"}
        }"#,
    );

    let manager = open(&temp);
    let tree = manager.snapshot();

    for path in leaf_paths(&builtin_defaults()) {
        assert!(lookup(&tree, &path).found().is_some(), "missing {}", path);
    }
    assert_eq!(manager.get_i64(keys::SERVER_PORT), Some(9443));
    assert_eq!(manager.get_str("server.host").as_deref(), Some("0.0.0.0"));
    // Lists replace, never concatenate
    assert_eq!(
        manager.get_list("video.supported_formats"),
        Some(vec!["mkv".to_string()])
    );
    // Unknown keys pass through
    assert_eq!(
        manager.get_str("experimental.frame_interpolation").as_deref(),
        Some("rife")
    );
}

#[test]
fn test_leaf_replacement() {
    let mut base: ConfigTree = ConfigTree::new();
    let mut a = ConfigTree::new();
    a.insert("b".to_string(), 0.into());
    a.insert("c".to_string(), 2.into());
    base.insert("a".to_string(), a.into());

    let mut update = ConfigTree::new();
    let mut a_update = ConfigTree::new();
    a_update.insert("b".to_string(), 1.into());
    update.insert("a".to_string(), a_update.into());

    deep_merge(&mut base, update);

    assert_eq!(lookup(&base, "a.b").found(), Some(&ConfigValue::Integer(1)));
    assert_eq!(lookup(&base, "a.c").found(), Some(&ConfigValue::Integer(2)));
}

#[test]
fn test_null_member_restores_default() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, r#"{"server": {"port": null}}"#);

    let manager = open(&temp);

    assert_eq!(manager.get_i64(keys::SERVER_PORT), Some(8765));
    assert!(manager.diagnostics().is_empty());
}

#[test]
fn test_corrupt_file_falls_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, r#"{"server": {"port": 9000"#);

    let manager = open(&temp);

    assert_eq!(manager.get_i64(keys::SERVER_PORT), Some(8765));
    assert_eq!(manager.diagnostics().len(), 1);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_round_trip() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);

    let mut tree = builtin_defaults();
    upscale_server_config::config::assign(&mut tree, "gui.theme", "thème clair".into()).unwrap();
    upscale_server_config::config::assign(&mut tree, "processing.scale_bias", 0.25.into()).unwrap();
    manager.save_tree(tree.clone()).unwrap();

    let reopened = open(&temp);
    assert_eq!(reopened.snapshot(), tree);
    assert_eq!(reopened.source().origin, ConfigOrigin::File);
}

#[test]
fn test_file_is_human_readable() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);
    manager.set("gui.theme", "sombre é").unwrap();

    let contents = fs::read_to_string(temp.path().join("config.json")).unwrap();

    assert!(contents.contains("\n    \"gui\": {\n        "));
    assert!(contents.contains("\"theme\": \"sombre é\""));
}

#[test]
fn test_set_auto_vivifies_and_persists() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);

    manager.set("newcat.newkey", 42).unwrap();

    let reopened = open(&temp);
    assert_eq!(reopened.get("newcat.newkey", 0), ConfigValue::Integer(42));
}

#[test]
fn test_get_missing_path_returns_default() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);

    assert_eq!(manager.get("server.nonexistent", "X"), ConfigValue::from("X"));
    assert_eq!(manager.lookup("server.nonexistent"), None);
}

#[test]
fn test_blocked_set_leaves_file_unchanged() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);
    let before = fs::read_to_string(temp.path().join("config.json")).unwrap();

    assert!(manager.set("server.port.value", 1).is_err());
    assert!(manager.set("processing.scale_bias", f64::INFINITY).is_err());

    let after = fs::read_to_string(temp.path().join("config.json")).unwrap();
    assert_eq!(before, after);
    let reopened = open(&temp);
    assert_eq!(reopened.get_i64(keys::SERVER_PORT), Some(8765));
    assert_eq!(reopened.lookup("processing.scale_bias"), None);
}

#[test]
fn test_digest_changes_with_content() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, r#"{"server": {"port": 1}}"#);
    let first = open(&temp).source().digest.clone();

    write_config(&temp, r#"{"server": {"port": 2}}"#);
    let second = open(&temp).source().digest.clone();

    assert!(first.is_some());
    assert_ne!(first, second);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validate_port() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);

    manager.set(keys::SERVER_PORT, 99999).unwrap();
    let report = manager.validate();
    assert!(!report.valid);
    assert!(report.errors.iter().any(|e| e.contains("port")));

    manager.set(keys::SERVER_PORT, 8765).unwrap();
    let report = manager.validate();
    assert!(!report.errors.iter().any(|e| e.contains("port")));
}

#[test]
fn test_validate_ssl_gating() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);

    let report = manager.validate();
    assert!(report.valid);
    assert!(!report.errors.iter().any(|e| e.contains("SSL")));

    manager.set(keys::SERVER_USE_SSL, true).unwrap();
    let report = manager.validate();
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn test_warnings_do_not_affect_validity() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);

    let report = manager.validate();

    assert!(report.valid);
    assert!(!report.warnings.is_empty());
}

// =============================================================================
// Working directories
// =============================================================================

#[test]
fn test_resolve_working_directories_idempotent() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);

    let first = manager.resolve_working_directories().unwrap();
    let second = manager.resolve_working_directories().unwrap();

    assert_eq!(first, second);
    for (_, path) in first.entries() {
        assert!(path.is_dir());
        assert!(path.starts_with(temp.path()));
    }

    let report = manager.validate();
    assert!(!report.warnings.iter().any(|w| w.contains("will be created")));
}

#[test]
fn test_working_directories_follow_settings() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);
    let custom = temp.path().join("custom").join("out");

    manager
        .set(keys::PROCESSING_OUTPUT_DIRECTORY, custom.clone())
        .unwrap();
    let dirs = manager.resolve_working_directories().unwrap();

    assert_eq!(dirs.output, custom);
    assert!(custom.is_dir());
}

#[test]
fn test_relative_directories_resolve_against_base_not_config_dir() {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join(".upscale_server");
    let run_dir = temp.path().join("srv");
    let manager = ConfigManager::open(ConfigStore::new(&config_dir)).with_base_dir(&run_dir);

    let dirs = manager.resolve_working_directories().unwrap();

    for (_, path) in dirs.entries() {
        assert!(path.starts_with(&run_dir));
        assert!(!path.starts_with(&config_dir));
    }
    assert!(run_dir.join("output").is_dir());
}

#[test]
fn test_ensure_directories_provisions_storage() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);
    let batches = temp.path().join("data").join("batches");
    manager.set("storage.batches_directory", batches.clone()).unwrap();

    let created = manager.ensure_directories().unwrap();

    assert!(batches.is_dir());
    for name in ["input", "logs", "work", "output", "temp"] {
        assert!(temp.path().join(name).is_dir(), "missing {}", name);
    }
    assert_eq!(created["storage.batches_directory"], batches);
    // The fixed triple is unaffected by storage settings
    assert_eq!(manager.working_directory_paths().work, temp.path().join("work"));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_sets_all_land() {
    let temp = TempDir::new().unwrap();
    let manager = open(&temp);

    thread::scope(|scope| {
        for i in 0..8 {
            let manager = &manager;
            scope.spawn(move || {
                manager.set(&format!("workers.w{}", i), i as i64).unwrap();
            });
        }
    });

    let reopened = open(&temp);
    for i in 0..8i64 {
        assert_eq!(reopened.get_i64(&format!("workers.w{}", i)), Some(i));
    }
}
