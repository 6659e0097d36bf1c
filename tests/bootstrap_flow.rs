//! End-to-end bootstrap scenarios over a real on-disk game archive.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;

use gantry::bootstrap::{BootstrapConfig, Orchestrator};
use gantry::env::Environment;
use gantry::provider::ExplicitArchiveProvider;
use gantry::services::{
    DeobfuscationService, DefaultModRuntime, NoopDeobfuscator, NoopTransformerBootstrap,
};
use gantry::source::ClassSource;

/// Write an extracted game archive: one entry class plus a manifest.
fn write_game_archive(root: &Path, extra_manifest: &str) {
    let class_dir = root.join("com/example");
    fs::create_dir_all(&class_dir).unwrap();
    fs::write(class_dir.join("Game.class"), [0xCA, 0xFE, 0xBA, 0xBE]).unwrap();
    fs::write(
        root.join("manifest.json"),
        format!(
            r#"{{"title":"Example","version":"1.4.2","attributes":{{"entrypoint":"com.example.Game"{}}}}}"#,
            extra_manifest
        ),
    )
    .unwrap();
}

fn orchestrator_with(deobfuscator: Box<dyn DeobfuscationService>) -> Orchestrator {
    Orchestrator::new(
        deobfuscator,
        Box::new(DefaultModRuntime::new()),
        Box::new(NoopTransformerBootstrap),
    )
}

fn server_config() -> BootstrapConfig {
    BootstrapConfig {
        environment: Some(Environment::Server),
        development: Some(false),
        force_compatibility: Some(false),
        ..Default::default()
    }
}

/// Deobfuscator that counts invocations, to prove the unobfuscated path
/// never reaches it.
struct CountingDeobfuscator(Arc<AtomicUsize>);

impl DeobfuscationService for CountingDeobfuscator {
    fn remap_archive(
        &self,
        _game_id: &str,
        _version: &str,
        _archive: &Path,
        _target_namespace: &str,
    ) -> Result<HashMap<String, String>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(HashMap::new())
    }
}

#[test]
fn server_bootstrap_without_deobfuscation() {
    let dir = tempfile::tempdir().unwrap();
    write_game_archive(dir.path(), "");

    let deobf_calls = Arc::new(AtomicUsize::new(0));
    let mut orch = orchestrator_with(Box::new(CountingDeobfuscator(deobf_calls.clone())));
    orch.register_provider(Box::new(ExplicitArchiveProvider::new(dir.path())));

    let handle = orch.run(server_config()).unwrap();

    assert_eq!(deobf_calls.load(Ordering::SeqCst), 0);
    assert_eq!(handle.game_name(), "Example");
    assert_eq!(handle.target_namespace, "intermediary");
    assert!(!handle.context().is_class_loaded("com.example.Mod"));

    // Mods appear on the classpath post-hoc; resolution flips the loaded bit.
    let mut mod_entries = HashMap::new();
    mod_entries.insert("com/example/Mod.class".to_string(), vec![9, 9]);
    handle
        .context()
        .add_entry(ClassSource::memory("mods/example", mod_entries))
        .unwrap();
    handle.context().class_bytes("com.example.Mod", true).unwrap();
    assert!(handle.context().is_class_loaded("com.example.Mod"));

    handle.launch().unwrap();
    assert!(handle.context().is_class_loaded("com.example.Game"));
}

#[test]
fn resolution_is_idempotent_across_launch_and_mods() {
    let dir = tempfile::tempdir().unwrap();
    write_game_archive(dir.path(), "");

    let mut orch = orchestrator_with(Box::new(NoopDeobfuscator));
    orch.register_provider(Box::new(ExplicitArchiveProvider::new(dir.path())));
    orch.register_transformer("stamp", |_, mut b: Vec<u8>| {
        b.push(0x01);
        b
    })
    .unwrap();

    let handle = orch.run(server_config()).unwrap();
    let first = handle.context().class_bytes("com.example.Game", true).unwrap();
    let second = handle.context().class_bytes("com.example.Game", true).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec![0xCA, 0xFE, 0xBA, 0xBE, 0x01]);

    // A later shadowing entry must not change the pinned origin.
    let mut shadow = HashMap::new();
    shadow.insert("com/example/Game.class".to_string(), vec![0xFF]);
    handle
        .context()
        .add_entry(ClassSource::memory("mods/shadow", shadow))
        .unwrap();
    let third = handle.context().class_bytes("com.example.Game", true).unwrap();
    assert_eq!(first, third);
}

#[test]
fn compatibility_override_changes_strategy_not_contract() {
    let dir = tempfile::tempdir().unwrap();
    write_game_archive(dir.path(), "");

    let mut orch = orchestrator_with(Box::new(NoopDeobfuscator));
    orch.register_provider(Box::new(ExplicitArchiveProvider::new(dir.path())));

    let handle = orch
        .run(BootstrapConfig {
            force_compatibility: Some(true),
            ..server_config()
        })
        .unwrap();

    assert_eq!(handle.context().strategy_name(), "compatibility");
    // Identical external contract: the game still resolves and launches.
    handle.launch().unwrap();
    assert!(handle.context().is_class_loaded("com.example.Game"));

    let err = handle
        .context()
        .class_bytes("gantry.loader.Delegate", true)
        .unwrap_err();
    assert!(err.to_string().contains("isolation violation"));
}

#[test]
fn candidate_flags_drive_platform_loader_selection() {
    let dir = tempfile::tempdir().unwrap();
    write_game_archive(dir.path(), r#","requires-platform-loader":"true""#);

    let mut orch = orchestrator_with(Box::new(NoopDeobfuscator));
    orch.register_provider(Box::new(ExplicitArchiveProvider::new(dir.path())));

    let handle = orch.run(server_config()).unwrap();
    assert_eq!(handle.context().strategy_name(), "compatibility");
}

#[test]
fn obfuscated_candidate_runs_deobfuscation_per_archive() {
    let dir = tempfile::tempdir().unwrap();
    write_game_archive(dir.path(), r#","obfuscated":"true""#);

    let deobf_calls = Arc::new(AtomicUsize::new(0));
    let mut orch = orchestrator_with(Box::new(CountingDeobfuscator(deobf_calls.clone())));
    orch.register_provider(Box::new(ExplicitArchiveProvider::new(dir.path())));

    let handle = orch.run(server_config()).unwrap();
    assert_eq!(deobf_calls.load(Ordering::SeqCst), 1);
    handle.launch().unwrap();
}

#[test]
fn load_time_dependencies_exclude_wildcards_and_game_archive() {
    let dir = tempfile::tempdir().unwrap();
    write_game_archive(dir.path(), "");
    let game_path = dir.path().to_string_lossy().to_string();

    let mut orch = orchestrator_with(Box::new(NoopDeobfuscator));
    orch.register_provider(Box::new(ExplicitArchiveProvider::new(dir.path())));

    let handle = orch
        .run(BootstrapConfig {
            inherited_classpath: Some(format!("libs/dep.jar:*:{}", game_path)),
            ..server_config()
        })
        .unwrap();

    assert_eq!(
        handle.load_time_dependencies,
        vec![PathBuf::from("libs/dep.jar")]
    );
}

#[test]
fn entrypoints_are_located_from_manifests() {
    let dir = tempfile::tempdir().unwrap();
    write_game_archive(dir.path(), r#","entrypoint-bonus":"com.example.Bonus""#);

    let mut orch = orchestrator_with(Box::new(NoopDeobfuscator));
    orch.register_provider(Box::new(ExplicitArchiveProvider::new(dir.path())));

    let handle = orch.run(server_config()).unwrap();
    assert!(handle
        .entrypoints
        .contains(&"com.example.Game".to_string()));
    assert!(handle
        .entrypoints
        .contains(&"com.example.Bonus".to_string()));
}
