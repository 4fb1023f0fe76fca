// tests/engine_config.rs
//
// EngineConfig loading: TOML parsing, env-var path override, and defaults
// when nothing is configured. Env manipulation is serialized across tests.

use resale_margin_analyzer::config::{EngineConfig, ENV_CONFIG_PATH};
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;

fn unique_tmp_file(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    dir.push(format!("engine_config_{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
#[serial]
fn env_path_override_is_honored() {
    let path = unique_tmp_file("engine.toml");
    {
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            "cheapness_aggression = 2\nstandardize_strength = 80.0\n"
        )
        .unwrap();
        f.sync_all().unwrap();
    }

    std::env::set_var(ENV_CONFIG_PATH, &path);
    let cfg = EngineConfig::from_env_or_default().unwrap();
    std::env::remove_var(ENV_CONFIG_PATH);

    assert_eq!(cfg.cheapness_aggression, 2);
    assert_eq!(cfg.standardize_strength, 80.0);
    // Untouched keys keep their defaults.
    assert_eq!(cfg.working_minimum, 8);

    let _ = std::fs::remove_file(&path);
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    std::env::set_var(ENV_CONFIG_PATH, "/nonexistent/engine.toml");
    let cfg = EngineConfig::from_env_or_default().unwrap();
    std::env::remove_var(ENV_CONFIG_PATH);

    assert_eq!(cfg.cheapness_aggression, 4);
    assert_eq!(cfg.min_pool, 3);
}

#[test]
#[serial]
fn invalid_toml_is_reported_not_swallowed() {
    let path = unique_tmp_file("broken.toml");
    std::fs::write(&path, "working_minimum = \"eight\"").unwrap();

    std::env::set_var(ENV_CONFIG_PATH, &path);
    let result = EngineConfig::from_env_or_default();
    std::env::remove_var(ENV_CONFIG_PATH);

    assert!(result.is_err());
    let _ = std::fs::remove_file(&path);
}
