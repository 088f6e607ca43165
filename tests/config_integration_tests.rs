// Configuration system integration tests

use graphdriver_plugin::config::{
    apply_env_overrides, load_config, load_config_with_env, ConfigLoader, PluginConfig,
    TransportKind, DRIVER_ENV,
};
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

// Tests touching environment variables must not interleave
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_config(temp_dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = temp_dir.path().join("config.yaml");
    fs::write(&path, content).expect("Failed to write temp config");
    path
}

#[test]
fn test_load_default_config() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    std::env::remove_var("GRAPH_ROOT");

    let result = load_config("config/default.yaml");
    assert!(result.is_ok(), "Failed to load default config: {:?}", result.err());

    let config = result.unwrap();
    assert_eq!(config.driver.root, "/var/lib/docker");
    assert_eq!(config.driver.priority, vec!["vfs", "rbd"]);
    assert!(config.driver.default_driver.is_none());
    assert_eq!(config.plugin.transport, TransportKind::Unix);
    assert_eq!(config.plugin.group.as_deref(), Some("root"));
    assert_eq!(config.plugin.sock_dir, "/run/docker/plugins");
    assert_eq!(config.plugin.spec_dir, "/etc/docker/plugins");
    assert!(!config.plugin.status_from_driver);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "driver:\n  root: /srv/graph\n");

    let config = load_config(&path).unwrap();
    let defaults = PluginConfig::default();
    assert_eq!(config.driver.root, "/srv/graph");
    assert_eq!(config.driver.priority, defaults.driver.priority);
    assert_eq!(config.plugin.name, defaults.plugin.name);
    assert_eq!(config.plugin.address, defaults.plugin.address);
}

#[test]
fn test_config_with_env_vars() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
driver:
  root: ${GRAPHDRIVER_IT_ROOT:-/var/lib/default}
  options:
    - ${GRAPHDRIVER_IT_OPT:-size=20G}
plugin:
  name: rbd
  transport: tcp
  address: ${GRAPHDRIVER_IT_ADDR:-127.0.0.1:9000}
  group: ~
  status_from_driver: true
logging:
  level: debug
"#,
    );

    std::env::set_var("GRAPHDRIVER_IT_ROOT", "/data/graph");
    std::env::remove_var("GRAPHDRIVER_IT_OPT");
    std::env::remove_var("GRAPHDRIVER_IT_ADDR");

    let result = load_config(&path);
    std::env::remove_var("GRAPHDRIVER_IT_ROOT");
    let config = result.unwrap();

    assert_eq!(config.driver.root, "/data/graph");
    assert_eq!(config.driver.options, vec!["size=20G"]);
    assert_eq!(config.plugin.name, "rbd");
    assert_eq!(config.plugin.transport, TransportKind::Tcp);
    assert_eq!(config.plugin.address, "127.0.0.1:9000");
    assert!(config.plugin.group.is_none());
    assert!(config.plugin.status_from_driver);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_config_validation() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
plugin:
  transport: tcp
  address: not-a-host-port
"#,
    );

    let result = load_config(&path);
    assert!(result.is_err());
    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("host:port"), "{}", message);
}

#[test]
fn test_unknown_transport_rejected() {
    let result = ConfigLoader::parse("plugin:\n  transport: udp\n");
    assert!(result.is_err());
}

#[test]
fn test_env_driver_override() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "driver:\n  default_driver: vfs\n");

    std::env::set_var(DRIVER_ENV, "rbd");
    let result = load_config_with_env(&path);
    std::env::remove_var(DRIVER_ENV);

    let config = result.unwrap();
    assert_eq!(config.driver.default_driver.as_deref(), Some("rbd"));
}

#[test]
fn test_empty_env_driver_is_ignored() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let mut config = PluginConfig::default();
    config.driver.default_driver = Some("vfs".to_string());

    std::env::set_var(DRIVER_ENV, "");
    apply_env_overrides(&mut config);
    std::env::remove_var(DRIVER_ENV);

    assert_eq!(config.driver.default_driver.as_deref(), Some("vfs"));
}

#[test]
fn test_missing_config_file() {
    let result = load_config("/nonexistent/graphdriver.yaml");
    assert!(result.is_err());
}
