//! File-based configuration and secrets loading.

use std::io::Write;

use tollgate::config::{Config, Secrets};
use tollgate::{BackendChoice, GatewayError};

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "config.toml",
        r#"
        [cache]
        max_entries = 25

        [latency]
        unit_ms = 0
        "#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.cache.max_entries, 25);
    assert_eq!(config.latency.unit_ms, 0);
    // Untouched sections keep their defaults.
    assert_eq!(config.rate_limit.limit, 5);
}

#[test]
fn load_or_default_reads_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "config.toml", "[rate_limit]\nenabled = false\n");

    let config = Config::load_or_default(Some(&path)).unwrap();
    assert!(!config.rate_limit.enabled);
}

#[test]
fn invalid_toml_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "config.toml", "[cache\nmax_entries = ");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, GatewayError::Configuration(_)));
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn loaded_config_builds_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "config.toml",
        r#"
        [backend.chat_completion]
        base_url = "http://localhost:8000/v1"
        model = "llama3"
        "#,
    );

    let config = Config::load(Some(&path)).unwrap();
    let gateway = config.builder(&Secrets::default()).build().unwrap();
    assert!(gateway.has_backend(BackendChoice::Mock));
    assert!(gateway.has_backend(BackendChoice::ChatCompletion));
}

#[test]
fn zero_capacity_fails_at_build() {
    let config = Config::from_toml_str("[cache]\nmax_entries = 0\n").unwrap();
    let result = config.builder(&Secrets::default()).build();
    assert!(matches!(result, Err(GatewayError::Configuration(_))));
}

// ============================================================================
// Secrets
// ============================================================================

#[cfg(unix)]
mod secrets {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    const SECRETS: &str = "[chat_completion]\napi_key = \"sk-from-file\"\n";

    #[test]
    fn owner_only_permissions_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "secrets.toml", SECRETS);
        std::fs::set_permissions(&path, Permissions::from_mode(0o600)).unwrap();

        let secrets = Secrets::load_from_file(&path).unwrap();
        assert_eq!(secrets.api_key(), Some("sk-from-file".to_string()));
    }

    #[test]
    fn read_only_permissions_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "secrets.toml", SECRETS);
        std::fs::set_permissions(&path, Permissions::from_mode(0o400)).unwrap();

        assert!(Secrets::load_from_file(&path).is_ok());
    }

    #[test]
    fn world_readable_secrets_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "secrets.toml", SECRETS);
        std::fs::set_permissions(&path, Permissions::from_mode(0o644)).unwrap();

        let err = Secrets::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));
    }

    #[test]
    fn missing_secrets_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Secrets::load_from_file(&path).is_err());
    }
}
