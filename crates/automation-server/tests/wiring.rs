//! Server wiring tests

use automation_server::{build_state, Settings, StoreKind};
use tempfile::TempDir;

fn settings_in(dir: &TempDir) -> Settings {
    Settings {
        config_dir: dir.path().to_path_buf(),
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_generated_key_is_persisted() {
    let dir = TempDir::new().unwrap();
    let settings = settings_in(&dir);

    let first = build_state(&settings).await.unwrap();
    let key = first.api_key().unwrap().to_string();
    assert_eq!(key.len(), 32);
    assert!(dir
        .path()
        .join(".storage")
        .join("automation_api.config_entry")
        .exists());

    let second = build_state(&settings).await.unwrap();
    assert_eq!(second.api_key(), Some(key.as_str()));
}

#[tokio::test]
async fn test_configured_key_wins() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings_in(&dir);
    build_state(&settings).await.unwrap();

    settings.api_key = Some("configured-key".to_string());
    settings.store = StoreKind::Json;
    let state = build_state(&settings).await.unwrap();
    assert_eq!(state.api_key(), Some("configured-key"));

    settings.api_key = None;
    let state = build_state(&settings).await.unwrap();
    assert_eq!(state.api_key(), Some("configured-key"));
}
