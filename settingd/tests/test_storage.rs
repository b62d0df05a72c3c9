//! File store tests

mod common;

use std::path::PathBuf;

use settingd::storage::adapter::PersistenceAdapter;
use settingd::storage::file::FileStore;

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("settingd-test-{}", std::process::id()))
        .join(name)
}

#[tokio::test]
async fn test_load_missing_store_is_empty_not_error() {
    let store = FileStore::new(scratch_path("does-not-exist/devices.json"));
    let devices = store.load().await.unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_save_then_load_preserves_devices() {
    let path = scratch_path("roundtrip/devices.json");
    let store = FileStore::new(&path);

    let devices = vec![
        common::device("192.168.1.5", "Lamp", "AA:11", true),
        common::device("192.168.1.6", "Relay", "BB:22", false),
    ];
    store.save(&devices).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded, devices);

    // Overwrite is wholesale, not append
    store.save(&devices[..1]).await.unwrap();
    assert_eq!(store.load().await.unwrap().len(), 1);

    let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
}

#[tokio::test]
async fn test_load_rejects_corrupt_store() {
    let path = scratch_path("corrupt/devices.json");
    tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    tokio::fs::write(&path, b"not json").await.unwrap();

    let store = FileStore::new(&path);
    assert!(store.load().await.is_err());

    let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
}
