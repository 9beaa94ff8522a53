use std::fs;

use portal_engine::{
    ensure_state_dir, AtomicFileWriter, FileTokenStore, MemoryTokenStore, TokenStore,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn file_store_round_trips_and_clears() {
    let temp = TempDir::new().unwrap();
    let store = FileTokenStore::new(temp.path().join("state"));

    assert_eq!(store.load(), None);
    store.save("tok-123").unwrap();
    assert_eq!(store.load().as_deref(), Some("tok-123"));
    assert!(fs::read_to_string(store.path()).unwrap().contains("tok-123"));

    store.save("tok-456").unwrap();
    assert_eq!(store.load().as_deref(), Some("tok-456"));

    store.clear().unwrap();
    assert_eq!(store.load(), None);
    store.clear().unwrap();
}

#[test]
fn corrupt_token_file_reads_as_absent() {
    let temp = TempDir::new().unwrap();
    let store = FileTokenStore::new(temp.path().to_path_buf());
    fs::write(store.path(), "not ron at all {").unwrap();

    assert_eq!(store.load(), None);
}

#[test]
fn state_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    assert!(ensure_state_dir(&file_path).is_err());
    let store = FileTokenStore::new(file_path);
    assert!(store.save("tok").is_err());
}

#[test]
fn memory_store_counts_saves() {
    let store = MemoryTokenStore::with_token("seed");
    assert_eq!(store.load().as_deref(), Some("seed"));
    assert_eq!(store.save_count(), 0);

    store.save("next").unwrap();
    store.clear().unwrap();

    assert_eq!(store.save_count(), 1);
    assert_eq!(store.load(), None);
}

#[test]
fn binary_content_is_written_into_a_new_directory() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("downloads"));

    let path = writer.write_bytes("scan.tif", &[0x49, 0x49, 0x2a, 0x00]).unwrap();

    assert_eq!(path, temp.path().join("downloads").join("scan.tif"));
    assert_eq!(fs::read(&path).unwrap(), vec![0x49, 0x49, 0x2a, 0x00]);
}
