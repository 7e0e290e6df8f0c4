// ═══════════════════════════════════════════════════════════════════
// Storage Tests — FileStorage and MemoryStorage backends
// ═══════════════════════════════════════════════════════════════════

use std::sync::Arc;

use receipt_scanner_core::errors::CoreError;
use receipt_scanner_core::storage::backend::{FileStorage, MemoryStorage, StorageBackend};

// ── FileStorage ─────────────────────────────────────────────────────

mod file_storage {
    use super::*;

    #[test]
    fn missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert_eq!(storage.read("receipt_history").unwrap(), None);
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.write("receipt_history", "[]").unwrap();

        assert_eq!(storage.read("receipt_history").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("receipt_history.json").exists());
    }

    #[test]
    fn overwrite_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.write("k", "first").unwrap();
        storage.write("k", "second").unwrap();

        assert_eq!(storage.read("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn no_temporary_file_is_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.write("k", "v").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(&nested);

        storage.write("k", "v").unwrap();

        assert!(nested.join("k.json").exists());
        assert_eq!(storage.dir(), nested.as_path());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.write("k", "v").unwrap();

        storage.delete("k").unwrap();
        storage.delete("k").unwrap();

        assert_eq!(storage.read("k").unwrap(), None);
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        for key in ["../escape", "a/b", "", "white space"] {
            assert!(matches!(storage.write(key, "v"), Err(CoreError::Storage(_))), "{key:?}");
            assert!(matches!(storage.read(key), Err(CoreError::Storage(_))), "{key:?}");
        }
    }
}

// ── MemoryStorage ───────────────────────────────────────────────────

mod memory_storage {
    use super::*;

    #[test]
    fn keys_are_independent() {
        let storage = MemoryStorage::new();
        storage.write("a", "1").unwrap();
        storage.write("b", "2").unwrap();
        storage.delete("a").unwrap();

        assert_eq!(storage.read("a").unwrap(), None);
        assert_eq!(storage.read("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn shared_handle_sees_writes() {
        let storage = Arc::new(MemoryStorage::new());
        let handle: Box<dyn StorageBackend> = Box::new(storage.clone());

        handle.write("k", "v").unwrap();

        assert_eq!(storage.read("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn invalid_key_is_rejected() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.write("no/slashes", "v"), Err(CoreError::Storage(_))));
    }
}
