//! Gateway to the relational store backing the pipeline.

use std::path::PathBuf;

/// The store.
///
/// Owns one connection; every ingestion worker opens its own `Store` so no two
/// workers ever share a transaction context.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,                 // The root directory.
    db_conn: rusqlite::Connection, // An sqlite connection.
}

mod export;
mod insert;
mod partitioned;
mod root;

#[cfg(test)]
pub(crate) mod unit {
    use super::*;
    use crate::errors::IgraDataErr;

    use tempdir::TempDir;

    // struct to hold temporary data for tests.
    pub(crate) struct TestStore {
        pub tmp: TempDir,
        pub store: Store,
    }

    // Function to create a new store to test.
    pub(crate) fn create_test_store() -> Result<TestStore, IgraDataErr> {
        let tmp = TempDir::new("igra-data-test-store")?;
        let store = Store::create(&tmp.path())?;

        Ok(TestStore { tmp, store })
    }

    #[test]
    fn test_store_create_new() {
        assert!(create_test_store().is_ok());
    }

    #[test]
    fn test_store_create_is_idempotent() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");
        drop(store);

        assert!(Store::create(&tmp.path()).is_ok());
    }

    #[test]
    fn test_store_connect() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");
        drop(store);

        assert!(Store::connect(&tmp.path()).is_ok());
        assert!(Store::connect(&"unlikely_directory_in_my_project").is_err());
    }

    #[test]
    fn test_get_root() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let root = store.root();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_wipe() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");
        drop(store);

        Store::wipe(&tmp.path()).expect("Error wiping store.");
        assert!(Store::connect(&tmp.path()).is_err());
    }
}
