use std::path::Path;

use super::Store;

use crate::errors::IgraDataErr;

impl Store {
    const DB_FILE: &'static str = "igra.db";

    /// Initialize a new store, creating the root directory if needed.
    ///
    /// The schema statements are all `IF NOT EXISTS`, so calling this on an
    /// existing store is harmless.
    pub fn create(root: &dyn AsRef<Path>) -> Result<Self, IgraDataErr> {
        std::fs::create_dir_all(root.as_ref())?;

        let db_file = root.as_ref().join(Store::DB_FILE);
        let root = root.as_ref().to_path_buf();

        let db_conn = rusqlite::Connection::open_with_flags(
            db_file,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE | rusqlite::OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        Self::set_pragmas(&db_conn)?;
        db_conn.execute_batch(include_str!("root/create_tables.sql"))?;

        Ok(Store { root, db_conn })
    }

    /// Open an existing store.
    pub fn connect(root: &dyn AsRef<Path>) -> Result<Self, IgraDataErr> {
        let db_file = root.as_ref().join(Store::DB_FILE);
        let root = root.as_ref().to_path_buf();

        let db_conn = rusqlite::Connection::open_with_flags(
            db_file,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE,
        )?;

        Self::set_pragmas(&db_conn)?;
        Self::validate_db_structure(&db_conn)?;

        Ok(Store { root, db_conn })
    }

    /// Remove the store file and its write-ahead log, if present.
    pub fn wipe(root: &dyn AsRef<Path>) -> Result<(), IgraDataErr> {
        for suffix in &["", "-wal", "-shm"] {
            let path = root.as_ref().join(format!("{}{}", Store::DB_FILE, suffix));
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }

        Ok(())
    }

    /// Retrieve a path to the root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // Several workers write over their own connections at once; WAL mode and a
    // generous busy timeout make their commits queue instead of failing.
    fn set_pragmas(db_conn: &rusqlite::Connection) -> Result<(), IgraDataErr> {
        db_conn.execute_batch("PRAGMA foreign_keys=ON")?;
        db_conn.busy_timeout(std::time::Duration::from_secs(30))?;

        // This PRAGMA reports the resulting mode as a row.
        let _journal_mode: String =
            db_conn.query_row("PRAGMA journal_mode=WAL", rusqlite::NO_PARAMS, |row| {
                row.get(0)
            })?;

        Ok(())
    }

    /// Validate the database structure is correct.
    fn validate_db_structure(db_conn: &rusqlite::Connection) -> Result<(), IgraDataErr> {
        // Partition tables come and go, so only the two base tables are checked.
        let num_tables: i64 = db_conn.query_row(
            "SELECT COUNT(name) FROM sqlite_master WHERE type='table' AND name IN ('header', 'level')",
            rusqlite::NO_PARAMS,
            |row| row.get(0),
        )?;

        if num_tables != 2 {
            return Err(IgraDataErr::InvalidSchema);
        }

        Ok(())
    }
}
