//! Creation and population of the range-partitioned level tables.
//!
//! A partition is a physical table named for its bucket. Rebuilding drops and
//! recreates every partition table and bulk-copies the level rows into their
//! buckets inside one transaction, so a rebuild against the same data always
//! reproduces the same boundaries and row counts.

use super::Store;

use crate::{
    errors::IgraDataErr,
    partition::{partition_table, PartitionPlan, DEFAULT_BUCKET},
};

impl Store {
    /// Minimum and maximum geopotential height over all committed level rows.
    ///
    /// Rows with a missing height are ignored; `None` means no level row has a
    /// usable height at all.
    pub fn gph_extrema(&self) -> Result<Option<(i64, i64)>, IgraDataErr> {
        let extrema: (Option<i64>, Option<i64>) = self.db_conn.query_row(
            "SELECT MIN(gph), MAX(gph) FROM level",
            rusqlite::NO_PARAMS,
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        match extrema {
            (Some(min), Some(max)) => Ok(Some((min, max))),
            _ => Ok(None),
        }
    }

    /// Drop, recreate, and repopulate every partition table for the plan.
    pub fn rebuild_partitions(&self, plan: &PartitionPlan) -> Result<(), IgraDataErr> {
        self.db_conn.execute_batch("BEGIN TRANSACTION")?;

        match self.rebuild_partition_tables(plan) {
            Ok(()) => {
                self.db_conn.execute_batch("COMMIT TRANSACTION")?;
                Ok(())
            }
            Err(err) => {
                let _ = self.db_conn.execute_batch("ROLLBACK TRANSACTION");
                Err(err)
            }
        }
    }

    fn rebuild_partition_tables(&self, plan: &PartitionPlan) -> Result<(), IgraDataErr> {
        for range in plan.ranges() {
            let table = partition_table(&range.name());
            self.recreate_partition(&table)?;

            let copied = self.db_conn.execute(
                &format!(
                    "INSERT INTO {} SELECT * FROM level WHERE gph >= ?1 AND gph < ?2",
                    table
                ),
                &[
                    &range.lower as &dyn rusqlite::types::ToSql,
                    &range.upper,
                ],
            )?;
            tracing::debug!("copied {} level rows into {}", copied, table);
        }

        // Everything the explicit ranges miss lands in the catch-all,
        // missing heights included.
        let table = partition_table(DEFAULT_BUCKET);
        self.recreate_partition(&table)?;

        let (lower, upper) = plan.covered();
        let copied = self.db_conn.execute(
            &format!(
                "INSERT INTO {} SELECT * FROM level WHERE gph IS NULL OR gph < ?1 OR gph >= ?2",
                table
            ),
            &[&lower as &dyn rusqlite::types::ToSql, &upper],
        )?;
        tracing::debug!("copied {} level rows into {}", copied, table);

        Ok(())
    }

    fn recreate_partition(&self, table: &str) -> Result<(), IgraDataErr> {
        self.db_conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", table))?;

        self.db_conn.execute_batch(&format!(
            "CREATE TABLE {} (
                id        INTEGER PRIMARY KEY,
                header_id INTEGER NOT NULL REFERENCES header(id),
                lvltyp1   INTEGER,
                lvltyp2   INTEGER,
                etime     INTEGER,
                press     INTEGER,
                pflag     TEXT,
                gph       INTEGER,
                zflag     TEXT,
                temp      INTEGER,
                tflag     TEXT,
                rh        INTEGER,
                dpdp      INTEGER,
                wdir      INTEGER,
                wspd      INTEGER
            )",
            table
        ))?;

        Ok(())
    }

    /// Number of rows currently in one partition table.
    pub fn partition_row_count(&self, bucket: &str) -> Result<u64, IgraDataErr> {
        let count: i64 = self.db_conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", partition_table(bucket)),
            rusqlite::NO_PARAMS,
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }

    /// Number of committed header rows.
    pub fn header_count(&self) -> Result<u64, IgraDataErr> {
        let count: i64 = self.db_conn.query_row(
            "SELECT COUNT(*) FROM header",
            rusqlite::NO_PARAMS,
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }

    /// Number of committed level rows.
    pub fn level_count(&self) -> Result<u64, IgraDataErr> {
        let count: i64 = self.db_conn.query_row(
            "SELECT COUNT(*) FROM level",
            rusqlite::NO_PARAMS,
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }

    /// Number of committed level rows owned by one header.
    pub fn level_count_for_header(&self, header_id: i64) -> Result<u64, IgraDataErr> {
        let count: i64 = self.db_conn.query_row(
            "SELECT COUNT(*) FROM level WHERE header_id = ?1",
            &[&header_id],
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }
}

#[cfg(test)]
mod unit {
    use crate::parser::test_lines::{sample_header, sample_level};
    use crate::partition::{PartitionPlan, DEFAULT_BUCKET};
    use crate::store::unit::*;

    #[test]
    fn test_gph_extrema() {
        let TestStore { tmp: _tmp, store } =
            create_test_store().expect("Failed to create test store.");

        assert_eq!(store.gph_extrema().expect("db error"), None);

        let levels = vec![
            sample_level(Some(1500)),
            sample_level(Some(500)),
            sample_level(Some(2500)),
            sample_level(None),
        ];
        store
            .insert_sounding(&sample_header(), &levels)
            .expect("Error inserting sounding.");

        assert_eq!(store.gph_extrema().expect("db error"), Some((500, 2500)));
    }

    #[test]
    fn test_rebuild_partitions_routes_every_row() {
        let TestStore { tmp: _tmp, store } =
            create_test_store().expect("Failed to create test store.");

        let levels = vec![
            sample_level(Some(500)),
            sample_level(Some(1500)),
            sample_level(Some(2500)),
            sample_level(Some(-9999)),
            sample_level(None),
        ];
        store
            .insert_sounding(&sample_header(), &levels)
            .expect("Error inserting sounding.");

        let plan = PartitionPlan::build(500, 2500, 1000).expect("build failure");
        store.rebuild_partitions(&plan).expect("rebuild failure");

        assert_eq!(store.partition_row_count("0").expect("db error"), 1);
        assert_eq!(store.partition_row_count("1").expect("db error"), 1);
        assert_eq!(store.partition_row_count("2").expect("db error"), 1);
        assert_eq!(
            store.partition_row_count(DEFAULT_BUCKET).expect("db error"),
            2
        );
    }

    #[test]
    fn test_rebuild_partitions_is_idempotent() {
        let TestStore { tmp: _tmp, store } =
            create_test_store().expect("Failed to create test store.");

        let levels = vec![
            sample_level(Some(500)),
            sample_level(Some(1500)),
            sample_level(Some(2500)),
        ];
        store
            .insert_sounding(&sample_header(), &levels)
            .expect("Error inserting sounding.");

        let plan = PartitionPlan::build(500, 2500, 1000).expect("build failure");

        store.rebuild_partitions(&plan).expect("rebuild failure");
        let first: Vec<u64> = ["0", "1", "2", DEFAULT_BUCKET]
            .iter()
            .map(|bucket| store.partition_row_count(bucket).expect("db error"))
            .collect();

        store.rebuild_partitions(&plan).expect("rebuild failure");
        let second: Vec<u64> = ["0", "1", "2", DEFAULT_BUCKET]
            .iter()
            .map(|bucket| store.partition_row_count(bucket).expect("db error"))
            .collect();

        assert_eq!(first, vec![1, 1, 1, 0]);
        assert_eq!(first, second);
    }
}
