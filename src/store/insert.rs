use super::Store;

use crate::{
    errors::IgraDataErr,
    records::{HeaderRecord, LevelRecord},
};

impl Store {
    /// Insert one sounding: the header and all of its levels, atomically.
    ///
    /// The generated header identity is read back before the first level
    /// insert is issued, so every level row references a header committed in
    /// the same transaction. Any failure rolls the whole sounding back.
    ///
    /// Returns the generated header id and the number of levels inserted.
    pub fn insert_sounding(
        &self,
        header: &HeaderRecord,
        levels: &[LevelRecord],
    ) -> Result<(i64, usize), IgraDataErr> {
        self.db_conn.execute_batch("BEGIN IMMEDIATE TRANSACTION")?;

        match self.insert_sounding_rows(header, levels) {
            Ok(header_id) => {
                self.db_conn.execute_batch("COMMIT TRANSACTION")?;
                Ok((header_id, levels.len()))
            }
            Err(err) => {
                let _ = self.db_conn.execute_batch("ROLLBACK TRANSACTION");
                Err(err)
            }
        }
    }

    fn insert_sounding_rows(
        &self,
        header: &HeaderRecord,
        levels: &[LevelRecord],
    ) -> Result<i64, IgraDataErr> {
        self.db_conn.execute(
            "INSERT INTO header (station_id, year, month, day, hour, reltime, p_src, np_src, lat, lon)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            &[
                &header.station_id.as_str() as &dyn rusqlite::types::ToSql,
                &header.year,
                &header.month,
                &header.day,
                &header.hour,
                &header.reltime,
                &header.p_src,
                &header.np_src,
                &header.lat,
                &header.lon,
            ],
        )?;

        let header_id = self.db_conn.last_insert_rowid();

        let mut stmt = self.db_conn.prepare(
            "INSERT INTO level (header_id, lvltyp1, lvltyp2, etime, press, pflag, gph, zflag,
                                temp, tflag, rh, dpdp, wdir, wspd)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )?;

        for level in levels {
            let pflag = level.pflag.map(String::from);
            let zflag = level.zflag.map(String::from);
            let tflag = level.tflag.map(String::from);

            stmt.execute(&[
                &header_id as &dyn rusqlite::types::ToSql,
                &level.lvltyp1,
                &level.lvltyp2,
                &level.etime,
                &level.press,
                &pflag,
                &level.gph,
                &zflag,
                &level.temp,
                &tflag,
                &level.rh,
                &level.dpdp,
                &level.wdir,
                &level.wspd,
            ])?;
        }

        Ok(header_id)
    }
}
