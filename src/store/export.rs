//! Streaming reads of one partition joined with its headers.

use std::io::Write;

use super::Store;

use crate::{errors::IgraDataErr, partition::partition_table};

// Header columns first, then level columns, with unambiguous names.
const EXPORT_COLUMNS: &str =
    "h.id AS id, h.station_id AS station_id, h.year AS year, h.month AS month, h.day AS day, \
     h.hour AS hour, h.reltime AS reltime, h.p_src AS p_src, h.np_src AS np_src, \
     h.lat AS lat, h.lon AS lon, \
     l.id AS level_id, l.header_id AS header_id, l.lvltyp1 AS lvltyp1, l.lvltyp2 AS lvltyp2, \
     l.etime AS etime, l.press AS press, l.pflag AS pflag, l.gph AS gph, l.zflag AS zflag, \
     l.temp AS temp, l.tflag AS tflag, l.rh AS rh, l.dpdp AS dpdp, l.wdir AS wdir, l.wspd AS wspd";

impl Store {
    /// Stream one partition's level rows joined with their owning headers.
    ///
    /// Writes a first row naming every joined column, then one comma-delimited
    /// row per level, ordered by `(header_id, level_id)` so repeated exports of
    /// the same data are identical. Rows flow straight from the read cursor to
    /// the sink; the result set is never materialized. Returns the number of
    /// data rows written.
    pub fn stream_partition(
        &self,
        bucket: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, IgraDataErr> {
        let mut stmt = self.db_conn.prepare(&format!(
            "SELECT {} FROM {} AS l INNER JOIN header AS h ON l.header_id = h.id
                  ORDER BY l.header_id, l.id",
            EXPORT_COLUMNS,
            partition_table(bucket),
        ))?;

        writeln!(sink, "{}", stmt.column_names().join(","))?;

        let num_columns = stmt.column_count();
        let mut rows = stmt.query(rusqlite::NO_PARAMS)?;

        let mut written = 0u64;
        while let Some(row) = rows.next()? {
            let mut line = String::new();
            for i in 0..num_columns {
                if i > 0 {
                    line.push(',');
                }
                push_value(&mut line, row.get(i)?)?;
            }

            writeln!(sink, "{}", line)?;
            written += 1;
        }

        Ok(written)
    }
}

// NULL becomes an empty field, everything else its plain text form. No column
// in this schema can hold a delimiter, so no quoting is needed.
fn push_value(line: &mut String, value: rusqlite::types::Value) -> Result<(), IgraDataErr> {
    use rusqlite::types::Value::*;

    match value {
        Null => {}
        Integer(int) => line.push_str(&int.to_string()),
        Real(float) => line.push_str(&float.to_string()),
        Text(text) => line.push_str(&text),
        Blob(_) => return Err(IgraDataErr::LogicError("blob column in export")),
    }

    Ok(())
}

#[cfg(test)]
mod unit {
    use crate::parser::test_lines::{sample_header, sample_level};
    use crate::partition::{PartitionPlan, DEFAULT_BUCKET};
    use crate::store::unit::*;

    #[test]
    fn test_stream_partition() {
        let TestStore { tmp: _tmp, store } =
            create_test_store().expect("Failed to create test store.");

        let levels = vec![sample_level(Some(500)), sample_level(Some(700))];
        let (header_id, _) = store
            .insert_sounding(&sample_header(), &levels)
            .expect("Error inserting sounding.");

        let plan = PartitionPlan::build(500, 700, 1000).expect("build failure");
        store.rebuild_partitions(&plan).expect("rebuild failure");

        let mut sink: Vec<u8> = vec![];
        let written = store
            .stream_partition("0", &mut sink)
            .expect("stream failure");
        assert_eq!(written, 2);

        let text = String::from_utf8(sink).expect("invalid utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        assert!(lines[0].starts_with("id,station_id,year,month,day,hour,reltime,p_src,np_src,lat,lon,"));
        assert!(lines[0].ends_with("level_id,header_id,lvltyp1,lvltyp2,etime,press,pflag,gph,zflag,temp,tflag,rh,dpdp,wdir,wspd"));

        // Header columns lead each row; the missing hour is an empty field.
        assert!(lines[1].starts_with(&format!("{},USM00070026,2020,1,1,,9999,", header_id)));
        assert!(lines[1].contains(",500,"));
        assert!(lines[2].contains(",700,"));
    }

    #[test]
    fn test_stream_empty_partition_writes_only_column_names() {
        let TestStore { tmp: _tmp, store } =
            create_test_store().expect("Failed to create test store.");

        let (_, _) = store
            .insert_sounding(&sample_header(), &[sample_level(Some(500))])
            .expect("Error inserting sounding.");

        let plan = PartitionPlan::build(500, 500, 1000).expect("build failure");
        store.rebuild_partitions(&plan).expect("rebuild failure");

        let mut sink: Vec<u8> = vec![];
        let written = store
            .stream_partition(DEFAULT_BUCKET, &mut sink)
            .expect("stream failure");

        assert_eq!(written, 0);
        let text = String::from_utf8(sink).expect("invalid utf8");
        assert_eq!(text.lines().count(), 1);
    }
}
