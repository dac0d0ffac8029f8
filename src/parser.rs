//! Pure parser for the fixed-width archive line format.
//!
//! A line whose first byte is `#` is a sounding header; every other line is a
//! vertical level. Fields live at fixed byte offsets, are trimmed, and decode
//! to their semantic types. The parser does no I/O and knows nothing about
//! files or storage; see [`crate::errors::LineError`] for how errors pick up
//! file and line context later.

use crate::errors::{LineError, ParseErrorKind};
use crate::records::{HeaderRecord, LevelRecord, StationId};

/// Scale factor for the fixed-point latitude and longitude columns.
const COORD_SCALE: f64 = 10_000.0;

/// Sentinel in the hour column meaning the hour is unknown.
const MISSING_HOUR: u32 = 99;

// Header line columns.
const STATION_ID: Field = Field::new("station_id", 1, 12);
const YEAR: Field = Field::new("year", 13, 17);
const MONTH: Field = Field::new("month", 18, 20);
const DAY: Field = Field::new("day", 21, 23);
const HOUR: Field = Field::new("hour", 24, 26);
const RELTIME: Field = Field::new("reltime", 27, 31);
const P_SRC: Field = Field::new("p_src", 37, 45);
const NP_SRC: Field = Field::new("np_src", 46, 54);
const LAT: Field = Field::new("lat", 55, 62);
const LON: Field = Field::new("lon", 63, 71);

// Level line columns.
const LVLTYP1: Field = Field::new("lvltyp1", 0, 1);
const LVLTYP2: Field = Field::new("lvltyp2", 1, 2);
const ETIME: Field = Field::new("etime", 3, 8);
const PRESS: Field = Field::new("press", 9, 15);
const PFLAG: Field = Field::new("pflag", 15, 16);
const GPH: Field = Field::new("gph", 16, 21);
const ZFLAG: Field = Field::new("zflag", 21, 22);
const TEMP: Field = Field::new("temp", 22, 27);
const TFLAG: Field = Field::new("tflag", 27, 28);
const RH: Field = Field::new("rh", 29, 33);
const DPDP: Field = Field::new("dpdp", 34, 39);
const WDIR: Field = Field::new("wdir", 40, 45);
const WSPD: Field = Field::new("wspd", 46, 51);

/// One classified line of an archive file.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveRecord {
    /// A sounding header line.
    Header(HeaderRecord),
    /// A vertical level line.
    Level(LevelRecord),
}

/// Classify and decode one line of an archive file.
pub fn parse_line(line: &str) -> Result<ArchiveRecord, LineError> {
    if line.starts_with('#') {
        parse_header(line).map(ArchiveRecord::Header)
    } else {
        parse_level(line).map(ArchiveRecord::Level)
    }
}

fn parse_header(line: &str) -> Result<HeaderRecord, LineError> {
    let station_raw = STATION_ID.slice(line)?;
    if station_raw.is_empty() {
        return Err(LineError {
            field: STATION_ID.name,
            kind: ParseErrorKind::Blank,
        });
    }

    // 99 means the hour was not recorded.
    let hour = HOUR
        .int::<u32>(line)?
        .and_then(|hr| if hr == MISSING_HOUR { None } else { Some(hr) });

    Ok(HeaderRecord {
        station_id: StationId::from(station_raw),
        year: YEAR.required_int(line)?,
        month: MONTH.required_int(line)?,
        day: DAY.required_int(line)?,
        hour,
        reltime: RELTIME.int(line)?,
        p_src: P_SRC.text(line)?,
        np_src: NP_SRC.text(line)?,
        lat: LAT.required_int::<i64>(line)? as f64 / COORD_SCALE,
        lon: LON.required_int::<i64>(line)? as f64 / COORD_SCALE,
    })
}

fn parse_level(line: &str) -> Result<LevelRecord, LineError> {
    Ok(LevelRecord {
        lvltyp1: LVLTYP1.int(line)?,
        lvltyp2: LVLTYP2.int(line)?,
        etime: ETIME.int(line)?,
        press: PRESS.int(line)?,
        pflag: PFLAG.flag(line)?,
        gph: GPH.int(line)?,
        zflag: ZFLAG.flag(line)?,
        temp: TEMP.int(line)?,
        tflag: TFLAG.flag(line)?,
        rh: RH.int(line)?,
        dpdp: DPDP.int(line)?,
        wdir: WDIR.int(line)?,
        wspd: WSPD.int(line)?,
    })
}

// A named byte-column range within a line.
struct Field {
    name: &'static str,
    start: usize,
    end: usize,
}

impl Field {
    const fn new(name: &'static str, start: usize, end: usize) -> Self {
        Field { name, start, end }
    }

    /// Slice this field out of the line and trim it.
    fn slice<'a>(&self, line: &'a str) -> Result<&'a str, LineError> {
        let bytes = line.as_bytes();
        if bytes.len() < self.end {
            return Err(LineError {
                field: self.name,
                kind: ParseErrorKind::ShortLine {
                    len: bytes.len(),
                    need: self.end,
                },
            });
        }

        match std::str::from_utf8(&bytes[self.start..self.end]) {
            Ok(raw) => Ok(raw.trim()),
            Err(_) => Err(LineError {
                field: self.name,
                kind: ParseErrorKind::BadNumber(
                    String::from_utf8_lossy(&bytes[self.start..self.end]).to_string(),
                ),
            }),
        }
    }

    /// Decode a numeric field; all-blank decodes to `None`, never to zero.
    fn int<T: std::str::FromStr>(&self, line: &str) -> Result<Option<T>, LineError> {
        let raw = self.slice(line)?;
        if raw.is_empty() {
            return Ok(None);
        }

        raw.parse().map(Some).map_err(|_| LineError {
            field: self.name,
            kind: ParseErrorKind::BadNumber(raw.to_owned()),
        })
    }

    /// Decode a numeric field that must be present on a well-formed line.
    fn required_int<T: std::str::FromStr>(&self, line: &str) -> Result<T, LineError> {
        self.int(line)?.ok_or(LineError {
            field: self.name,
            kind: ParseErrorKind::Blank,
        })
    }

    /// Decode a one-character flag field; blank decodes to `None`.
    fn flag(&self, line: &str) -> Result<Option<char>, LineError> {
        Ok(self.slice(line)?.chars().next())
    }

    /// Decode a trimmed text field; blank decodes to `None`.
    fn text(&self, line: &str) -> Result<Option<String>, LineError> {
        let raw = self.slice(line)?;
        if raw.is_empty() {
            Ok(None)
        } else {
            Ok(Some(raw.to_owned()))
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                 Test support: encoding sample lines
--------------------------------------------------------------------------------------------------*/

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
