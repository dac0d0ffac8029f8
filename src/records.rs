//! Typed records decoded from the fixed-width archive format.

use std::fmt::Display;

/// New type wrapper for the fixed 11-character station identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId {
    id: String,
}

impl From<&str> for StationId {
    fn from(val: &str) -> Self {
        StationId {
            id: val.to_owned(),
        }
    }
}

impl From<String> for StationId {
    fn from(val: String) -> Self {
        StationId { id: val }
    }
}

impl Display for StationId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(formatter, "{}", self.id)
    }
}

impl StationId {
    /// Test to see if this is a valid station identifier.
    pub fn is_valid(&self) -> bool {
        self.id.len() == 11
    }

    /// View the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.id
    }
}

/// Metadata for one sounding launch, decoded from a `#` header line.
///
/// The raw hour column uses 99 as a missing-value sentinel, so a missing hour
/// is `None` here, never the literal 99. All-blank numeric columns also decode
/// to `None`. Latitude and longitude arrive as fixed-point integers scaled by
/// 1/10000 degree and are decoded to floating values.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRecord {
    pub station_id: StationId,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: Option<u32>,
    pub reltime: Option<i32>,
    pub p_src: Option<String>,
    pub np_src: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl HeaderRecord {
    /// The nominal launch time, if the hour is known and the date is valid.
    pub fn launch_time(&self) -> Option<chrono::NaiveDateTime> {
        let hour = self.hour?;
        chrono::NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
    }
}

/// One vertical measurement within a sounding, decoded from a level line.
///
/// Every column may be blank in the source, so every field is optional. Numeric
/// sentinel values such as -9999 pass through untouched; interpreting quality
/// flags is left to consumers of the exported data.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRecord {
    pub lvltyp1: Option<i16>,
    pub lvltyp2: Option<i16>,
    pub etime: Option<i32>,
    pub press: Option<i32>,
    pub pflag: Option<char>,
    pub gph: Option<i32>,
    pub zflag: Option<char>,
    pub temp: Option<i16>,
    pub tflag: Option<char>,
    pub rh: Option<i32>,
    pub dpdp: Option<i32>,
    pub wdir: Option<i32>,
    pub wspd: Option<i32>,
}
