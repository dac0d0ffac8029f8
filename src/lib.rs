#![deny(missing_docs)]
//! Package to load, range-partition, and export an archive of IGRA fixed-width sounding files.

//
// Public API
//
pub use crate::cmd_line::CommonCmdLineArgs;
pub use crate::errors::{IgraDataErr, LineError, ParseError, ParseErrorKind};
pub use crate::export::{export_partitions, ExportReport};
pub use crate::ingest::{
    archive_files_in, default_workers, ingest_files, plan_partitions, FileStats, IngestReport,
    ParseErrorPolicy,
};
pub use crate::parser::{parse_line, ArchiveRecord};
pub use crate::partition::{Bucket, PartitionPlan, PartitionRange, DEFAULT_BUCKET};
pub use crate::records::{HeaderRecord, LevelRecord, StationId};
pub use crate::store::Store;

//
// Implementation only
//
extern crate chrono;
extern crate clap;
extern crate dirs;
extern crate flate2;
extern crate rayon;
extern crate rusqlite;
extern crate strum;
extern crate strum_macros;
extern crate tracing;

mod cmd_line;
mod errors;
mod export;
mod ingest;
mod parser;
mod partition;
mod records;
mod store;

#[cfg(test)]
extern crate tempdir;
