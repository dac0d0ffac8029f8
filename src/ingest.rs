//! Parallel multi-file ingestion and the partition barrier.
//!
//! Files are independent of each other and run one-per-task on a fixed-size
//! worker pool. Within a file, processing is strictly sequential: a level line
//! belongs to the most recent header line, so each worker walks its file with
//! a two-state machine and commits one sounding at a time. Partition planning
//! only happens after every worker has finished, since it needs the global
//! height extrema.

use std::{
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use crate::{
    errors::{IgraDataErr, LineError, ParseErrorKind},
    parser::{parse_line, ArchiveRecord},
    partition::PartitionPlan,
    records::{HeaderRecord, LevelRecord},
    store::Store,
};

/// What to do with lines that fail to parse.
///
/// A malformed header line always aborts the remainder of its file, whatever
/// the policy: the level lines that follow it cannot be attributed to any
/// sounding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
pub enum ParseErrorPolicy {
    /// Fail the whole file on the first malformed line.
    #[strum(to_string = "abort", serialize = "ABORT")]
    Abort,
    /// Log and skip malformed level lines, keep going.
    #[strum(to_string = "skip", serialize = "SKIP")]
    Skip,
}

impl ParseErrorPolicy {
    /// Get a static string representation.
    pub fn as_static_str(self) -> &'static str {
        self.into()
    }
}

/// Counters for one completely ingested file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    /// The ingested file.
    pub path: PathBuf,
    /// Soundings committed.
    pub soundings: u64,
    /// Level rows committed.
    pub levels: u64,
    /// Malformed level lines skipped under [`ParseErrorPolicy::Skip`].
    pub skipped_lines: u64,
}

/// Per-file outcomes of one ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    /// Files ingested to completion.
    pub completed: Vec<FileStats>,
    /// Files that failed, with the error that stopped each one.
    pub failed: Vec<(PathBuf, IgraDataErr)>,
}

impl IngestReport {
    /// Total soundings committed across all completed files.
    pub fn soundings(&self) -> u64 {
        self.completed.iter().map(|stats| stats.soundings).sum()
    }

    /// Total level rows committed across all completed files.
    pub fn levels(&self) -> u64 {
        self.completed.iter().map(|stats| stats.levels).sum()
    }
}

/// The number of ingestion workers to use when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4)
}

/// List the archive files (`.txt`, `.txt.gz`) in a directory, sorted by name.
pub fn archive_files_in(dir: &dyn AsRef<Path>) -> Result<Vec<PathBuf>, IgraDataErr> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| {
                    let name = name.to_string_lossy();
                    name.ends_with(".txt") || name.ends_with(".txt.gz")
                })
                .unwrap_or(false)
        })
        .collect();

    files.sort();

    Ok(files)
}

/// Ingest a set of archive files in parallel.
///
/// One task per file on a pool of `workers` threads. Every task opens its own
/// store connection and commits independently, so any interleaving of files
/// produces the same final row set. A failure in one file never stops the
/// others; the report lists each file's outcome.
pub fn ingest_files(
    root: &dyn AsRef<Path>,
    files: &[PathBuf],
    workers: usize,
    policy: ParseErrorPolicy,
) -> Result<IngestReport, IgraDataErr> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|err| IgraDataErr::GeneralError(err.to_string()))?;

    let root = root.as_ref();
    let results: Vec<(PathBuf, Result<FileStats, IgraDataErr>)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| (path.clone(), ingest_file(root, path, policy)))
            .collect()
    });

    let mut report = IngestReport {
        completed: vec![],
        failed: vec![],
    };

    for (path, result) in results {
        match result {
            Ok(stats) => {
                tracing::info!(
                    "ingested {}: {} soundings, {} levels, {} lines skipped",
                    path.display(),
                    stats.soundings,
                    stats.levels,
                    stats.skipped_lines
                );
                report.completed.push(stats);
            }
            Err(err) => {
                tracing::error!("failed to ingest {}: {}", path.display(), err);
                report.failed.push((path, err));
            }
        }
    }

    Ok(report)
}

/// Plan the height partitions from the extrema observed across all files.
///
/// The lower bound is clamped to zero: negative heights are sentinels in the
/// archive format and always belong in the catch-all bucket.
pub fn plan_partitions(store: &Store, bucket_width: i64) -> Result<PartitionPlan, IgraDataErr> {
    let (min, max) = store.gph_extrema()?.ok_or(IgraDataErr::EmptyArchive)?;

    let lower = min.max(0);
    let upper = max.max(lower);

    PartitionPlan::build(lower, upper, bucket_width)
}

// Per-file parse state: a level line is only legal while a sounding is open.
enum SoundingState {
    AwaitingHeader,
    Assembling {
        header: HeaderRecord,
        levels: Vec<LevelRecord>,
    },
}

fn ingest_file(
    root: &Path,
    path: &Path,
    policy: ParseErrorPolicy,
) -> Result<FileStats, IgraDataErr> {
    let store = Store::connect(&root)?;
    let reader = open_archive_file(path)?;

    let mut stats = FileStats {
        path: path.to_path_buf(),
        soundings: 0,
        levels: 0,
        skipped_lines: 0,
    };
    let mut state = SoundingState::AwaitingHeader;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index as u64 + 1;

        match parse_line(&line) {
            Ok(ArchiveRecord::Header(header)) => {
                flush_sounding(&store, &mut state, &mut stats)?;
                state = SoundingState::Assembling {
                    header,
                    levels: Vec::new(),
                };
            }
            Ok(ArchiveRecord::Level(level)) => match &mut state {
                SoundingState::AwaitingHeader => {
                    let orphan = LineError {
                        field: "line",
                        kind: ParseErrorKind::OrphanLevel,
                    };
                    return Err(orphan.at(path, line_no).into());
                }
                SoundingState::Assembling { levels, .. } => levels.push(level),
            },
            Err(line_err) => {
                // A bad header line poisons every level after it, whatever the
                // policy. It also ends the previous sounding, which is complete
                // and worth keeping.
                if line.starts_with('#') {
                    flush_sounding(&store, &mut state, &mut stats)?;
                    return Err(line_err.at(path, line_no).into());
                }

                // A bad level line leaves the open sounding incomplete, so
                // under Abort it is dropped rather than committed short.
                if policy == ParseErrorPolicy::Abort {
                    return Err(line_err.at(path, line_no).into());
                }

                tracing::warn!(
                    "skipping {} line {}: {}",
                    path.display(),
                    line_no,
                    line_err
                );
                stats.skipped_lines += 1;
            }
        }
    }

    flush_sounding(&store, &mut state, &mut stats)?;

    Ok(stats)
}

// Commit the open sounding, if any, in one transaction.
fn flush_sounding(
    store: &Store,
    state: &mut SoundingState,
    stats: &mut FileStats,
) -> Result<(), IgraDataErr> {
    match std::mem::replace(state, SoundingState::AwaitingHeader) {
        SoundingState::AwaitingHeader => Ok(()),
        SoundingState::Assembling { header, levels } => {
            let (_header_id, level_count) = store.insert_sounding(&header, &levels)?;
            stats.soundings += 1;
            stats.levels += level_count as u64;
            Ok(())
        }
    }
}

fn open_archive_file(path: &Path) -> Result<Box<dyn BufRead>, IgraDataErr> {
    let file = std::fs::File::open(path)?;

    if path.to_string_lossy().ends_with(".gz") {
        Ok(Box::new(BufReader::new(flate2::read::GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;
    use crate::parser::test_lines::*;
    use crate::partition::DEFAULT_BUCKET;
    use crate::store::unit::{create_test_store, TestStore};

    use std::io::Write;
    use std::str::FromStr;

    fn write_archive_file(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).expect("Error creating test file.");
        for line in lines {
            writeln!(file, "{}", line).expect("Error writing test file.");
        }
        path
    }

    fn write_gz_archive_file(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).expect("Error creating test file.");
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        for line in lines {
            writeln!(encoder, "{}", line).expect("Error writing test file.");
        }
        encoder.finish().expect("Error finishing test file.");
        path
    }

    fn sample_file_lines(gphs: &[Option<i32>]) -> Vec<String> {
        let mut lines = vec![encode_header(&sample_header())];
        lines.extend(gphs.iter().map(|gph| encode_level(&sample_level(*gph))));
        lines
    }

    #[test]
    fn test_policy_round_trip() {
        use strum::IntoEnumIterator;

        for policy in ParseErrorPolicy::iter() {
            assert_eq!(
                ParseErrorPolicy::from_str(policy.as_static_str()).unwrap(),
                policy
            );
        }
        assert!(ParseErrorPolicy::from_str("mangle").is_err());
    }

    #[test]
    fn test_archive_files_in_filters_and_sorts() {
        let TestStore { tmp, store: _store } =
            create_test_store().expect("Failed to create test store.");

        write_archive_file(tmp.path(), "b.txt", &[]);
        write_archive_file(tmp.path(), "a.txt", &[]);
        write_gz_archive_file(tmp.path(), "c.txt.gz", &[]);
        write_archive_file(tmp.path(), "notes.md", &[]);

        let files = archive_files_in(&tmp.path()).expect("Error listing files.");
        let names: Vec<String> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt.gz"]);
    }

    #[test]
    fn test_end_to_end_single_file() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let lines = sample_file_lines(&[Some(500), Some(1500), Some(2500)]);
        let path = write_archive_file(tmp.path(), "station.txt", &lines);

        let report = ingest_files(&tmp.path(), &[path], 1, ParseErrorPolicy::Abort)
            .expect("Error ingesting.");
        assert!(report.failed.is_empty());
        assert_eq!(report.soundings(), 1);
        assert_eq!(report.levels(), 3);

        assert_eq!(store.header_count().expect("db error"), 1);
        assert_eq!(store.level_count().expect("db error"), 3);

        let plan = plan_partitions(&store, 1000).expect("Error planning.");
        assert_eq!(plan.covered(), (0, 3000));
        assert_eq!(plan.ranges().len(), 3);

        store.rebuild_partitions(&plan).expect("rebuild failure");
        assert_eq!(store.partition_row_count("0").expect("db error"), 1);
        assert_eq!(store.partition_row_count("1").expect("db error"), 1);
        assert_eq!(store.partition_row_count("2").expect("db error"), 1);
        assert_eq!(
            store.partition_row_count(DEFAULT_BUCKET).expect("db error"),
            0
        );
    }

    #[test]
    fn test_gzipped_files_ingest_transparently() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let lines = sample_file_lines(&[Some(500), Some(1500)]);
        let path = write_gz_archive_file(tmp.path(), "station.txt.gz", &lines);

        let report = ingest_files(&tmp.path(), &[path], 1, ParseErrorPolicy::Abort)
            .expect("Error ingesting.");
        assert!(report.failed.is_empty());
        assert_eq!(store.level_count().expect("db error"), 2);
    }

    #[test]
    fn test_files_commit_the_same_rows_in_either_order() {
        let lines_a = sample_file_lines(&[Some(500), Some(1500)]);
        let mut header_b = sample_header();
        header_b.station_id = crate::records::StationId::from("CAM00071082");
        let mut lines_b = vec![encode_header(&header_b)];
        lines_b.push(encode_level(&sample_level(Some(2500))));

        let mut row_sets = vec![];
        for order in &[["a.txt", "b.txt"], ["b.txt", "a.txt"]] {
            let TestStore { tmp, store } =
                create_test_store().expect("Failed to create test store.");
            write_archive_file(tmp.path(), "a.txt", &lines_a);
            write_archive_file(tmp.path(), "b.txt", &lines_b);

            let files: Vec<PathBuf> = order.iter().map(|name| tmp.path().join(name)).collect();
            let report = ingest_files(&tmp.path(), &files, 2, ParseErrorPolicy::Abort)
                .expect("Error ingesting.");
            assert!(report.failed.is_empty());

            assert_eq!(store.header_count().expect("db error"), 2);
            assert_eq!(store.level_count().expect("db error"), 3);

            let plan = plan_partitions(&store, 1000).expect("Error planning.");
            store.rebuild_partitions(&plan).expect("rebuild failure");
            let counts: Vec<u64> = plan
                .ranges()
                .iter()
                .map(|range| store.partition_row_count(&range.name()).expect("db error"))
                .collect();
            row_sets.push(counts);
        }

        assert_eq!(row_sets[0], row_sets[1]);
    }

    #[test]
    fn test_orphan_level_fails_the_file() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let lines = vec![encode_level(&sample_level(Some(500)))];
        let path = write_archive_file(tmp.path(), "orphan.txt", &lines);

        let report = ingest_files(&tmp.path(), &[path], 1, ParseErrorPolicy::Skip)
            .expect("Error ingesting.");

        assert_eq!(report.failed.len(), 1);
        match &report.failed[0].1 {
            IgraDataErr::Parse(err) => {
                assert_eq!(err.line, 1);
                assert_eq!(err.kind, ParseErrorKind::OrphanLevel);
            }
            other => panic!("wrong error type: {:?}", other),
        }
        assert_eq!(store.level_count().expect("db error"), 0);
    }

    #[test]
    fn test_one_bad_file_does_not_stop_the_others() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let good = write_archive_file(
            tmp.path(),
            "good.txt",
            &sample_file_lines(&[Some(500), Some(1500)]),
        );
        let bad = write_archive_file(
            tmp.path(),
            "bad.txt",
            &vec![encode_level(&sample_level(Some(500)))],
        );

        let report = ingest_files(
            &tmp.path(),
            &[good, bad],
            2,
            ParseErrorPolicy::Abort,
        )
        .expect("Error ingesting.");

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(store.level_count().expect("db error"), 2);
    }

    #[test]
    fn test_skip_policy_skips_only_level_lines() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let mut lines = sample_file_lines(&[Some(500)]);
        let mut corrupt = encode_level(&sample_level(Some(1500)));
        corrupt.replace_range(16..21, "abcde");
        lines.push(corrupt);
        lines.push(encode_level(&sample_level(Some(2500))));
        let path = write_archive_file(tmp.path(), "station.txt", &lines);

        let report = ingest_files(&tmp.path(), &[path], 1, ParseErrorPolicy::Skip)
            .expect("Error ingesting.");

        assert!(report.failed.is_empty());
        assert_eq!(report.completed[0].skipped_lines, 1);
        assert_eq!(store.level_count().expect("db error"), 2);
    }

    #[test]
    fn test_abort_policy_fails_the_file() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let mut lines = sample_file_lines(&[Some(500)]);
        let mut corrupt = encode_level(&sample_level(Some(1500)));
        corrupt.replace_range(16..21, "abcde");
        lines.push(corrupt);
        let path = write_archive_file(tmp.path(), "station.txt", &lines);

        let report = ingest_files(&tmp.path(), &[path], 1, ParseErrorPolicy::Abort)
            .expect("Error ingesting.");

        assert!(report.completed.is_empty());
        assert_eq!(report.failed.len(), 1);
        // The open sounding was never committed.
        assert_eq!(store.level_count().expect("db error"), 0);
    }

    #[test]
    fn test_bad_header_aborts_even_under_skip() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let mut lines = sample_file_lines(&[Some(500)]);
        let mut corrupt_header = encode_header(&sample_header());
        corrupt_header.replace_range(13..17, "2o2o");
        lines.push(corrupt_header);
        lines.push(encode_level(&sample_level(Some(1500))));
        let path = write_archive_file(tmp.path(), "station.txt", &lines);

        let report = ingest_files(&tmp.path(), &[path], 1, ParseErrorPolicy::Skip)
            .expect("Error ingesting.");

        assert_eq!(report.failed.len(), 1);
        match &report.failed[0].1 {
            IgraDataErr::Parse(err) => assert_eq!(err.field, "year"),
            other => panic!("wrong error type: {:?}", other),
        }
        // Nothing after the corrupt header line was committed.
        assert_eq!(store.header_count().expect("db error"), 1);
        assert_eq!(store.level_count().expect("db error"), 1);
    }

    #[test]
    fn test_plan_partitions_clamps_negative_minimum() {
        let TestStore { tmp, store } = create_test_store().expect("Failed to create test store.");

        let lines = sample_file_lines(&[Some(-9999), Some(2500)]);
        let path = write_archive_file(tmp.path(), "station.txt", &lines);
        ingest_files(&tmp.path(), &[path], 1, ParseErrorPolicy::Abort)
            .expect("Error ingesting.");

        let plan = plan_partitions(&store, 1000).expect("Error planning.");
        assert_eq!(plan.covered(), (0, 3000));

        store.rebuild_partitions(&plan).expect("rebuild failure");
        assert_eq!(
            store.partition_row_count(DEFAULT_BUCKET).expect("db error"),
            1
        );
    }

    #[test]
    fn test_plan_partitions_requires_data() {
        let TestStore {
            tmp: _tmp,
            store,
        } = create_test_store().expect("Failed to create test store.");

        match plan_partitions(&store, 1000) {
            Err(IgraDataErr::EmptyArchive) => {}
            other => panic!("wrong result: {:?}", other),
        }
    }
}
