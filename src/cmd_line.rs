//! Command line options that are used across applications.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{App, Arg, ArgMatches};
use dirs::home_dir;

use crate::errors::IgraDataErr;
use crate::ingest::{default_workers, ParseErrorPolicy};

/// Struct to package up command line arguments.
#[derive(Clone, Debug)]
pub struct CommonCmdLineArgs {
    // Path to the root of the archive store.
    root: PathBuf,
    // Directory holding the fixed-width input files.
    data_dir: PathBuf,
    // Directory the per-partition export files are written into.
    export_dir: PathBuf,
    // Height width of one partition bucket.
    bucket_width: i64,
    // Number of parallel ingestion workers.
    workers: usize,
    // What to do with lines that fail to parse.
    on_parse_error: ParseErrorPolicy,
}

impl<'a, 'b> CommonCmdLineArgs {
    const DEFAULT_BUCKET_WIDTH: &'static str = "1000";

    /// Create a new set of args.
    pub fn new_app(app_name: &'static str, about: &'static str) -> App<'a, 'b> {
        App::new(app_name)
            .about(about)
            .version(clap::crate_version!())
            .arg(
                Arg::with_name("root")
                    .short("r")
                    .long("root")
                    .takes_value(true)
                    .help("Path to the root of the archive store.")
                    .long_help("Path to the root of the archive store. Defaults to '${HOME}/igra/'"),
            )
            .arg(
                Arg::with_name("data")
                    .short("d")
                    .long("data")
                    .takes_value(true)
                    .help("Directory of fixed-width input files.")
                    .long_help(concat!(
                        "Directory of fixed-width input files (.txt or .txt.gz). ",
                        "Defaults to '<root>/data'."
                    )),
            )
            .arg(
                Arg::with_name("exports")
                    .short("e")
                    .long("exports")
                    .takes_value(true)
                    .help("Directory the per-partition files are written into.")
                    .long_help(concat!(
                        "Directory the per-partition export files are written into. ",
                        "Defaults to '<root>/exports'."
                    )),
            )
            .arg(
                Arg::with_name("bucket-width")
                    .short("b")
                    .long("bucket-width")
                    .takes_value(true)
                    .default_value(Self::DEFAULT_BUCKET_WIDTH)
                    .help("Height covered by one partition bucket."),
            )
            .arg(
                Arg::with_name("workers")
                    .short("w")
                    .long("workers")
                    .takes_value(true)
                    .help("Number of parallel ingestion workers.")
                    .long_help(concat!(
                        "Number of parallel ingestion workers, one input file per task. ",
                        "Defaults to the host parallelism."
                    )),
            )
            .arg(
                Arg::with_name("on-parse-error")
                    .long("on-parse-error")
                    .takes_value(true)
                    .possible_values(&["abort", "skip"])
                    .default_value("abort")
                    .help("What to do with lines that fail to parse.")
                    .long_help(concat!(
                        "What to do with lines that fail to parse. 'abort' fails the whole ",
                        "file on the first malformed line; 'skip' logs and skips malformed ",
                        "level lines. A malformed header line always aborts the remainder ",
                        "of its file."
                    )),
            )
    }

    /// Process an `App` to get the parsed values out of it and the matches object so an
    /// application can continue with further argument parsing.
    pub fn matches(app: App<'a, 'b>) -> Result<(Self, ArgMatches<'a>), IgraDataErr> {
        let matches = app.get_matches();

        let cmd_line_opts = {
            let root = matches
                .value_of("root")
                .map(PathBuf::from)
                .or_else(|| home_dir().map(|hd| hd.join("igra")))
                .expect("Invalid root.");

            let data_dir = matches
                .value_of("data")
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join("data"));

            let export_dir = matches
                .value_of("exports")
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join("exports"));

            let bucket_width = matches
                .value_of("bucket-width")
                .and_then(|val| val.parse::<i64>().ok())
                .expect("Invalid bucket-width, not parseable as an integer.");

            let workers = match matches.value_of("workers") {
                Some(val) => val
                    .parse::<usize>()
                    .ok()
                    .expect("Invalid workers, not parseable as an integer."),
                None => default_workers(),
            };

            let on_parse_error =
                ParseErrorPolicy::from_str(matches.value_of("on-parse-error").unwrap_or("abort"))?;

            CommonCmdLineArgs {
                root,
                data_dir,
                export_dir,
                bucket_width,
                workers,
                on_parse_error,
            }
        };

        let usage = matches.usage().to_owned();
        let print_usage_message = |msg: &str| -> ! {
            println!("\n{}\n\n{}\n", msg, usage);
            println!("Try the -h or --help option for more instructions.");
            ::std::process::exit(1);
        };

        if cmd_line_opts.bucket_width <= 0 {
            print_usage_message("Invalid bucket-width, it must be a positive value!");
        }

        if cmd_line_opts.workers == 0 {
            print_usage_message("Invalid workers, it must be a positive value!");
        }

        Ok((cmd_line_opts, matches))
    }

    /// Get the root of the archive store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the directory of input files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the directory the export files are written into.
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Get the height covered by one partition bucket.
    pub fn bucket_width(&self) -> i64 {
        self.bucket_width
    }

    /// Get the number of parallel ingestion workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Get the parse-error policy.
    pub fn on_parse_error(&self) -> ParseErrorPolicy {
        self.on_parse_error
    }
}
