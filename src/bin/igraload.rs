//! IGRA archive loader.
//!
//! Loads fixed-width sounding files into the store, partitions the level data
//! by geopotential height, and exports each partition joined with its station
//! headers as CSV.

extern crate clap;
extern crate igra_data;
extern crate tracing_subscriber;

use clap::Arg;
use igra_data::{
    archive_files_in, export_partitions, ingest_files, plan_partitions, CommonCmdLineArgs,
    IgraDataErr, Store, DEFAULT_BUCKET,
};
use std::error::Error;

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(ref e) = run() {
        println!("error: {}", e);

        let mut source: Option<&(dyn Error + 'static)> = e.source();
        while let Some(cause) = source {
            println!("caused by: {}", cause);
            source = cause.source();
        }

        ::std::process::exit(1);
    }
}

fn run() -> Result<(), IgraDataErr> {
    let app = CommonCmdLineArgs::new_app(
        "igraload",
        "Load, partition, and export an archive of IGRA sounding files.",
    )
    .arg(
        Arg::with_name("fresh")
            .long("fresh")
            .help("Delete any existing store under `root` before loading."),
    );

    let (args, matches) = CommonCmdLineArgs::matches(app)?;

    if matches.is_present("fresh") {
        Store::wipe(&args.root())?;
    }

    let store = Store::create(&args.root())?;

    let files = archive_files_in(&args.data_dir())?;
    if files.is_empty() {
        return Err(IgraDataErr::GeneralError(format!(
            "no archive files found in {}",
            args.data_dir().display()
        )));
    }

    println!(
        "Ingesting {} files with {} workers.",
        files.len(),
        args.workers()
    );
    let report = ingest_files(&args.root(), &files, args.workers(), args.on_parse_error())?;
    for (path, err) in &report.failed {
        println!("  failed {}: {}", path.display(), err);
    }
    println!(
        "Ingested {} soundings with {} levels from {} files ({} failed).",
        report.soundings(),
        report.levels(),
        report.completed.len(),
        report.failed.len()
    );

    println!(
        "Planning partitions with bucket width {}.",
        args.bucket_width()
    );
    let plan = plan_partitions(&store, args.bucket_width())?;
    store.rebuild_partitions(&plan)?;
    println!(
        "Created {} partitions plus the {} bucket.",
        plan.ranges().len(),
        DEFAULT_BUCKET
    );

    let export = export_partitions(&store, &plan, &args.export_dir())?;
    for (bucket, err) in &export.failed {
        println!("  export failed for bucket {}: {}", bucket, err);
    }
    println!(
        "Exported {} partition files to {}.",
        export.written.len(),
        args.export_dir().display()
    );

    Ok(())
}
