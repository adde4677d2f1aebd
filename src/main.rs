use std::{
    path::{Path, PathBuf},
    thread::scope,
};

use clap::{AppSettings, Parser};
use crossbeam_channel::bounded;
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::iproduct;
use log::{debug, error, info};
use rayon::prelude::*;
use vec1::Vec1;

use ubxlog::{aggregate::aggregate_hour, write::write_summary, Error, RecordKind};

#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// The day directories of the raw data tree to be summarised (each
    /// containing <hour>/<KIND>/ epoch files).
    days: Vec<PathBuf>,

    /// The directory the hourly summary documents are written to, one
    /// subdirectory per day.
    #[clap(short, long)]
    output: PathBuf,

    /// The hours to process. The default is all 24.
    #[clap(long, multiple_values(true))]
    hours: Option<Vec<u8>>,

    /// The record kinds to process ("observation", "satellites", "pvt").
    /// The default is all three.
    #[clap(short, long, multiple_values(true))]
    kinds: Option<Vec<String>>,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long)]
    no_progress_bars: bool,
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbosity);
    if let Err(e) = try_main(args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn try_main(mut args: Args) -> Result<(), Error> {
    args.days.sort_unstable();
    let days = Vec1::try_from_vec(args.days).expect("at least one day directory is required");

    let hours: Vec<u8> = match args.hours {
        Some(mut v) => {
            v.sort_unstable();
            v.dedup();
            for &hour in &v {
                if hour > 23 {
                    panic!("hour {hour} is out of range (0..=23)");
                }
            }
            v
        }
        None => (0..24).collect(),
    };
    let hours = Vec1::try_from_vec(hours).expect("at least one hour is required");

    let kinds: Vec<RecordKind> = match args.kinds {
        Some(names) => names
            .iter()
            .map(|name| match name.as_str() {
                "observation" | "obs" => RecordKind::Observation,
                "satellites" | "sat" | "tracking" => RecordKind::Tracking,
                "pvt" | "solution" => RecordKind::Solution,
                other => panic!("unknown record kind {other:?}"),
            })
            .collect(),
        None => RecordKind::ALL.to_vec(),
    };
    let kinds = Vec1::try_from_vec(kinds).expect("at least one record kind is required");

    let units: Vec<(&PathBuf, u8, RecordKind)> = iproduct!(&days, &hours, &kinds)
        .map(|(day, &hour, &kind)| (day, hour, kind))
        .collect();
    info!(
        "{} aggregation unit(s) across {} day(s)",
        units.len(),
        days.len()
    );

    let (tx, rx) = bounded(5);
    let failures = AtomicCell::new(0usize);
    let multi_progress = MultiProgress::with_draw_target(if args.no_progress_bars {
        ProgressDrawTarget::hidden()
    } else {
        ProgressDrawTarget::stdout()
    });
    let aggregate_progress = multi_progress.add(
        ProgressBar::new(units.len() as _)
            .with_style(
                ProgressStyle::default_bar()
                    .template("{msg:12}: [{wide_bar:.blue}] {pos:3}/{len:3} units ({elapsed_precise}<{eta_precise})").unwrap()
                    .progress_chars("=> "),
            )
            .with_position(0)
            .with_message("Aggregating"),
    );
    let write_progress = multi_progress.add(
        ProgressBar::new(units.len() as _)
            .with_style(
                ProgressStyle::default_bar()
                    .template("{msg:12}: [{wide_bar:.blue}] {pos:3}/{len:3} units ({elapsed_precise}<{eta_precise})").unwrap()
                    .progress_chars("=> "),
            )
            .with_position(0)
            .with_message("Writing"),
    );
    aggregate_progress.tick();
    write_progress.tick();

    let out_root = &args.output;
    let failures_ref = &failures;
    let units_ref = &units;
    let aggregate_progress_ref = &aggregate_progress;

    scope(|s| {
        s.spawn(move || {
            units_ref.par_iter().for_each(|&(day_dir, hour, kind)| {
                let day = day_label(day_dir);
                debug!("Working on {day}/{hour} {kind}");
                match aggregate_hour(day_dir, hour, kind) {
                    Ok(bundle) => {
                        tx.send((day, hour, kind, bundle))
                            .expect("the writer outlives the aggregators");
                    }
                    Err(e) => {
                        error!("{day}/{hour} {kind}: {e}");
                        failures_ref.fetch_add(1);
                    }
                }
                aggregate_progress_ref.inc(1);
            });
            // Dropping the sender ends the writer's receive loop.
        });

        s.spawn(|| {
            for (day, hour, kind, bundle) in rx.iter() {
                debug!("Writing {day}/{hour} {kind} ({} epochs)", bundle.epochs());
                match write_summary(out_root, &day, hour, kind, bundle) {
                    Ok(path) => debug!("Wrote {}", path.display()),
                    Err(e) => {
                        error!("{day}/{hour} {kind}: {e}");
                        failures_ref.fetch_add(1);
                    }
                }
                write_progress.inc(1);
            }
            write_progress.abandon_with_message("Finished writing");
        });
    });

    let failed = failures.load();
    if failed > 0 {
        return Err(Error::Batch { failed });
    }
    info!("Wrote {} summary document(s)", units.len());
    Ok(())
}

/// The output subdirectory for a day is named after its input directory.
fn day_label(day_dir: &Path) -> String {
    day_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| day_dir.display().to_string())
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}
