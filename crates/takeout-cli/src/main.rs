use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use takeout_core::date::DateOptions;
use takeout_core::{AlbumBehavior, DateDivision, ProcessOptions};

#[derive(Clone, Copy, ValueEnum)]
enum AlbumsArg {
    /// Files in ALL_PHOTOS, links in album folders
    Shortcut,
    /// A full copy of each file in every album folder
    DuplicateCopy,
    /// Files in album folders, links in ALL_PHOTOS
    ReverseShortcut,
    /// Album membership recorded in albums-info.json
    Json,
    /// Ignore albums
    Nothing,
}

impl From<AlbumsArg> for AlbumBehavior {
    fn from(arg: AlbumsArg) -> Self {
        match arg {
            AlbumsArg::Shortcut => AlbumBehavior::Shortcut,
            AlbumsArg::DuplicateCopy => AlbumBehavior::DuplicateCopy,
            AlbumsArg::ReverseShortcut => AlbumBehavior::ReverseShortcut,
            AlbumsArg::Json => AlbumBehavior::Json,
            AlbumsArg::Nothing => AlbumBehavior::Nothing,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DivideArg {
    None,
    Year,
    Month,
}

impl From<DivideArg> for DateDivision {
    fn from(arg: DivideArg) -> Self {
        match arg {
            DivideArg::None => DateDivision::None,
            DivideArg::Year => DateDivision::Year,
            DivideArg::Month => DateDivision::YearMonth,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "takeout-organizer",
    version,
    about = "Organize an extracted Google Photos Takeout into a date-sorted library"
)]
struct Cli {
    /// Extracted Takeout directory
    input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// How album folders are represented in the output
    #[arg(long, value_enum, default_value = "shortcut")]
    albums: AlbumsArg,

    /// Split ALL_PHOTOS into year or year/month folders
    #[arg(long, value_enum, default_value = "none")]
    divide_to_dates: DivideArg,

    /// Move files out of the input instead of copying them
    #[arg(long = "move")]
    move_files: bool,

    /// Skip -edited, -effects and similar derivative images
    #[arg(long)]
    skip_extras: bool,

    /// Disable date guessing from filenames
    #[arg(long)]
    no_guess: bool,

    /// Match sidecars loosely for files that are still undated
    #[arg(long)]
    try_hard: bool,

    /// Run every date strategy and keep the most accurate result
    #[arg(long)]
    exhaustive_dates: bool,

    /// Output path for albums-info.json (default: <output>/albums-info.json)
    #[arg(long)]
    album_json: Option<PathBuf>,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let t_total = std::time::Instant::now();

    let options = ProcessOptions {
        input: cli.input,
        output: cli.output,
        copy: !cli.move_files,
        date_division: cli.divide_to_dates.into(),
        album_behavior: cli.albums.into(),
        skip_extras: cli.skip_extras,
        dates: DateOptions {
            guess: !cli.no_guess,
            try_hard: cli.try_hard,
            exhaustive: cli.exhaustive_dates,
        },
        album_json: cli.album_json,
    };

    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::with_template("[{bar:40}] {pos}/{len} {prefix} {msg}")?);
    let current_stage = Mutex::new(String::new());

    let result = takeout_core::process(&options, &|stage, current, total, message| {
        if let Ok(mut last) = current_stage.lock() {
            if *last != stage {
                *last = stage.to_string();
                pb.reset();
                pb.set_prefix(stage.to_string());
            }
        }
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(message.to_string());
    });
    pb.finish_and_clear();
    let result = result?;

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    eprintln!(
        "Done! {} media files, {} duplicates removed, {} album copies merged, {} extras skipped",
        result.total_media, result.duplicates_removed, result.albums_merged, result.extras_removed
    );
    eprintln!(
        "{} files written, {} links created, {} failed ({:.2}s)",
        result.files_written,
        result.links_created,
        result.failed,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
