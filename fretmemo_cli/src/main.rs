use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use fret_progress::aggregate::TrendWindow;
use fret_progress::{export_file_name, export_snapshot, import_json, FileBackend, ProgressStore};
use fret_schema::{FretboardLayout, Position, SessionRecord};

#[derive(Debug, Parser)]
#[command(name = "fretmemo")]
#[command(about = "Fretboard memorization progress tracker", long_about = None)]
struct Cli {
    /// Progress file to read and write.
    #[arg(long, default_value = "fretmemo-progress.json", global = true)]
    file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show overall accuracy, coverage, streak, and weakest positions.
    Stats {
        #[arg(long, default_value_t = 6)]
        strings: u8,
        #[arg(long, default_value_t = 12)]
        frets: u8,
    },
    /// Show the day-bucketed accuracy trend.
    Trend {
        #[arg(long, value_enum, default_value = "week")]
        window: WindowArg,
    },
    /// Record one answered prompt for a position.
    Record {
        string: u8,
        fret: u8,
        /// Record the answer as wrong instead of correct.
        #[arg(long)]
        wrong: bool,
    },
    /// Append a completed practice session.
    EndSession {
        #[arg(long)]
        correct: u32,
        #[arg(long)]
        wrong: u32,
        #[arg(long, default_value_t = 0)]
        score: u32,
        #[arg(long, default_value_t = 0)]
        max_streak: u32,
        /// Session length in minutes, counted back from now.
        #[arg(long, default_value_t = 0)]
        minutes: u32,
    },
    /// Write a versioned backup of the progress file.
    Export { output: Option<PathBuf> },
    /// Replace all progress with a previously exported backup.
    Import { input: PathBuf },
    /// Clear the position ledger. Session history and streak survive.
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowArg {
    Week,
    Month,
    All,
}

impl From<WindowArg> for TrendWindow {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Week => TrendWindow::LastWeek,
            WindowArg::Month => TrendWindow::LastMonth,
            WindowArg::All => TrendWindow::AllTime,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut store = open_store(&cli.file);

    match cli.command {
        Command::Stats { strings, frets } => {
            let layout = FretboardLayout { strings, frets };
            print_stats(&store, layout);
        }
        Command::Trend { window } => {
            let trend = store.accuracy_trend(window.into());
            if trend.is_empty() {
                println!("no sessions in this window");
            }
            for bucket in trend {
                println!(
                    "{}  {:>3}%  ({} attempts)",
                    bucket.day, bucket.accuracy_percent, bucket.total_attempts
                );
            }
        }
        Command::Record { string, fret, wrong } => {
            let unlocked = store.record_answer(Position::new(string, fret), !wrong);
            report_unlocks(&unlocked);
        }
        Command::EndSession { correct, wrong, score, max_streak, minutes } => {
            let ended = Utc::now();
            let record = SessionRecord {
                started_at: ended - Duration::minutes(i64::from(minutes)),
                ended_at: Some(ended),
                correct,
                incorrect: wrong,
                score,
                max_streak,
            };
            let unlocked = store.end_session(record);
            println!("session recorded; streak is {} day(s)", store.streak_days());
            report_unlocks(&unlocked);
        }
        Command::Export { output } => {
            let envelope = export_snapshot(store.snapshot(), Utc::now());
            let json = serde_json::to_string_pretty(&envelope)
                .context("failed to serialize progress export")?;
            let out_path = output.unwrap_or_else(|| PathBuf::from(export_file_name(Utc::now())));
            fs::write(&out_path, json)
                .with_context(|| format!("failed to write: {}", out_path.display()))?;
            println!("exported to {}", out_path.display());
        }
        Command::Import { input } => {
            let data = fs::read_to_string(&input)
                .with_context(|| format!("failed to read: {}", input.display()))?;
            let snapshot = import_json(&data)
                .with_context(|| format!("import rejected: {}", input.display()))?;
            store.import_snapshot(snapshot);
            println!("imported progress from {}", input.display());
        }
        Command::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to clear the ledger without --yes");
            }
            store.reset_heat_map();
            println!("position ledger cleared");
        }
    }

    Ok(())
}

fn report_unlocks(unlocked: &[String]) {
    for id in unlocked {
        println!("achievement unlocked: {id}");
    }
}

fn open_store(path: &Path) -> ProgressStore {
    let store = ProgressStore::open(FileBackend::new(path));
    if let Some(warning) = store.load_warning() {
        eprintln!("warning: {warning}");
    }
    store
}

fn print_stats(store: &ProgressStore, layout: FretboardLayout) {
    match store.overall_accuracy() {
        Some(accuracy) => println!(
            "accuracy: {:.1}% ({} correct / {} wrong)",
            accuracy * 100.0,
            store.total_correct(),
            store.total_incorrect()
        ),
        None => println!("accuracy: no answers recorded yet"),
    }
    println!("coverage: {}%", store.coverage(layout));
    println!(
        "streak: {} day(s), {} freeze(s) held",
        store.streak_days(),
        store.streak_freezes()
    );

    let unlocked = store
        .achievements()
        .iter()
        .filter(|a| a.unlocked_at.is_some())
        .count();
    println!("achievements: {unlocked}/{}", store.achievements().len());

    let weakest = store.weakest_positions(3, 5);
    if !weakest.is_empty() {
        println!("weakest positions:");
        for spot in weakest {
            println!(
                "  string {} fret {}  {:.0}% over {} attempts",
                spot.position.string_index,
                spot.position.fret,
                spot.accuracy * 100.0,
                spot.total
            );
        }
    }
}
