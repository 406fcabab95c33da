//! tabular-stats CLI
//!
//! Summarizes a CSV file and writes `<engine>_summaries/<engine>_summary_<name>.csv`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tabular_stats::engine::EngineKind;
use tabular_stats::ingestion::{EventLogObserver, LoadOptions, ObserverSet, TracingObserver};
use tabular_stats::pipeline::{parse_group_keys, run, PipelineOptions};
use tabular_stats::unpack::DEFAULT_SAMPLE_SIZE;
use tabular_stats::StatsResult;
use tracing_subscriber::EnvFilter;

/// Descriptive statistics for a CSV file
#[derive(Parser)]
#[command(name = "tabular-stats")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV file to summarize (prompted for when omitted)
    input: Option<PathBuf>,
    /// Comma-separated columns to group by
    #[arg(short = 'g', long)]
    group_by: Option<String>,
    /// Table engine
    #[arg(short = 'e', long, value_enum, default_value_t = EngineKind::Polars)]
    engine: EngineKind,
    /// Directory that receives `<engine>_summaries/`
    #[arg(short = 'o', long, default_value = ".")]
    output_dir: PathBuf,
    /// Only summarize the first N rows
    #[arg(long = "head", value_name = "N")]
    head: Option<usize>,
    /// Non-missing cells inspected per column when detecting nested columns
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,
    /// Do not unpack nested columns
    #[arg(long)]
    no_unpack: bool,
    /// Append load events to this file
    #[arg(long, value_name = "FILE")]
    event_log: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn prompt(label: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn execute(cli: Cli) -> StatsResult<()> {
    let (input, group_input) = match cli.input {
        Some(input) => (input, cli.group_by.unwrap_or_default()),
        None => {
            let input = PathBuf::from(prompt("Enter CSV path: ")?);
            let groups = match cli.group_by {
                Some(groups) => groups,
                None => prompt("Enter group keys (comma-separated or leave blank): ")?,
            };
            (input, groups)
        }
    };

    let mut observers = ObserverSet::new().with(Arc::new(TracingObserver));
    if let Some(log) = cli.event_log {
        observers = observers.with(Arc::new(EventLogObserver::open(log)?));
    }

    let options = PipelineOptions {
        engine: cli.engine,
        group_by: parse_group_keys(&group_input),
        sample_size: cli.sample_size,
        unpack: !cli.no_unpack,
        row_limit: cli.head,
        output_dir: cli.output_dir,
        load: LoadOptions {
            observer: Some(Arc::new(observers)),
            ..Default::default()
        },
    };

    let report = run(&input, &options)?;
    if let Some(path) = &report.output {
        println!("Summary saved to {}", path.display());
    }
    println!("Done in {:.2} seconds", report.elapsed.as_secs_f64());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
