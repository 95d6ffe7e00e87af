use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use logsieve_criteria::{
    CriteriaAggregate, CriteriaController, CustomFilterRule, LabelSet, Level, LevelSet,
    RuleField, RuleOperator, Toggled, load_criteria,
};
use logsieve_logs::{FilteredSet, FilterRunner, LogBuffer, LogParser};

/// logsieve - Filter a log file against multi-dimensional criteria
#[derive(Parser, Debug)]
#[command(name = "logsieve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log file to read (JSON lines or plain text); stdin if omitted
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// TOML criteria file
    #[arg(long, value_name = "PATH")]
    criteria: Option<PathBuf>,

    /// Buffer size for log entries
    #[arg(long, default_value = "10000")]
    buffer_size: usize,

    /// Start of the current session (RFC 3339)
    #[arg(long, value_name = "TIMESTAMP")]
    session_start: Option<DateTime<Utc>>,

    /// Only show these levels (repeatable)
    #[arg(long = "level", value_parser = parse_level)]
    levels: Vec<Level>,

    /// Only show these labels (repeatable)
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Only show entries whose message contains this text
    #[arg(long)]
    contains: Option<String>,

    /// Print configuration warnings after the results
    #[arg(long)]
    show_warnings: bool,
}

fn parse_level(s: &str) -> Result<Level, String> {
    Level::parse(s).ok_or_else(|| format!("unknown level '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    if args.buffer_size == 0 {
        bail!("--buffer-size must be at least 1");
    }

    let mut aggregate = match &args.criteria {
        Some(path) => load_criteria(path)
            .and_then(|config| config.into_aggregate(Utc::now()))
            .with_context(|| format!("Failed to load criteria from {}", path.display()))?,
        None => CriteriaAggregate::default(),
    };
    apply_overrides(&args, &mut aggregate);

    let buffer = LogBuffer::new(args.buffer_size);
    if let Some(start) = args.session_start {
        buffer.begin_session(start);
    }

    let ingested = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            ingest(BufReader::new(file), &buffer).await?
        }
        None => ingest(BufReader::new(tokio::io::stdin()), &buffer).await?,
    };
    tracing::debug!(ingested, retained = buffer.len(), "log input read");

    let store = Arc::new(buffer);
    let controller = CriteriaController::with_aggregate(store.clone(), aggregate);
    let mut runner = FilterRunner::new(store);
    let mut results = runner.subscribe();
    runner.restart(controller.snapshot());

    let filtered = tokio::select! {
        published = results.wait_for(Option::is_some) => {
            published
                .context("Filter runner stopped before publishing")?
                .clone()
        }
        _ = tokio::signal::ctrl_c() => {
            runner.stop();
            bail!("Interrupted");
        }
    };
    let Some(filtered) = filtered else {
        bail!("Filter runner published no result");
    };

    print_entries(&filtered)?;
    eprintln!(
        "{} of {} entries passed",
        filtered.entries.len(),
        filtered.scanned
    );

    if args.show_warnings {
        for warning in controller.warnings() {
            eprintln!("warning: {}", warning);
        }
    }

    Ok(())
}

/// Command-line filters replace the matching sections of the criteria file
fn apply_overrides(args: &Args, aggregate: &mut CriteriaAggregate) {
    if !args.levels.is_empty() {
        aggregate.levels = Toggled::enabled(LevelSet::from_levels(args.levels.iter().copied()));
    }
    if !args.labels.is_empty() {
        aggregate.labels = Toggled::enabled(LabelSet::restricted_to(&args.labels));
    }
    if let Some(text) = &args.contains {
        aggregate.custom_filters.retain(|rule| !rule.is_default());
        aggregate.custom_filters.push(CustomFilterRule::new(
            RuleField::Message,
            RuleOperator::Contains,
            text.clone(),
        ));
        aggregate.is_custom_filters_enabled = true;
    }
}

/// Parse every line of `reader` into `buffer`
async fn ingest<R>(reader: R, buffer: &LogBuffer) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0;
    while let Some(line) = lines.next_line().await.context("Failed to read log input")? {
        if let Some(entry) = LogParser::parse(&line, Utc::now()) {
            buffer.push(entry);
            count += 1;
        }
    }
    Ok(count)
}

fn print_entries(filtered: &FilteredSet) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for entry in &filtered.entries {
        writeln!(
            out,
            "{} {} [{}] {}",
            entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            entry.level.as_str(),
            entry.label,
            entry.message
        )?;
    }
    out.flush()?;
    Ok(())
}
