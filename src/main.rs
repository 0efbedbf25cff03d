//! Command-line front end for the crossword engine.
//!
//! This program:
//! 1. Loads a scored word list (`WORD;SCORE` per line)
//! 2. Builds and fills a symmetric grid with the backtracking solver
//! 3. Fetches clues from a clue service, or falls back to placeholders
//! 4. Writes the puzzle as canonical JSON, Across Lite `.puz` and ipuz
//!
//! `crossword benchmark` instead times a parallel batch of generations.

use crossword_engine::api::RemoteClueProvider;
use crossword_engine::formats::{ipuz, puz, PuzzleRecord};
use crossword_engine::generator::generate_with_timeout;
use crossword_engine::puzzle::PlaceholderClueProvider;
use crossword_engine::{
    assemble, benchmark, BlockPattern, Config, CrosswordError, Metadata, Puzzle, Result, WordIndex,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const USAGE: &str = "usage:
  crossword generate <corpus> [--config FILE] [--size N] [--seed N] [--difficulty D]
                              [--pattern auto|open|lattice] [--clue-endpoint URL]
                              [--timeout SECS] [--out DIR]
  crossword benchmark <corpus> [count]";

const DEFAULT_TIMEOUT_SECS: u64 = 300;

struct GenerateArgs {
    corpus: PathBuf,
    config: Config,
    clue_endpoint: Option<String>,
    timeout: Duration,
    out: PathBuf,
}

#[tokio::main]
async fn main() {
    let level = env::var("CROSSWORD_LOG")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_thread_ids(true)
        .with_target(false)
        .with_ansi(true)
        .init();

    let args: Vec<String> = env::args().collect();
    let outcome = match args.get(1).map(|s| s.as_str()) {
        Some("generate") => match parse_generate_args(&args[2..]) {
            Ok(parsed) => generate(parsed).await,
            Err(e) => Err(e),
        },
        Some("benchmark") => run_benchmark(&args[2..]),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = outcome {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn flag_value<'a>(flag: &str, value: Option<&'a String>) -> Result<&'a str> {
    value
        .map(String::as_str)
        .ok_or_else(|| CrosswordError::InvalidConfig(format!("{} needs a value", flag)))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CrosswordError::InvalidConfig(format!("{} expects a number, got {:?}", flag, value)))
}

fn parse_pattern(value: &str) -> Result<BlockPattern> {
    match value.to_lowercase().as_str() {
        "auto" => Ok(BlockPattern::Auto),
        "open" => Ok(BlockPattern::Open),
        "lattice" => Ok(BlockPattern::Lattice),
        other => Err(CrosswordError::InvalidConfig(format!("unknown pattern {:?}", other))),
    }
}

fn parse_generate_args(args: &[String]) -> Result<GenerateArgs> {
    let corpus = args
        .first()
        .filter(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .ok_or_else(|| CrosswordError::InvalidConfig("missing corpus path".to_string()))?;

    // --config is applied first so the other flags override it.
    let mut config = match args.iter().position(|arg| arg == "--config") {
        Some(i) => Config::from_json_file(flag_value("--config", args.get(i + 1))?)?,
        None => Config::default(),
    };
    let mut clue_endpoint = None;
    let mut timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    let mut out = PathBuf::from(".");

    let mut rest = args[1..].iter();
    while let Some(flag) = rest.next() {
        let value = rest.next();
        match flag.as_str() {
            "--config" => {}
            "--size" => config.size = parse_number(flag, flag_value(flag, value)?)?,
            "--seed" => config.seed = parse_number(flag, flag_value(flag, value)?)?,
            "--difficulty" => config.difficulty = flag_value(flag, value)?.parse()?,
            "--pattern" => config.pattern = parse_pattern(flag_value(flag, value)?)?,
            "--clue-endpoint" => clue_endpoint = Some(flag_value(flag, value)?.to_string()),
            "--timeout" => {
                timeout = Duration::from_secs(parse_number(flag, flag_value(flag, value)?)?)
            }
            "--out" => out = PathBuf::from(flag_value(flag, value)?),
            other => {
                return Err(CrosswordError::InvalidConfig(format!("unknown option {:?}", other)))
            }
        }
    }

    Ok(GenerateArgs {
        corpus,
        config,
        clue_endpoint,
        timeout,
        out,
    })
}

async fn generate(args: GenerateArgs) -> Result<()> {
    args.config.validate()?;
    let index = Arc::new(WordIndex::load(&args.corpus)?);
    info!("Loaded {} words from {}", index.len(), args.corpus.display());

    let config = args.config.clone();
    let timeout = args.timeout;
    let generated = tokio::task::spawn_blocking(move || generate_with_timeout(index, config, timeout))
        .await
        .map_err(|e| CrosswordError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
    info!(
        "Filled {}x{} grid in {:?} ({} attempts, {} backtracks)",
        generated.grid.size(),
        generated.grid.size(),
        generated.stats.elapsed,
        generated.stats.attempts,
        generated.stats.backtracks
    );
    println!("{}", generated.grid);

    let metadata = Metadata::from_config(&generated.config);
    let puzzle = match &args.clue_endpoint {
        Some(endpoint) => {
            let provider = RemoteClueProvider::new(endpoint.as_str());
            assemble(generated.grid, &provider, metadata).await?
        }
        None => assemble(generated.grid, &PlaceholderClueProvider, metadata).await?,
    };
    write_outputs(&puzzle, &args.out)
}

fn write_outputs(puzzle: &Puzzle, out: &Path) -> Result<()> {
    let record = PuzzleRecord::from_puzzle(puzzle)?;
    let files = [
        ("puzzle.json", record.to_json()?),
        ("puzzle.puz", puz::encode(&record)?),
        ("puzzle.ipuz", ipuz::encode(&record)?),
    ];

    fs::create_dir_all(out)?;
    for (name, bytes) in files {
        let path = out.join(name);
        fs::write(&path, bytes)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_benchmark(args: &[String]) -> Result<()> {
    let corpus = args
        .first()
        .ok_or_else(|| CrosswordError::InvalidConfig("missing corpus path".to_string()))?;
    let count = match args.get(1) {
        Some(value) => parse_number("count", value)?,
        None => 100,
    };

    let index = WordIndex::load(corpus)?;
    info!("Running benchmark with {} puzzles...", count);
    let results = benchmark::run_benchmark(&index, count, &Config::default())?;
    results.print_results();
    Ok(())
}
