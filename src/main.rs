use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use slideshow::core::optimizer::{GreedyStart, OptimizerConfig, Strategy};
use slideshow::core::{PairingPolicy, ScoreReporter};
use slideshow::services::{
    DatasetReader, HistoryLog, Pipeline, PipelineOptions, SolutionReader, discover_datasets,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "slideshow",
    version,
    about = "Arrange photos into high-interest slideshows"
)]
struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Solve datasets and write `<name>.sol` next to each one
    Solve(SolveArgs),

    /// Validate a solution file against its dataset and print its score
    Score {
        /// Dataset the solution was produced for
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,
        /// Solution file to check
        #[arg(value_name = "SOLUTION")]
        solution: PathBuf,
    },

    /// Work with run history
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Dataset files, or directories searched for `*.txt` datasets
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Directory to write solutions into (default: next to each dataset)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Number of datasets solved in parallel (default: one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Only show what would be written
    #[arg(long)]
    dry_run: bool,

    /// Do not append to the run history
    #[arg(long)]
    no_history: bool,

    /// JSON optimizer configuration; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Largest candidate count solved exactly under `--strategy auto`
    #[arg(long)]
    exact_limit: Option<usize>,

    #[arg(long, value_enum)]
    pairing: Option<PairingArg>,

    /// Verticals compared per photo by score-aware pairing (0 = all)
    #[arg(long)]
    pairing_window: Option<usize>,

    #[arg(long, value_enum)]
    greedy_start: Option<StartArg>,

    /// Candidates examined per greedy step (0 = all)
    #[arg(long)]
    search_window: Option<usize>,

    /// Skip 2-opt refinement
    #[arg(long)]
    no_local_search: bool,

    /// Max 2-opt sweeps (0 = until no move improves)
    #[arg(long)]
    max_passes: Option<usize>,

    /// Max reversed segment length in 2-opt (0 = unlimited)
    #[arg(long)]
    two_opt_window: Option<usize>,

    /// Wall-clock budget per dataset
    #[arg(long, value_name = "MS")]
    time_limit_ms: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Auto,
    Exact,
    Heuristic,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PairingArg {
    Sequential,
    ScoreAware,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StartArg {
    First,
    BestPair,
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List recorded runs
    List {
        /// Directory holding the history file
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Solve(args) => solve(&args),
        Commands::Score { dataset, solution } => score(&dataset, &solution),
        Commands::History { command } => match command {
            HistoryCmd::List { dir } => list_history(&dir),
        },
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn solve(args: &SolveArgs) -> Result<()> {
    let datasets = discover_datasets(&args.paths);
    if datasets.is_empty() {
        anyhow::bail!("No datasets found");
    }

    let pipeline = Pipeline::new(PipelineOptions {
        optimizer: optimizer_config(args)?,
        output_dir: args.output_dir.clone(),
        dry_run: args.dry_run,
    });

    println!("▶ Solving {} dataset(s)…", datasets.len());
    let progress = ProgressBar::new(datasets.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    progress.enable_steady_tick(Duration::from_millis(100));

    let run = || {
        pipeline.run_batch(&datasets, |outcome| {
            progress.set_message(outcome.dataset.display().to_string());
            progress.inc(1);
        })
    };
    let outcomes = benchmark("solving all datasets", || -> Result<_> {
        match args.jobs {
            Some(jobs) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build()
                    .context("Failed to start worker pool")?;
                Ok(pool.install(run))
            }
            None => Ok(run()),
        }
    })?;
    progress.finish_with_message("done");

    let mut failures = 0;
    for outcome in &outcomes {
        let report = match &outcome.result {
            Ok(report) => report,
            Err(err) => {
                failures += 1;
                eprintln!("\n❌ {}: {}", outcome.dataset.display(), err);
                continue;
            }
        };

        println!("\n✨ {}", report.dataset.display());
        println!("   🏆 Score: {}", report.score);
        println!(
            "   🎞  {} slides from {} photos ({} candidates)",
            report.slides, report.photos, report.candidates
        );
        println!(
            "   ⚙️  {} strategy{} in {:.2?}",
            report.solved_by,
            if report.optimal { ", optimal" } else { "" },
            report.elapsed
        );
        if let Some(reason) = &report.fallback {
            println!("   ⚠️  Exact strategy abandoned: {}", reason);
        }
        match &report.solution {
            Some(path) => println!("   📦 Wrote {}", path.display()),
            None => println!("   📦 [dry-run] no solution written"),
        }

        if args.no_history {
            continue;
        }
        if let (Some(record), Some(solution)) = (report.to_record(), &report.solution) {
            let dir = solution.parent().unwrap_or(Path::new("."));
            let log = HistoryLog::in_dir(dir);
            if let Err(err) = log.append(&record) {
                eprintln!("⚠️  Could not record history in {}: {}", log.path().display(), err);
            }
        }
    }

    if args.dry_run {
        println!("\n⚠️  Dry-run only; no files were changed.");
    }
    if failures > 0 {
        anyhow::bail!("{} of {} dataset(s) failed", failures, outcomes.len());
    }
    Ok(())
}

fn optimizer_config(args: &SolveArgs) -> Result<OptimizerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Could not open config file {:?}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config file {:?}", path))?
        }
        None => OptimizerConfig::default(),
    };

    if let Some(strategy) = args.strategy {
        config.strategy = match strategy {
            StrategyArg::Auto => Strategy::Auto,
            StrategyArg::Exact => Strategy::Exact,
            StrategyArg::Heuristic => Strategy::Heuristic,
        };
    }
    if let Some(pairing) = args.pairing {
        config.pairing = match pairing {
            PairingArg::Sequential => PairingPolicy::Sequential,
            PairingArg::ScoreAware => PairingPolicy::ScoreAware,
        };
    }
    if let Some(window) = args.pairing_window {
        config.pairing_window = (window > 0).then_some(window);
    }
    if let Some(start) = args.greedy_start {
        config.greedy_start = match start {
            StartArg::First => GreedyStart::First,
            StartArg::BestPair => GreedyStart::BestPair,
        };
    }
    if let Some(limit) = args.exact_limit {
        config.exact_limit = limit;
    }
    if let Some(window) = args.search_window {
        config.search_window = (window > 0).then_some(window);
    }
    if let Some(passes) = args.max_passes {
        config.max_passes = (passes > 0).then_some(passes);
    }
    if let Some(window) = args.two_opt_window {
        config.two_opt_window = (window > 0).then_some(window);
    }
    if args.time_limit_ms.is_some() {
        config.time_limit_ms = args.time_limit_ms;
    }
    if args.no_local_search {
        config.local_search = false;
    }
    Ok(config)
}

fn score(dataset: &Path, solution: &Path) -> Result<()> {
    let photos = DatasetReader::new()
        .read_path(dataset)
        .with_context(|| format!("Failed to read dataset {:?}", dataset))?;
    let slideshow = SolutionReader::new()
        .read_path(solution, &photos)
        .with_context(|| format!("Invalid solution {:?}", solution))?;

    println!(
        "🎞  {} slides using {} of {} photos",
        slideshow.len(),
        slideshow.photo_ids().count(),
        photos.len()
    );
    println!("🏆 Score: {}", ScoreReporter::total(&slideshow));
    Ok(())
}

fn list_history(dir: &Path) -> Result<()> {
    let log = HistoryLog::in_dir(dir);
    let records = log
        .load()
        .with_context(|| format!("Could not open history file {:?}", log.path()))?;

    println!("🗂️  Run History:");
    for (i, rec) in records.iter().enumerate() {
        println!(
            "[{}] {}\n     dataset: {}\n     solution: {}\n     score: {} ({} slides, {} photos)\n     strategy: {}{}\n     took: {} ms\n",
            i,
            rec.timestamp,
            rec.dataset,
            rec.solution,
            rec.score,
            rec.slides,
            rec.photos,
            rec.strategy,
            rec.fallback
                .as_ref()
                .map(|f| format!(" (fallback: {})", f))
                .unwrap_or_default(),
            rec.elapsed_ms
        );
    }
    Ok(())
}

/// Run `f()`, print how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    println!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
