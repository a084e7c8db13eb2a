//! # CLI Module
//!
//! Command-line interface for the duplicate image engine.
//!
//! ## Usage
//! ```bash
//! # Scan directories and print duplicate groups
//! spectramatch scan ~/Photos ~/Downloads
//!
//! # Regroup the last scan with looser thresholds, no rescan
//! spectramatch groups --hash-threshold 14 --embedding-threshold 0.2
//!
//! # JSON output
//! spectramatch groups --output json
//!
//! # What the store holds
//! spectramatch stats
//!
//! # Write the default configuration file
//! spectramatch config --write
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use spectramatch::core::comparator::DuplicateGroup;
use spectramatch::core::config::{EngineConfig, IndexKind};
use spectramatch::core::hasher::HashAlgorithmKind;
use spectramatch::core::pipeline::{CancellationToken, Pipeline, PipelineResult};
use spectramatch::core::store::{RecordStore, SqliteStore, StoreStats};
use spectramatch::error::Result;
use spectramatch::events::{Event, EventChannel, EventSender, PipelineEvent, ScanEvent};
use std::path::{Path, PathBuf};
use std::thread;

/// SpectraMatch - find duplicate and near-duplicate images
#[derive(Parser, Debug)]
#[command(name = "spectramatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan directories, update the store and print duplicate groups
    Scan {
        /// Directories to scan (default: roots from the config file)
        paths: Vec<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Follow symbolic links (cycles are skipped)
        #[arg(long)]
        follow_symlinks: bool,

        /// Worker threads (0 = one per core)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Regroup the stored records with new thresholds, without rescanning
    Groups {
        #[command(flatten)]
        engine: EngineArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Show what the store holds
    Stats {
        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Store database path
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Print the effective configuration
    Config {
        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write it to the configuration file
        #[arg(long)]
        write: bool,
    },
}

/// Options shared by commands that open the engine
#[derive(Args, Debug)]
struct EngineArgs {
    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store database path
    #[arg(long)]
    store: Option<PathBuf>,

    /// Maximum Hamming distance for a hash match
    #[arg(long)]
    hash_threshold: Option<u32>,

    /// Maximum cosine distance for an embedding match (0-2)
    #[arg(long)]
    embedding_threshold: Option<f32>,

    /// Hash algorithm to use
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Nearest-neighbor index
    #[arg(long)]
    index: Option<IndexChoice>,

    /// Fraction of index lists probed per query (1.0 = exact)
    #[arg(long)]
    probe_fraction: Option<f32>,

    /// Hash-only matching, no embeddings
    #[arg(long)]
    no_embeddings: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Difference Hash - horizontal gradients
    Difference,
    /// Perceptual Hash - DCT, most robust to edits (default)
    Perceptual,
}

impl From<Algorithm> for HashAlgorithmKind {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Difference => HashAlgorithmKind::Difference,
            Algorithm::Perceptual => HashAlgorithmKind::Perceptual,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IndexChoice {
    /// Exact linear scan
    Flat,
    /// Inverted file, approximate (default)
    Ivf,
}

impl From<IndexChoice> for IndexKind {
    fn from(choice: IndexChoice) -> Self {
        match choice {
            IndexChoice::Flat => IndexKind::Flat,
            IndexChoice::Ivf => IndexKind::Ivf,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (duplicate paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            paths,
            engine,
            include_hidden,
            follow_symlinks,
            workers,
            output,
            verbose,
        } => {
            let mut config = engine.load()?;
            if !paths.is_empty() {
                config.roots = paths;
            }
            config.include_hidden |= include_hidden;
            config.follow_symlinks |= follow_symlinks;
            if let Some(workers) = workers {
                config.workers = workers;
            }
            run_scan(config, engine.no_embeddings, output, verbose)
        }
        Commands::Groups { engine, output } => {
            let config = engine.load()?;
            run_groups(config, engine.no_embeddings, output)
        }
        Commands::Stats {
            config,
            store,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(store) = store {
                config.store_path = store;
            }
            run_stats(&config, output)
        }
        Commands::Config { config, write } => {
            let path = config.unwrap_or_else(EngineConfig::default_path);
            let config = EngineConfig::load(&path)?;
            if write {
                config.save(&path)?;
                eprintln!("{} {}", style("Wrote").green(), path.display());
            }
            print_json(&config);
            Ok(())
        }
    }
}

impl EngineArgs {
    /// Config file values with command-line overrides applied
    fn load(&self) -> Result<EngineConfig> {
        let mut config = load_config(self.config.as_deref())?;

        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        if let Some(threshold) = self.hash_threshold {
            config.hash_threshold = threshold;
        }
        if let Some(threshold) = self.embedding_threshold {
            config.embedding_threshold = threshold;
        }
        if let Some(algorithm) = self.algorithm {
            config.hash_algorithm = algorithm.into();
        }
        if let Some(index) = self.index {
            config.index.kind = index.into();
        }
        if let Some(fraction) = self.probe_fraction {
            config.index.probe_fraction = fraction;
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(EngineConfig::default_path);
    Ok(EngineConfig::load(&path)?)
}

fn open_pipeline(
    config: EngineConfig,
    no_embeddings: bool,
    events: Option<EventSender>,
) -> Result<Pipeline> {
    let mut builder = Pipeline::builder(config);
    if no_embeddings {
        builder = builder.without_embedder();
    }
    if let Some(events) = events {
        builder = builder.events(events);
    }
    builder.build()
}

fn run_scan(config: EngineConfig, no_embeddings: bool, output: OutputFormat, verbose: bool) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("SpectraMatch").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();
    let pipeline = open_pipeline(config, no_embeddings, Some(sender))?;

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map(|s| s.progress_chars("█▓░"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            // Drain so senders never block on a bounded consumer
            for _ in receiver.iter() {}
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Discovered { pending, .. }) => {
                    pb.set_length(pending as u64);
                }
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_position(p.processed as u64);
                    if verbose {
                        pb.set_message(
                            p.current_path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Scan(ScanEvent::FileFailed { path, message }) if verbose => {
                    pb.println(format!("{} {}: {}", style("✗").red(), path.display(), message));
                }
                Event::Pipeline(PipelineEvent::Completed { .. } | PipelineEvent::Cancelled) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run(&CancellationToken::new());

    // Dropping the pipeline drops the last sender and ends the event thread
    drop(pipeline);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let result = result?;

    match output {
        OutputFormat::Pretty => print_pretty_scan(&term, &result, verbose),
        OutputFormat::Json => print_json(&result),
        OutputFormat::Minimal => print_minimal(&result.groups),
    }

    Ok(())
}

fn run_groups(config: EngineConfig, no_embeddings: bool, output: OutputFormat) -> Result<()> {
    let pipeline = open_pipeline(config, no_embeddings, None)?;
    let groups = pipeline.duplicate_groups()?;

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            print_summary(&term, &groups);
            print_groups(&term, &groups, false);
        }
        OutputFormat::Json => print_json(&groups),
        OutputFormat::Minimal => print_minimal(&groups),
    }
    Ok(())
}

fn run_stats(config: &EngineConfig, output: OutputFormat) -> Result<()> {
    let store = SqliteStore::open(&config.store_path)?;
    let stats = store.stats()?;

    match output {
        OutputFormat::Json => print_json(&stats),
        OutputFormat::Minimal => println!("{}", stats.total),
        OutputFormat::Pretty => print_pretty_stats(&Term::stdout(), store.path(), &stats),
    }
    Ok(())
}

fn print_pretty_scan(term: &Term, result: &PipelineResult, verbose: bool) {
    let report = &result.report;

    term.write_line("").ok();
    if report.cancelled {
        term.write_line(&format!("{} Scan cancelled", style("!").yellow().bold())).ok();
    } else {
        term.write_line(&format!("{} Scan Complete", style("✓").green().bold())).ok();
    }
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images found in {:.1}s",
        style(report.candidates).cyan(),
        report.duration.as_secs_f64()
    ))
    .ok();
    term.write_line(&format!(
        "  {} processed, {} unchanged",
        style(report.processed).cyan(),
        style(report.skipped).dim()
    ))
    .ok();
    if report.retired > 0 {
        term.write_line(&format!("  {} records retired", style(report.retired).dim())).ok();
    }
    if report.failed > 0 {
        term.write_line(&format!("  {} files could not be read", style(report.failed).red())).ok();
        if verbose {
            for failure in &report.failures {
                term.write_line(&format!("    {} {}", style("✗").red(), failure.message)).ok();
            }
        }
    }
    if report.embedding_failures > 0 {
        term.write_line(&format!(
            "  {} images matched by hash only",
            style(report.embedding_failures).yellow()
        ))
        .ok();
    }

    print_summary(term, &result.groups);
    print_groups(term, &result.groups, verbose);

    term.write_line(&format!(
        "{}",
        style("Remember: No files were deleted. Review carefully before taking action.").dim()
    ))
    .ok();
}

fn print_summary(term: &Term, groups: &[DuplicateGroup]) {
    let duplicate_count: usize = groups.iter().map(|g| g.duplicate_count()).sum();
    let savings: u64 = groups.iter().map(|g| g.duplicate_size_bytes).sum();

    term.write_line(&format!("  {} duplicate groups found", style(groups.len()).cyan())).ok();
    term.write_line(&format!("  {} duplicate images", style(duplicate_count).cyan())).ok();
    term.write_line(&format!(
        "  {} potential space savings",
        style(format_bytes(savings)).yellow()
    ))
    .ok();
    term.write_line("").ok();
}

fn print_groups(term: &Term, groups: &[DuplicateGroup], verbose: bool) {
    if groups.is_empty() {
        term.write_line(&format!("  {} No duplicates found!", style("🎉").green())).ok();
        return;
    }

    term.write_line(&format!("{}", style("Duplicate Groups:").bold().underlined())).ok();
    term.write_line("").ok();

    for (i, group) in groups.iter().enumerate() {
        let mut heading = format!(
            "  {} {} ({} images, {:.0}% match, {})",
            style(format!("Group {}:", i + 1)).bold(),
            style(group.method).yellow(),
            group.members.len(),
            group.confidence * 100.0,
            format_bytes(group.duplicate_size_bytes)
        );
        if group.byte_identical {
            heading.push_str(&format!(" {}", style("identical files").dim()));
        }
        term.write_line(&heading).ok();

        for (idx, path) in group.paths.iter().enumerate() {
            // The representative is always listed first
            let marker = if idx == 0 {
                style("★").green().to_string()
            } else {
                style("○").dim().to_string()
            };
            let mut line = format!("    {} {}", marker, display_path(path));
            if verbose {
                if let Some(Some(sharpness)) = group.sharpness.get(idx) {
                    line.push_str(&format!(" {}", style(format!("sharpness {:.0}", sharpness)).dim()));
                }
            }
            term.write_line(&line).ok();
        }

        if verbose {
            term.write_line(&format!(
                "    {} {}",
                style("Recommended:").dim(),
                style("Keep the starred (★) image").dim()
            ))
            .ok();
            if let Some(sharpest) = group.sharpest_path().filter(|p| **p != group.representative_path) {
                term.write_line(&format!(
                    "    {} {}",
                    style("Sharpest copy:").dim(),
                    display_path(sharpest)
                ))
                .ok();
            }
        }

        term.write_line("").ok();
    }
}

fn print_pretty_stats(term: &Term, path: &Path, stats: &StoreStats) {
    term.write_line(&format!("{} {}", style("Store").bold(), display_path(path))).ok();
    term.write_line(&format!(
        "  {} records, {} tracked",
        style(stats.total).cyan(),
        format_bytes(stats.total_bytes)
    ))
    .ok();
    term.write_line(&format!("  {} embedded", style(stats.embedded).green())).ok();
    term.write_line(&format!("  {} hashed only", style(stats.hashed).cyan())).ok();
    term.write_line(&format!("  {} pending", style(stats.pending).dim())).ok();
    term.write_line(&format!("  {} failed", style(stats.failed).red())).ok();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("{} could not serialize output: {}", style("error:").red(), e),
    }
}

fn print_minimal(groups: &[DuplicateGroup]) {
    for group in groups {
        for path in group.duplicate_paths() {
            println!("{}", path.display());
        }
    }
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
