//! sectionrank CLI - persona-driven section ranking for PDF collections

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use sectionrank::extract::document_name;
use sectionrank::rank::DEFAULT_TOP_K;
use sectionrank::refine::{DEFAULT_MAX_SENTENCES, DEFAULT_MIN_SCORE};
use sectionrank::{
    find_challenge_file, report, Challenge, Embedder, ErrorMode, HashingEmbedder, JsonFormat,
    Pipeline, PipelineConfig,
};

/// File written into the output directory.
const OUTPUT_FILE: &str = "challenge1b_output.json";

#[derive(Parser)]
#[command(name = "sectionrank")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Rank PDF sections for a persona and a task", long_about = None)]
struct Cli {
    /// Directory holding the challenge JSON and its PDFs
    #[arg(value_name = "INPUT_DIR")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the documents of a challenge directory
    Run {
        /// Directory holding the challenge JSON and its PDFs
        #[arg(value_name = "INPUT_DIR")]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the sections detected in one PDF
    Sections {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Download the MiniLM model weights into the model cache
    FetchModel {
        /// Cache directory for the model weights
        #[arg(long, env = "SECTIONRANK_MODEL_CACHE", value_name = "DIR")]
        model_cache: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Number of ranked sections to report
    #[arg(long, env = "SECTIONRANK_TOP_K", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Sentences kept per refined section
    #[arg(long, env = "SECTIONRANK_MAX_SENTENCES", default_value_t = DEFAULT_MAX_SENTENCES)]
    max_sentences: usize,

    /// Sentences scoring at or below this similarity are dropped
    #[arg(long, env = "SECTIONRANK_MIN_SCORE", default_value_t = DEFAULT_MIN_SCORE)]
    min_score: f32,

    /// Abort on the first unreadable document instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Extract documents one at a time
    #[arg(long)]
    sequential: bool,

    /// Embedding backend
    #[arg(long, value_enum, default_value_t = EmbedderKind::default())]
    embedder: EmbedderKind,

    /// Directory with pre-downloaded model weights (see `fetch-model`)
    #[arg(long, env = "SECTIONRANK_MODEL_CACHE", value_name = "DIR")]
    model_cache: Option<PathBuf>,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,
}

impl RunArgs {
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new()
            .with_top_k(self.top_k)
            .with_max_sentences(self.max_sentences)
            .with_min_score(self.min_score);
        if self.strict {
            config = config.with_error_mode(ErrorMode::Strict);
        }
        if self.sequential {
            config = config.sequential();
        }
        config
    }

    fn json_format(&self) -> JsonFormat {
        if self.compact {
            JsonFormat::Compact
        } else {
            JsonFormat::Pretty
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum EmbedderKind {
    /// Feature hashing, offline and deterministic
    Hashing,
    /// all-MiniLM-L6-v2 sentence embeddings
    Minilm,
}

impl Default for EmbedderKind {
    fn default() -> Self {
        if cfg!(feature = "fastembed") {
            EmbedderKind::Minilm
        } else {
            EmbedderKind::Hashing
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run { input, output, run }) => {
            cmd_run(input.as_deref(), output.as_deref(), &run)
        }
        Some(Commands::Sections { input }) => cmd_sections(&input),
        Some(Commands::FetchModel { model_cache }) => cmd_fetch_model(model_cache.as_deref()),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => cmd_run(cli.input.as_deref(), cli.output.as_deref(), &cli.run),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_embedder(
    kind: EmbedderKind,
    model_cache: Option<&Path>,
) -> Result<Box<dyn Embedder>, Box<dyn std::error::Error>> {
    match kind {
        EmbedderKind::Hashing => Ok(Box::new(HashingEmbedder::default())),
        #[cfg(feature = "fastembed")]
        EmbedderKind::Minilm => {
            let dir = model_cache.unwrap_or_else(|| Path::new(sectionrank::DEFAULT_MODEL_CACHE));
            Ok(Box::new(sectionrank::MiniLmEmbedder::from_cache(dir)?))
        }
        #[cfg(not(feature = "fastembed"))]
        EmbedderKind::Minilm => {
            let _ = model_cache;
            Err("the minilm embedder needs a build with the `fastembed` feature".into())
        }
    }
}

#[cfg(feature = "fastembed")]
fn cmd_fetch_model(model_cache: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let dir = model_cache.unwrap_or_else(|| Path::new(sectionrank::DEFAULT_MODEL_CACHE));
    if sectionrank::is_model_cached(dir) {
        println!("{} {}", "Already cached in".green(), dir.display());
        return Ok(());
    }
    sectionrank::MiniLmEmbedder::download(dir)?;
    println!("{} {}", "Saved model to".green(), dir.display());
    Ok(())
}

#[cfg(not(feature = "fastembed"))]
fn cmd_fetch_model(_model_cache: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    Err("fetch-model needs a build with the `fastembed` feature".into())
}

fn cmd_run(
    input: Option<&Path>,
    output: Option<&Path>,
    args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let input_dir = input.unwrap_or_else(|| Path::new("input"));
    let output_dir = output.unwrap_or_else(|| Path::new("output"));

    let config = args.config();
    config.validate()?;

    let challenge_path = find_challenge_file(input_dir)?;
    let challenge = Challenge::from_path(&challenge_path)?;
    let query = challenge.query()?;
    println!(
        "{} {}",
        "Challenge:".cyan().bold(),
        challenge_path.display()
    );

    let embedder = load_embedder(args.embedder, args.model_cache.as_deref())?;
    log::info!("using embedder {}", embedder.model_name());

    let pipeline = Pipeline::new(embedder).with_config(config);
    let paths = challenge.document_paths(input_dir);

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Extracting...");

    let result = pipeline.run_with_progress(&paths, &query, |path| {
        pb.set_message(document_name(path));
        pb.inc(1);
    });
    pb.finish_and_clear();
    let result = result?;

    let json = report::to_json(&result, args.json_format())?;
    fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join(OUTPUT_FILE);
    fs::write(&output_path, &json)?;

    println!("\n{}", "Ranked sections:".green().bold());
    for section in &result.extracted_sections {
        println!(
            "  {} {} {}",
            format!("{}.", section.importance_rank).bold(),
            section.section_title,
            format!("({}, p{})", section.document, section.page_number).dimmed()
        );
    }
    println!(
        "\n{} {}",
        "Saved to".green(),
        output_path.display()
    );

    Ok(())
}

fn cmd_sections(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let sections = sectionrank::segment_file(input)?;

    println!("{}", document_name(input).cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for section in &sections {
        let first_line = section.content.lines().next().unwrap_or_default();
        println!(
            "{} {} {}",
            format!("p{}", section.page_number).dimmed(),
            section.title.bold(),
            first_line.dimmed()
        );
    }

    println!("\n{} sections", sections.len());
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "sectionrank".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Persona-driven section ranking for PDF collections");
    println!();
    println!(
        "Embedding backends: hashing{}",
        if cfg!(feature = "fastembed") { ", minilm" } else { "" }
    );
}
