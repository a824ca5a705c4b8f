//! spec-rag - laptop hardware-spec assistant
//!
//! Retrieval-augmented question answering over an ingested product catalog.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session (exit / quit / q to leave)
//! spec-rag
//!
//! # One question, streamed answer
//! spec-rag --question "What GPU does the BXH have?"
//!
//! # Inspect retrieval without a generation server
//! spec-rag --context-only --hashing-embedder --question "compare BXH and BYH"
//!
//! # Answer a CSV of questions, recording evidence and timing per row
//! spec-rag --batch tests/test_questions.csv --output results/run1.csv
//! ```
//!
//! # Environment Variables
//!
//! - `SPEC_RAG_CONFIG`: Path to a `rag_config.toml`
//! - `RUST_LOG`: Logging level (default: info)

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use spec_rag::batch;
use spec_rag::config::{defaults, EmbeddingBackend, RagConfig};
use spec_rag::rag::{build_orchestrator, embedder_from_config, RagSystem};
use spec_rag::retrieval::{RetrievalOrchestrator, RetrievalOutcome};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "spec-rag")]
#[command(about = "Hardware-spec question answering over a laptop catalog")]
#[command(version)]
struct CliArgs {
    /// Config file (skips the SPEC_RAG_CONFIG / ./rag_config.toml search)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ask one question and exit
    #[arg(short, long)]
    question: Option<String>,

    /// Print assembled context and evidence instead of generating an answer
    #[arg(long)]
    context_only: bool,

    /// With --question: print the full answer and evidence as JSON
    #[arg(long, requires = "question", conflicts_with = "context_only")]
    json: bool,

    /// Answer every question in a CSV (columns: question, category, expected_answer_type)
    #[arg(long, value_name = "CSV", conflicts_with_all = ["question", "context_only", "json"])]
    batch: Option<PathBuf>,

    /// With --batch: results file
    #[arg(long, value_name = "PATH", requires = "batch")]
    output: Option<PathBuf>,

    /// Use the offline hashing embedder regardless of config
    #[arg(long)]
    hashing_embedder: bool,

    /// Write the effective configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

/// What the session does with each question.
enum Session {
    Answer(RagSystem),
    ContextOnly(RetrievalOrchestrator),
}

#[derive(Serialize)]
struct ContextReport<'a> {
    question: &'a str,
    #[serde(flatten)]
    outcome: &'a RetrievalOutcome,
}

impl Session {
    fn handle(&self, question: &str, json: bool) -> Result<()> {
        let mut out = io::stdout().lock();
        match self {
            Session::Answer(rag) if json => {
                let resp = rag.query_with_metadata(question)?;
                writeln!(out, "{}", serde_json::to_string_pretty(&resp)?)?;
            }
            Session::Answer(rag) => {
                write!(out, "Assistant: ")?;
                out.flush()?;
                for token in rag.query(question)? {
                    write!(out, "{}", token?)?;
                    out.flush()?;
                }
                writeln!(out)?;
            }
            Session::ContextOnly(orchestrator) => {
                let outcome = orchestrator.process(question)?;
                let report = ContextReport {
                    question,
                    outcome: &outcome,
                };
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            }
        }
        Ok(())
    }
}

fn load_config(args: &CliArgs) -> Result<RagConfig> {
    let mut config = match &args.config {
        Some(path) => RagConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RagConfig::load(),
    };
    if args.hashing_embedder {
        config.embedding.backend = EmbeddingBackend::Hashing;
    }
    Ok(config)
}

fn build_session(config: &RagConfig, context_only: bool) -> Result<Session> {
    if context_only {
        let embedder = embedder_from_config(&config.embedding).context("creating embedder")?;
        let orchestrator =
            build_orchestrator(config, embedder).context("building retrieval indices")?;
        return Ok(Session::ContextOnly(orchestrator));
    }
    let rag = RagSystem::build(config).context("initializing RAG system")?;
    Ok(Session::Answer(rag))
}

fn run_batch(config: &RagConfig, questions: &Path, output: &Path) -> Result<()> {
    let questions = batch::load_questions(questions)?;
    let rag = RagSystem::build(config).context("initializing RAG system")?;
    let mut writer = batch::create_results_file(output)?;

    let summary = batch::run_batch(&rag, &questions, &mut writer)?;
    info!(
        output = %output.display(),
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Results written"
    );
    Ok(())
}

fn run_interactive(session: &Session) -> Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("\nUser: ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if matches!(question.to_lowercase().as_str(), "exit" | "quit" | "q") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        if let Err(e) = session.handle(question, false) {
            error!(error = %e, "Query failed");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only answers
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        return Ok(());
    }

    info!(
        catalog = %config.data.catalog_path.display(),
        qa = %config.data.qa_path.display(),
        embedding = ?config.embedding.backend,
        "Starting spec-rag"
    );

    if let Some(questions) = &args.batch {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::BATCH_OUTPUT_PATH));
        return run_batch(&config, questions, &output);
    }

    let session = build_session(&config, args.context_only)?;

    match &args.question {
        Some(q) => session.handle(q, args.json),
        None => {
            info!("System ready (type 'exit' to quit)");
            run_interactive(&session)
        }
    }
}
