//! Batch evaluation - answer every question in a CSV and record the results
//!
//! ```text
//! questions.csv ─► RagSystem::retrieve ─► stream_answer (timed) ─► results.csv
//! ```
//!
//! Each output row carries the top three evidence items, the answer and the
//! generation timing (TTFT, TPS, fragment count, wall time). A failing
//! question is written as an `ERROR` row and the run moves on.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::rag::{QueryResponse, RagError, RagSystem};
use crate::types::Evidence;

/// Retrieval columns in the results file.
pub const RETRIEVAL_COLUMNS: usize = 3;

/// Characters of evidence content kept in a retrieval cell.
pub const EVIDENCE_PREVIEW_CHARS: usize = 200;

const MISSING_CELL: &str = "N/A";
const ERROR_CELL: &str = "ERROR";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch file error ({}): {}", .0.display(), .1)]
    Open(PathBuf, #[source] io::Error),

    #[error("Malformed questions file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write results: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Input
// ============================================================================

fn unknown() -> String {
    "unknown".to_string()
}

/// One row of the questions file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default = "unknown")]
    pub category: String,
    #[serde(default = "unknown")]
    pub expected_answer_type: String,
}

impl BatchQuestion {
    pub fn new(question: &str, category: &str) -> Self {
        Self {
            question: question.to_string(),
            category: category.to_string(),
            expected_answer_type: unknown(),
        }
    }
}

/// Parse questions from CSV with a header row. Blank questions are skipped.
pub fn read_questions<R: Read>(source: R) -> Result<Vec<BatchQuestion>, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut questions = Vec::new();
    for (row, record) in reader.deserialize::<BatchQuestion>().enumerate() {
        let question = record?;
        if question.question.is_empty() {
            warn!(row = row + 1, "Skipping row without a question");
            continue;
        }
        questions.push(question);
    }
    Ok(questions)
}

pub fn load_questions(path: &Path) -> Result<Vec<BatchQuestion>, BatchError> {
    let file = File::open(path).map_err(|e| BatchError::Open(path.to_path_buf(), e))?;
    let questions = read_questions(file)?;
    info!(path = %path.display(), count = questions.len(), "Loaded batch questions");
    Ok(questions)
}

// ============================================================================
// Timing
// ============================================================================

/// Generation-phase timing for one answer. Retrieval is not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationTiming {
    /// Elapsed time when the first fragment arrived.
    pub first_token: Option<Duration>,
    pub total: Duration,
    /// Fragments received.
    pub tokens: usize,
}

impl GenerationTiming {
    /// Time to first token in seconds, 0 when nothing was generated.
    pub fn ttft(&self) -> f64 {
        self.first_token.map_or(0.0, |d| d.as_secs_f64())
    }

    /// Fragments per second after the first one arrived.
    pub fn tps(&self) -> f64 {
        let window = match self.first_token {
            Some(first) => self.total.saturating_sub(first),
            None => self.total,
        };
        let secs = window.as_secs_f64();
        if secs > 0.0 {
            self.tokens as f64 / secs
        } else {
            0.0
        }
    }
}

/// Answer one question, timing the generation phase.
///
/// # Errors
///
/// Retrieval failures, and generation failures either at the request or
/// mid-stream.
pub fn answer_timed(
    rag: &RagSystem,
    question: &str,
) -> Result<(QueryResponse, GenerationTiming), RagError> {
    let outcome = rag.retrieve(question)?;

    let start = Instant::now();
    let mut timing = GenerationTiming::default();
    let mut raw = String::new();
    for fragment in rag.stream_answer(question, &outcome.context)? {
        let fragment = fragment?;
        if timing.first_token.is_none() {
            timing.first_token = Some(start.elapsed());
        }
        timing.tokens += 1;
        raw.push_str(&fragment);
    }
    timing.total = start.elapsed();

    let response = QueryResponse {
        question: question.to_string(),
        retrieval_results: outcome.evidence,
        answer: rag.finalize_answer(raw, question),
    };
    Ok((response, timing))
}

// ============================================================================
// Output
// ============================================================================

/// Retrieval cell: `[CHUNK][0.8700] content`, content flattened and cut.
pub fn format_evidence(evidence: &Evidence) -> String {
    let flat = evidence.content.replace('\n', " ");
    let preview: String = flat.chars().take(EVIDENCE_PREVIEW_CHARS).collect();
    format!(
        "[{}][{:.4}] {}",
        evidence.kind.to_string().to_uppercase(),
        evidence.score,
        preview
    )
}

/// The first three evidence items as cells, padded with `N/A`.
pub fn retrieval_cells(evidence: &[Evidence]) -> [String; RETRIEVAL_COLUMNS] {
    std::array::from_fn(|i| {
        evidence
            .get(i)
            .map_or_else(|| MISSING_CELL.to_string(), format_evidence)
    })
}

/// One line of the results file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRow {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Expected Type")]
    pub expected_type: String,
    #[serde(rename = "Retrieval 1")]
    pub retrieval_1: String,
    #[serde(rename = "Retrieval 2")]
    pub retrieval_2: String,
    #[serde(rename = "Retrieval 3")]
    pub retrieval_3: String,
    #[serde(rename = "Generated Answer")]
    pub answer: String,
    #[serde(rename = "TTFT (s)")]
    pub ttft: String,
    #[serde(rename = "TPS (tokens/s)")]
    pub tps: String,
    #[serde(rename = "Total Tokens")]
    pub total_tokens: String,
    #[serde(rename = "Total Time (s)")]
    pub total_time: String,
}

impl BatchRow {
    pub fn answered(input: &BatchQuestion, response: &QueryResponse, timing: &GenerationTiming) -> Self {
        let [retrieval_1, retrieval_2, retrieval_3] = retrieval_cells(&response.retrieval_results);
        Self {
            question: input.question.clone(),
            category: input.category.clone(),
            expected_type: input.expected_answer_type.clone(),
            retrieval_1,
            retrieval_2,
            retrieval_3,
            answer: response.answer.clone(),
            ttft: format!("{:.4}", timing.ttft()),
            tps: format!("{:.2}", timing.tps()),
            total_tokens: timing.tokens.to_string(),
            total_time: format!("{:.4}", timing.total.as_secs_f64()),
        }
    }

    pub fn failed(input: &BatchQuestion, error: &RagError) -> Self {
        Self {
            question: input.question.clone(),
            category: input.category.clone(),
            expected_type: input.expected_answer_type.clone(),
            retrieval_1: ERROR_CELL.to_string(),
            retrieval_2: ERROR_CELL.to_string(),
            retrieval_3: ERROR_CELL.to_string(),
            answer: error.to_string(),
            ttft: ERROR_CELL.to_string(),
            tps: ERROR_CELL.to_string(),
            total_tokens: ERROR_CELL.to_string(),
            total_time: ERROR_CELL.to_string(),
        }
    }
}

/// Open `path` for results: parent directory created, UTF-8 BOM written.
pub fn create_results_file(path: &Path) -> Result<csv::Writer<File>, BatchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BatchError::Open(parent.to_path_buf(), e))?;
    }
    let mut file = File::create(path).map_err(|e| BatchError::Open(path.to_path_buf(), e))?;
    // Spreadsheet apps need the BOM to detect UTF-8
    file.write_all(UTF8_BOM)?;
    Ok(csv::Writer::from_writer(file))
}

// ============================================================================
// Run
// ============================================================================

/// Totals for a finished run. Means cover successful rows only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub mean_ttft: Option<f64>,
    pub mean_tps: Option<f64>,
}

/// Answer every question, writing and flushing one row each.
///
/// # Errors
///
/// Only write failures abort the run. Per-question failures become
/// `ERROR` rows.
pub fn run_batch<W: Write>(
    rag: &RagSystem,
    questions: &[BatchQuestion],
    writer: &mut csv::Writer<W>,
) -> Result<BatchSummary, BatchError> {
    let mut summary = BatchSummary {
        total: questions.len(),
        ..BatchSummary::default()
    };
    let mut ttft_sum = 0.0;
    let mut tps_sum = 0.0;

    for (i, input) in questions.iter().enumerate() {
        info!(
            progress = %format!("{}/{}", i + 1, questions.len()),
            category = %input.category,
            question = %input.question,
            "Answering"
        );

        let row = match answer_timed(rag, &input.question) {
            Ok((response, timing)) => {
                summary.succeeded += 1;
                ttft_sum += timing.ttft();
                tps_sum += timing.tps();
                info!(
                    ttft = %format!("{:.4}", timing.ttft()),
                    tps = %format!("{:.2}", timing.tps()),
                    tokens = timing.tokens,
                    "Answered"
                );
                BatchRow::answered(input, &response, &timing)
            }
            Err(e) => {
                summary.failed += 1;
                warn!(question = %input.question, error = %e, "Question failed");
                BatchRow::failed(input, &e)
            }
        };
        writer.serialize(&row)?;
        writer.flush()?;
    }

    if summary.succeeded > 0 {
        let n = summary.succeeded as f64;
        summary.mean_ttft = Some(ttft_sum / n);
        summary.mean_tps = Some(tps_sum / n);
    }
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        mean_ttft = ?summary.mean_ttft,
        mean_tps = ?summary.mean_tps,
        "Batch complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingBackend, RagConfig};
    use crate::llm::{GenerationError, Generator, TokenStream};
    use crate::rag::embedder_from_config;
    use crate::types::EvidenceKind;
    use std::sync::Arc;

    /// Fails whenever the prompt mentions "price"; otherwise replays fragments.
    struct FlakyGenerator;

    impl Generator for FlakyGenerator {
        fn generate(&self, _system: &str, user: &str) -> Result<TokenStream, GenerationError> {
            if user.contains("price") {
                return Err(GenerationError::Status {
                    status: 503,
                    body: "overloaded".to_string(),
                });
            }
            let items: Vec<Result<String, GenerationError>> =
                vec![Ok("Intel ".to_string()), Ok("Core".to_string())];
            Ok(Box::new(items.into_iter()))
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    const CATALOG: &str = r#"{"products": [
        {"product_id": "aorus-master-16-bxh", "product_name": "AORUS MASTER 16 BXH",
         "specs": [{"category": "Processor", "key": "CPU", "value": "Intel Core Ultra 9 275HX"}]}
    ]}"#;

    fn system(dir: &Path) -> RagSystem {
        let catalog = dir.join("specs.json");
        std::fs::write(&catalog, CATALOG).unwrap();
        let mut config = RagConfig::default();
        config.data.catalog_path = catalog;
        config.data.qa_path = dir.join("missing_qa.json");
        config.embedding.backend = EmbeddingBackend::Hashing;
        let embedder = embedder_from_config(&config.embedding).unwrap();
        RagSystem::build_with(&config, embedder, Arc::new(FlakyGenerator)).unwrap()
    }

    fn evidence(kind: EvidenceKind, content: &str, score: f32) -> Evidence {
        Evidence {
            kind,
            content: content.to_string(),
            score,
        }
    }

    #[test]
    fn test_read_questions_fills_defaults_and_skips_blanks() {
        let csv = "question,category,notes\n\
                   What CPU does the BXH have?,cpu,x\n\
                   ,gpu,blank\n\
                   How heavy is it?\n";
        let questions = read_questions(csv.as_bytes()).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "What CPU does the BXH have?");
        assert_eq!(questions[0].category, "cpu");
        assert_eq!(questions[0].expected_answer_type, "unknown");
        assert_eq!(questions[1], BatchQuestion::new("How heavy is it?", "unknown"));
    }

    #[test]
    fn test_load_questions_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_questions(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, BatchError::Open(..)));
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn test_format_evidence_flattens_and_truncates() {
        let long = format!("Product: BXH\n{}", "規".repeat(300));
        let cell = format_evidence(&evidence(EvidenceKind::Chunk, &long, 0.87));
        assert!(cell.starts_with("[CHUNK][0.8700] Product: BXH 規"));
        assert!(!cell.contains('\n'));
        let body = cell.trim_start_matches("[CHUNK][0.8700] ");
        assert_eq!(body.chars().count(), EVIDENCE_PREVIEW_CHARS);

        let qa = format_evidence(&evidence(EvidenceKind::Qa, "Q: a\nA: b", 1.0));
        assert_eq!(qa, "[QA][1.0000] Q: a A: b");
    }

    #[test]
    fn test_retrieval_cells_pad_with_na() {
        let cells = retrieval_cells(&[evidence(EvidenceKind::Chunk, "cpu", 0.5)]);
        assert_eq!(cells[0], "[CHUNK][0.5000] cpu");
        assert_eq!(cells[1], "N/A");
        assert_eq!(cells[2], "N/A");
    }

    #[test]
    fn test_timing_metrics() {
        let timing = GenerationTiming {
            first_token: Some(Duration::from_millis(500)),
            total: Duration::from_millis(2500),
            tokens: 10,
        };
        assert!((timing.ttft() - 0.5).abs() < 1e-9);
        assert!((timing.tps() - 5.0).abs() < 1e-9);

        let silent = GenerationTiming {
            first_token: None,
            total: Duration::from_secs(1),
            tokens: 0,
        };
        assert_eq!(silent.ttft(), 0.0);
        assert_eq!(silent.tps(), 0.0);
        assert_eq!(GenerationTiming::default().tps(), 0.0);
    }

    #[test]
    fn test_answered_row_formats_timing() {
        let response = QueryResponse {
            question: "q".to_string(),
            retrieval_results: vec![evidence(EvidenceKind::Qa, "Q: q\nA: a", 0.91)],
            answer: "a".to_string(),
        };
        let timing = GenerationTiming {
            first_token: Some(Duration::from_millis(250)),
            total: Duration::from_millis(1250),
            tokens: 3,
        };
        let row = BatchRow::answered(&BatchQuestion::new("q", "qa"), &response, &timing);
        assert_eq!(row.retrieval_1, "[QA][0.9100] Q: q A: a");
        assert_eq!(row.retrieval_2, "N/A");
        assert_eq!(row.ttft, "0.2500");
        assert_eq!(row.tps, "3.00");
        assert_eq!(row.total_tokens, "3");
        assert_eq!(row.total_time, "1.2500");
    }

    #[test]
    fn test_run_batch_writes_error_rows_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let rag = system(dir.path());
        let questions = vec![
            BatchQuestion::new("What is the price?", "price"),
            BatchQuestion::new("What CPU does the BXH have?", "cpu"),
        ];

        let mut writer = csv::Writer::from_writer(Vec::new());
        let summary = run_batch(&rag, &questions, &mut writer).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.mean_tps.is_some());

        let bytes = writer.into_inner().unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 11);
        assert_eq!(&headers[0], "Question");
        assert_eq!(&headers[7], "TTFT (s)");

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][3], "ERROR");
        assert!(rows[0][6].contains("503"));
        assert_eq!(&rows[0][9], "ERROR");

        assert_eq!(&rows[1][1], "cpu");
        assert_eq!(&rows[1][2], "unknown");
        assert!(rows[1][3].starts_with("[CHUNK]["));
        assert_eq!(&rows[1][6], "Intel Core");
        assert_eq!(&rows[1][9], "2");
    }

    #[test]
    fn test_results_file_starts_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("out.csv");
        let mut writer = create_results_file(&path).unwrap();
        writer
            .serialize(BatchRow::failed(
                &BatchQuestion::new("q", "c"),
                &RagError::Generation(GenerationError::Stream("x".to_string())),
            ))
            .unwrap();
        writer.flush().unwrap();
        drop(writer);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("Question,Category,Expected Type,Retrieval 1"));
    }
}
