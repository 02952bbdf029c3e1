use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const MOVE_TARGET: &str = "arcade_bench::move";
pub const GUESS_TARGET: &str = "arcade_bench::guess";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub moves: MoveTelemetrySummary,
    pub guesses: GuessTelemetrySummary,
}

#[derive(Debug, Default, Serialize)]
pub struct MoveTelemetrySummary {
    pub count: usize,
    pub avg_score_delta: Option<f64>,
    pub avg_empty_cells: Option<f64>,
    pub direction_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Serialize)]
pub struct GuessTelemetrySummary {
    pub questions: usize,
    pub guesses: usize,
    pub correct: usize,
    pub avg_confidence: Option<f64>,
    pub answer_counts: BTreeMap<String, usize>,
    pub reason_counts: BTreeMap<String, usize>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregate move and guess events from a JSON telemetry log.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut moves = MoveTelemetrySummary::default();
    let mut delta_avg = Average::new();
    let mut empty_avg = Average::new();

    let mut guesses = GuessTelemetrySummary::default();
    let mut confidence_avg = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            MOVE_TARGET => {
                moves.count += 1;
                if let Some(delta) = fields.get("score_delta").and_then(Value::as_f64) {
                    delta_avg.add(delta);
                }
                if let Some(empty) = fields.get("empty_cells").and_then(Value::as_f64) {
                    empty_avg.add(empty);
                }
                bump(&mut moves.direction_counts, label(&fields, "direction"));
            }
            GUESS_TARGET => match fields.get("phase").and_then(Value::as_str) {
                Some("question") => {
                    guesses.questions += 1;
                    bump(&mut guesses.answer_counts, label(&fields, "answer"));
                }
                Some("guess") => {
                    guesses.guesses += 1;
                    if fields.get("correct").and_then(Value::as_bool) == Some(true) {
                        guesses.correct += 1;
                    }
                    if let Some(confidence) = fields.get("confidence").and_then(Value::as_f64) {
                        confidence_avg.add(confidence);
                    }
                    bump(&mut guesses.reason_counts, label(&fields, "reason"));
                }
                _ => {}
            },
            _ => {}
        }
    }

    moves.avg_score_delta = delta_avg.mean();
    moves.avg_empty_cells = empty_avg.mean();
    guesses.avg_confidence = confidence_avg.mean();

    Ok(TelemetrySummary { moves, guesses })
}

fn label<'a>(fields: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("<unset>")
}

fn bump(counts: &mut BTreeMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(
        &json_path,
        serde_json::to_vec_pretty(&summary).map_err(TelemetryError::from)?,
    )
    .map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary json",
        source,
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    let moves = &outputs.summary.moves;
    section.push_str(&format!("- Move events captured: {}\n", moves.count));
    if let Some(value) = moves.avg_score_delta {
        section.push_str(&format!("- Avg merge score per move: {:.2}\n", value));
    }
    if let Some(value) = moves.avg_empty_cells {
        section.push_str(&format!("- Avg empty cells after move: {:.2}\n", value));
    }
    if !moves.direction_counts.is_empty() {
        section.push_str("- Directions:\n");
        for (label, count) in &moves.direction_counts {
            section.push_str(&format!("  - {}: {}\n", label, count));
        }
    }

    let guesses = &outputs.summary.guesses;
    section.push_str("\n### Guessing\n");
    if guesses.guesses == 0 {
        section.push_str("- <none>\n");
    } else {
        section.push_str(&format!(
            "- Questions asked: {}\n- Guesses: {} ({} correct)\n",
            guesses.questions, guesses.guesses, guesses.correct
        ));
        if let Some(value) = guesses.avg_confidence {
            section.push_str(&format!("- Avg guess confidence: {:.3}\n", value));
        }
        for (label, count) in &guesses.reason_counts {
            section.push_str(&format!("- {}: {}\n", label, count));
        }
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    output.push_str("## Moves\n");
    output.push_str(&format!("- Events: {}\n", summary.moves.count));
    if let Some(value) = summary.moves.avg_score_delta {
        output.push_str(&format!("- Avg score delta: {:.2}\n", value));
    }
    if let Some(value) = summary.moves.avg_empty_cells {
        output.push_str(&format!("- Avg empty cells: {:.2}\n", value));
    }
    for (label, count) in &summary.moves.direction_counts {
        output.push_str(&format!("- {}: {}\n", label, count));
    }
    output.push('\n');

    output.push_str("## Guessing\n");
    output.push_str(&format!("- Questions: {}\n", summary.guesses.questions));
    output.push_str(&format!(
        "- Guesses: {} ({} correct)\n",
        summary.guesses.guesses, summary.guesses.correct
    ));
    if let Some(value) = summary.guesses.avg_confidence {
        output.push_str(&format!("- Avg confidence: {:.3}\n", value));
    }
    if !summary.guesses.answer_counts.is_empty() {
        output.push_str("- Answers:\n");
        for (label, count) in &summary.guesses.answer_counts {
            output.push_str(&format!("  - {}: {}\n", label, count));
        }
    }
    if !summary.guesses.reason_counts.is_empty() {
        output.push_str("- Reasons:\n");
        for (label, count) in &summary.guesses.reason_counts {
            output.push_str(&format!("  - {}: {}\n", label, count));
        }
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
