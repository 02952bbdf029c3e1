use std::fs;
use std::path::Path;

use arcade_bench::arena::{ArenaRunner, RunSummary};
use arcade_bench::config::BenchmarkConfig;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn load_config(output_dir: &Path) -> BenchmarkConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
puzzle:
  seed: 4242
  games: 3
  max_moves: 400
agents:
  - name: "random"
    kind: "random"
  - name: "greedy"
    kind: "greedy"
    params:
      empty_weight: 2.0
  - name: "corner"
    kind: "corner"
    params:
      order: ["DOWN", "LEFT", "RIGHT", "UP"]
guessing:
  seed: 77
  rounds: 6
  answer_noise: 0.1
  learn: true
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
metrics:
  baseline: "random"
logging:
  enable_structured: false
"#,
        jsonl = output_dir.join("games.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
        plots = output_dir.join("plots").display()
    );

    let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn run_once(dir: &Path) -> RunSummary {
    let config = load_config(dir);
    let outputs = config.resolved_outputs();
    let runner = ArenaRunner::new(config, outputs).expect("runner created");
    runner.run().expect("run completes")
}

/// Hash of the JSONL rows with wall-clock timing zeroed out.
fn normalized_hash(path: &Path) -> String {
    let jsonl = fs::read_to_string(path).expect("jsonl readable");
    let mut normalized = String::new();
    for line in jsonl.lines() {
        let mut value: serde_json::Value = serde_json::from_str(line).expect("row decodes to JSON");
        if let Some(obj) = value.as_object_mut()
            && let Some(speed) = obj.get_mut("speed_ms_move")
        {
            *speed = serde_json::Value::Number(
                serde_json::Number::from_f64(0.0).expect("number for normalized speed"),
            );
        }
        normalized.push_str(&serde_json::to_string(&value).expect("re-serialize normalized row"));
        normalized.push('\n');
    }

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[test]
fn arena_smoke_test_is_deterministic() {
    let first_dir = tempdir().expect("temp dir");
    let second_dir = tempdir().expect("temp dir");

    let first = run_once(first_dir.path());
    let second = run_once(second_dir.path());

    assert_eq!(first.games_played, 3);
    assert_eq!(first.guess_rounds, 6);
    assert_eq!(first.rows_written, 3 * 3 + 6);
    assert_eq!(second.rows_written, first.rows_written);

    assert_eq!(
        normalized_hash(&first.jsonl_path),
        normalized_hash(&second.jsonl_path),
        "same seeds must produce identical rows"
    );

    assert!(first.summary_path.exists(), "summary markdown missing");
    let summary = fs::read_to_string(&first.summary_path).expect("summary readable");
    assert!(summary.contains("## Guessing"));
    // Plot rendering is optional; ensure any failure surfaces explicitly
    if let Some(plot_path) = first.plot_path {
        assert!(plot_path.exists(), "plot path reported but missing on disk");
    }
}

#[test]
fn rows_respect_game_invariants() {
    let dir = tempdir().expect("temp dir");
    let summary = run_once(dir.path());
    let jsonl = fs::read_to_string(&summary.jsonl_path).expect("jsonl readable");

    let mut puzzle_rows = 0;
    let mut guess_rows = 0;
    for line in jsonl.lines() {
        let row: serde_json::Value = serde_json::from_str(line).expect("row decodes");
        match row["mode"].as_str() {
            Some("puzzle") => {
                puzzle_rows += 1;
                let moves = row["moves"].as_u64().expect("moves");
                assert!(moves <= 400);
                let max_tile = row["max_tile"].as_u64().expect("max tile");
                assert!(max_tile.is_power_of_two() && max_tile >= 2);
                let resigned = row["resigned"].as_bool().expect("resigned flag");
                assert!(!resigned, "built-in agents always pick a legal move");
                if !row["finished"].as_bool().expect("finished flag") {
                    assert_eq!(moves, 400, "unfinished games stop at the move cap");
                }
            }
            Some("guess") => {
                guess_rows += 1;
                let correct = row["correct"].as_bool().expect("correct flag");
                assert_eq!(correct, row["secret_id"] == row["guess_id"]);
                let confidence = row["confidence"].as_f64().expect("confidence");
                assert!(confidence > 0.0 && confidence <= 1.0);
            }
            other => panic!("unexpected row mode {other:?}"),
        }
    }
    assert_eq!(puzzle_rows, 9);
    assert_eq!(guess_rows, 6);
}
