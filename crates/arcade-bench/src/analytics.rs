use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::arena::{DecisionSummary, GameOutcome, RoundOutcome};
use crate::config::{AgentConfig, AgentKind, BenchmarkConfig};

const CONFIDENCE_Z: f64 = 1.96; // 95% CI
const TARGET_TILE: u32 = 2048;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline agent '{0}' not present in run results")]
    MissingBaseline(String),
    #[error("agent '{0}' defined in results but missing from configuration")]
    UnknownAgent(String),
    #[error("baseline '{0}' missing for game {1}")]
    MissingBaselineGame(String, String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

pub struct AnalyticsCollector {
    baseline: String,
    agents: HashMap<String, AgentAccumulator>,
    comparisons: HashMap<String, ComparisonAccumulator>,
    agent_order: Vec<String>,
    guessing: Option<GuessAccumulator>,
    latency_budget_ms: u64,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut agents = HashMap::new();
        let mut order = Vec::new();
        for agent in &config.agents {
            agents.insert(
                agent.name.clone(),
                AgentAccumulator::new(agent.clone(), config.metrics.latency_budget_ms),
            );
            order.push(agent.name.clone());
        }

        Ok(Self {
            baseline,
            agents,
            comparisons: HashMap::new(),
            agent_order: order,
            guessing: config.guessing.as_ref().map(|_| GuessAccumulator::default()),
            latency_budget_ms: config.metrics.latency_budget_ms,
        })
    }

    /// Records every agent's result on one shared seed.
    pub fn record_game(
        &mut self,
        game_index: usize,
        outcomes: &[GameOutcome],
    ) -> Result<(), AnalyticsError> {
        let game_id = format!("G{game_index:05}");

        let best_score = outcomes.iter().map(|o| o.score).max().unwrap_or(0);
        let baseline_score = outcomes
            .iter()
            .find(|o| o.agent_name == self.baseline)
            .map(|o| o.score as f64)
            .ok_or_else(|| AnalyticsError::MissingBaselineGame(self.baseline.clone(), game_id))?;

        for outcome in outcomes {
            let acc = self
                .agents
                .get_mut(&outcome.agent_name)
                .ok_or_else(|| AnalyticsError::UnknownAgent(outcome.agent_name.clone()))?;
            acc.record_game(outcome, outcome.score == best_score);
        }

        for outcome in outcomes {
            if outcome.agent_name == self.baseline {
                continue;
            }
            let diff = outcome.score as f64 - baseline_score;
            self.comparisons
                .entry(outcome.agent_name.clone())
                .or_insert_with(ComparisonAccumulator::new)
                .record(diff);
        }

        Ok(())
    }

    pub fn record_round(&mut self, outcome: &RoundOutcome) {
        self.guessing
            .get_or_insert_with(GuessAccumulator::default)
            .record(outcome);
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let mut reports = Vec::new();
        for name in &self.agent_order {
            if let Some(acc) = self.agents.remove(name) {
                reports.push(acc.into_report());
            }
        }

        if !reports.iter().any(|r| r.name == self.baseline) {
            return Err(AnalyticsError::MissingBaseline(self.baseline));
        }

        let mut comparisons = Vec::new();
        for report in &reports {
            if report.name == self.baseline {
                comparisons.push(ComparisonReport {
                    agent: report.name.clone(),
                    p_value: 1.0,
                    sample_size: report.games,
                });
                continue;
            }
            let (p_value, sample_size) = self
                .comparisons
                .remove(&report.name)
                .map(ComparisonAccumulator::wilcoxon_signed_rank)
                .unwrap_or((1.0, 0));
            comparisons.push(ComparisonReport {
                agent: report.name.clone(),
                p_value,
                sample_size,
            });
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            agents: reports,
            comparisons,
            guessing: self.guessing.map(GuessAccumulator::into_report),
            latency_budget_ms: self.latency_budget_ms,
        }
        .enrich())
    }
}

struct AgentAccumulator {
    config: AgentConfig,
    total_score: f64,
    games: u32,
    wins: u32,
    reached_target: u32,
    best_tile: u32,
    total_moves: u64,
    per_game_scores: Vec<f64>,
    total_latency_ms: f64,
    total_decisions: u64,
    latency_budget_ms: u64,
}

impl AgentAccumulator {
    fn new(config: AgentConfig, latency_budget_ms: u64) -> Self {
        Self {
            config,
            total_score: 0.0,
            games: 0,
            wins: 0,
            reached_target: 0,
            best_tile: 0,
            total_moves: 0,
            per_game_scores: Vec::new(),
            total_latency_ms: 0.0,
            total_decisions: 0,
            latency_budget_ms,
        }
    }

    fn record_game(&mut self, outcome: &GameOutcome, is_winner: bool) {
        let score = outcome.score as f64;
        self.total_score += score;
        self.games += 1;
        self.per_game_scores.push(score);
        if is_winner {
            self.wins += 1;
        }
        if outcome.max_tile >= TARGET_TILE {
            self.reached_target += 1;
        }
        self.best_tile = self.best_tile.max(outcome.max_tile);
        self.total_moves += u64::from(outcome.moves);
        self.record_latency(&outcome.metrics);
    }

    fn record_latency(&mut self, metrics: &DecisionSummary) {
        self.total_latency_ms += metrics.total_ms;
        self.total_decisions += u64::from(metrics.decisions);
    }

    fn into_report(self) -> AgentReport {
        let games = f64::from(self.games.max(1));
        let (ci_low, ci_high) = confidence_interval(&self.per_game_scores);

        let avg_latency = if self.total_decisions == 0 {
            0.0
        } else {
            self.total_latency_ms / self.total_decisions as f64
        };

        AgentReport {
            name: self.config.name.clone(),
            kind: self.config.kind.clone(),
            params: self.config.params.clone(),
            games: self.games as usize,
            avg_score: self.total_score / games,
            ci95: (ci_low, ci_high),
            wins: self.wins as usize,
            reached_2048: self.reached_target as usize,
            best_tile: self.best_tile,
            avg_moves: self.total_moves as f64 / games,
            average_ms_per_decision: avg_latency,
            delta_vs_baseline: 0.0,
            over_budget: avg_latency > self.latency_budget_ms as f64,
        }
    }
}

#[derive(Default)]
struct GuessAccumulator {
    rounds: usize,
    correct: usize,
    total_questions: usize,
    total_confidence: f64,
    reasons: BTreeMap<String, usize>,
}

impl GuessAccumulator {
    fn record(&mut self, outcome: &RoundOutcome) {
        self.rounds += 1;
        if outcome.correct {
            self.correct += 1;
        }
        self.total_questions += outcome.questions;
        self.total_confidence += outcome.confidence;
        *self
            .reasons
            .entry(outcome.reason.as_str().to_string())
            .or_insert(0) += 1;
    }

    fn into_report(self) -> GuessReport {
        let rounds = self.rounds.max(1) as f64;
        GuessReport {
            rounds: self.rounds,
            correct: self.correct,
            accuracy: self.correct as f64 / rounds,
            avg_questions: self.total_questions as f64 / rounds,
            avg_confidence: self.total_confidence / rounds,
            reasons: self.reasons,
        }
    }
}

#[derive(Clone)]
struct ComparisonAccumulator {
    diffs: Vec<f64>,
}

impl ComparisonAccumulator {
    fn new() -> Self {
        Self { diffs: Vec::new() }
    }

    fn record(&mut self, diff: f64) {
        self.diffs.push(diff);
    }

    /// Two-sided Wilcoxon signed-rank test (normal approximation, tie-corrected).
    fn wilcoxon_signed_rank(self) -> (f64, usize) {
        let diffs: Vec<f64> = self
            .diffs
            .into_iter()
            .filter(|d| d.abs() > f64::EPSILON)
            .collect();
        let n = diffs.len();
        if n == 0 {
            return (1.0, 0);
        }

        let mut paired: Vec<(f64, f64)> =
            diffs.into_iter().map(|d| (d.abs(), d.signum())).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut ranks = Vec::with_capacity(n);
        let mut tie_sizes = Vec::new();
        let mut i = 0;
        while i < paired.len() {
            let mut j = i;
            while j + 1 < paired.len() && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
                j += 1;
            }
            let rank = (i + j + 2) as f64 / 2.0;
            for item in &paired[i..=j] {
                ranks.push((rank, item.1));
            }
            if j > i {
                tie_sizes.push(j - i + 1);
            }
            i = j + 1;
        }

        let w_plus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign > 0.0)
            .map(|(rank, _)| *rank)
            .sum();
        let w_minus: f64 = ranks
            .iter()
            .filter(|(_, sign)| *sign < 0.0)
            .map(|(rank, _)| *rank)
            .sum();

        let w = w_plus.min(w_minus);
        let n_f = n as f64;
        let mean_w = n_f * (n_f + 1.0) / 4.0;

        let tie_adjustment: f64 = tie_sizes
            .into_iter()
            .map(|count| {
                let c = count as f64;
                (c.powi(3) - c) / 48.0
            })
            .sum();
        let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
        if variance_w <= 0.0 {
            return (1.0, n);
        }

        let Ok(normal) = Normal::new(0.0, 1.0) else {
            return (1.0, n);
        };
        let z = (((w - mean_w).abs() - 0.5) / variance_w.sqrt()).max(0.0);
        let p = 2.0 * (1.0 - normal.cdf(z));
        (p.clamp(0.0, 1.0), n)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub agents: Vec<AgentReport>,
    pub comparisons: Vec<ComparisonReport>,
    pub guessing: Option<GuessReport>,
    pub latency_budget_ms: u64,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_avg = self
            .agents
            .iter()
            .find(|agent| agent.name == self.baseline)
            .map(|agent| agent.avg_score)
            .unwrap_or(0.0);

        for agent in &mut self.agents {
            agent.delta_vs_baseline = agent.avg_score - baseline_avg;
        }

        self
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Arcade Bench Summary\n\n");
        rows.push_str("## Puzzle\n\n");
        rows.push_str(&format!(
            "Baseline: `{}`. Latency budget: {} ms average per move\n\n",
            self.baseline, self.latency_budget_ms
        ));
        rows.push_str("| Agent | Kind | Games | Avg score | Δ vs baseline | 95% CI | Win % | 2048 % | Best tile | Avg moves | Avg ms/move | Over Budget | p-value |\n");
        rows.push_str("|-------|------|-------|-----------|----------------|--------|-------|--------|-----------|-----------|-------------|-------------|---------|\n");

        for agent in &self.agents {
            let comparison = self
                .comparisons
                .iter()
                .find(|c| c.agent == agent.name)
                .map(|c| c.p_value)
                .unwrap_or(1.0);
            let games = agent.games.max(1) as f64;

            rows.push_str(&format!(
                "| {name} | {kind:?} | {games} | {avg:.1} | {delta:+.1} | [{ci_low:.1}, {ci_high:.1}] | {win:.1}% | {target:.1}% | {best} | {moves:.1} | {latency:.3} | {over_budget} | {pval:.3} |\n",
                name = agent.name,
                kind = agent.kind,
                games = agent.games,
                avg = agent.avg_score,
                delta = agent.delta_vs_baseline,
                ci_low = agent.ci95.0,
                ci_high = agent.ci95.1,
                win = agent.wins as f64 / games * 100.0,
                target = agent.reached_2048 as f64 / games * 100.0,
                best = agent.best_tile,
                moves = agent.avg_moves,
                latency = agent.average_ms_per_decision,
                over_budget = if agent.over_budget { "Yes" } else { "No" },
                pval = comparison,
            ));
        }

        if let Some(guessing) = self.guessing.as_ref() {
            rows.push_str("\n## Guessing\n\n");
            rows.push_str("| Rounds | Correct | Accuracy | Avg questions | Avg confidence |\n");
            rows.push_str("|--------|---------|----------|---------------|----------------|\n");
            rows.push_str(&format!(
                "| {} | {} | {:.1}% | {:.2} | {:.3} |\n",
                guessing.rounds,
                guessing.correct,
                guessing.accuracy * 100.0,
                guessing.avg_questions,
                guessing.avg_confidence
            ));
            if !guessing.reasons.is_empty() {
                rows.push_str("\nGuess reasons:\n");
                for (reason, count) in &guessing.reasons {
                    rows.push_str(&format!("- {reason}: {count}\n"));
                }
            }
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("avg_score.png");
        let baseline = self.baseline.clone();
        let agents_snapshot = self.agents.clone();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let mut agents = agents_snapshot;
            agents.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));

            let y_max = agents
                .iter()
                .map(|a| a.ci95.1.max(a.avg_score))
                .fold(1.0f64, f64::max);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption("Average score per agent (higher is better)", ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 60)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(0..agents.len(), 0.0..(y_max * 1.1))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Score")
                .x_desc("Agent")
                .x_label_formatter(&|idx| {
                    agents
                        .get(*idx)
                        .map(|agent| agent.name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(agents.iter().enumerate().map(|(idx, agent)| {
                    let color = if agent.name == baseline {
                        &BLUE
                    } else if agent.delta_vs_baseline >= 0.0 {
                        &GREEN
                    } else {
                        &RED
                    };
                    Rectangle::new([(idx, 0.0), (idx + 1, agent.avg_score)], color.filled())
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub kind: AgentKind,
    pub params: serde_yaml::Value,
    pub games: usize,
    pub avg_score: f64,
    pub ci95: (f64, f64),
    pub wins: usize,
    pub reached_2048: usize,
    pub best_tile: u32,
    pub avg_moves: f64,
    pub average_ms_per_decision: f64,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
    #[serde(skip)]
    pub over_budget: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub agent: String,
    pub p_value: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuessReport {
    pub rounds: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub avg_questions: f64,
    pub avg_confidence: f64,
    pub reasons: BTreeMap<String, usize>,
}

fn confidence_interval(points: &[f64]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let mean = points.iter().sum::<f64>() / points.len() as f64;
    if points.len() == 1 {
        return (mean, mean);
    }
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let std_error = (variance / points.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::inference::{CandidateId, GuessReason};

    fn config() -> BenchmarkConfig {
        let yaml = r#"
run_id: "analytics"
puzzle:
  games: 3
agents:
  - name: "base"
    kind: "random"
  - name: "smart"
    kind: "greedy"
guessing:
  rounds: 2
outputs:
  jsonl: "out/games.jsonl"
  summary_md: "out/summary.md"
  plots_dir: "out/plots"
metrics:
  baseline: "base"
"#;
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(yaml).expect("parse");
        cfg.validate().expect("valid");
        cfg
    }

    fn outcome(agent: &str, score: u64, max_tile: u32) -> GameOutcome {
        GameOutcome {
            agent_name: agent.to_string(),
            score,
            moves: 100,
            max_tile,
            finished: true,
            resigned: false,
            metrics: DecisionSummary {
                decisions: 100,
                avg_ms_per_decision: 0.01,
                total_ms: 1.0,
            },
        }
    }

    fn round(correct: bool, reason: GuessReason) -> RoundOutcome {
        RoundOutcome {
            secret: CandidateId(1),
            secret_name: "a".into(),
            guess: CandidateId(if correct { 1 } else { 2 }),
            guess_name: "b".into(),
            confidence: 0.9,
            correct,
            questions: 4,
            reason,
        }
    }

    #[test]
    fn summarises_scores_wins_and_guesses() {
        let mut collector = AnalyticsCollector::new(&config()).unwrap();
        for (idx, (base, smart)) in [(100, 300), (200, 200), (150, 400)].into_iter().enumerate() {
            collector
                .record_game(idx, &[outcome("base", base, 128), outcome("smart", smart, 2048)])
                .unwrap();
        }
        collector.record_round(&round(true, GuessReason::Confident));
        collector.record_round(&round(false, GuessReason::QuestionCap));

        let summary = collector.finalize().unwrap();
        let smart = &summary.agents[1];
        assert_eq!(smart.games, 3);
        assert_eq!(smart.wins, 3);
        assert_eq!(smart.reached_2048, 3);
        assert!((smart.avg_score - 300.0).abs() < 1e-9);
        assert!((smart.delta_vs_baseline - 150.0).abs() < 1e-9);
        assert_eq!(summary.agents[0].wins, 1);

        let guessing = summary.guessing.as_ref().unwrap();
        assert_eq!(guessing.rounds, 2);
        assert!((guessing.accuracy - 0.5).abs() < 1e-12);
        assert_eq!(guessing.reasons.get("question_cap"), Some(&1));
    }

    #[test]
    fn missing_baseline_in_game_is_reported() {
        let mut collector = AnalyticsCollector::new(&config()).unwrap();
        let err = collector
            .record_game(0, &[outcome("smart", 10, 8)])
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingBaselineGame(_, _)));
    }

    #[test]
    fn wilcoxon_detects_consistent_improvement() {
        let mut comp = ComparisonAccumulator::new();
        for diff in 1..=20 {
            comp.record(diff as f64);
        }
        let (p, n) = comp.wilcoxon_signed_rank();
        assert_eq!(n, 20);
        assert!(p < 0.01, "p = {p}");

        let (p_none, n_none) = ComparisonAccumulator::new().wilcoxon_signed_rank();
        assert_eq!((p_none, n_none), (1.0, 0));
    }

    #[test]
    fn writes_markdown_with_guessing_section() {
        let mut collector = AnalyticsCollector::new(&config()).unwrap();
        collector
            .record_game(0, &[outcome("base", 10, 8), outcome("smart", 20, 16)])
            .unwrap();
        collector.record_round(&round(true, GuessReason::Confident));
        let summary = collector.finalize().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");
        summary.write_markdown(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("# Arcade Bench Summary"));
        assert!(contents.contains("| smart | Greedy |"));
        assert!(contents.contains("## Guessing"));
        assert!(contents.contains("- confident: 1"));
    }

    #[test]
    fn confidence_interval_brackets_mean() {
        let (low, high) = confidence_interval(&[10.0, 20.0, 30.0]);
        assert!(low < 20.0 && high > 20.0);
        assert_eq!(confidence_interval(&[5.0]), (5.0, 5.0));
    }
}
