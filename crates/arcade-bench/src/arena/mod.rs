mod agents;
mod answerer;

pub use agents::{CornerAgent, GreedyAgent, MoveAgent, MoveContext, RandomAgent};
pub use answerer::{SimulatedAnswerer, draw_secret};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use arcade_core::board::Direction;
use arcade_core::game::{GameError, GuessRound, PuzzleSession, RoundStep};
use arcade_core::inference::{Catalog, CatalogError, CandidateId, GuessReason, InferenceEngine};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{AgentConfig, AgentKind, BenchmarkConfig, GuessingConfig, ResolvedOutputs};
use crate::logging::telemetry_dir;
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

const DEFAULT_EMPTY_WEIGHT: f64 = 4.0;
const TARGET_TILE: u32 = 2048;

/// Primary entry point for self-play runs.
pub struct ArenaRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    agents: Vec<AgentBlueprint>,
    catalog: Option<Catalog>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub guess_rounds: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl ArenaRunner {
    /// Build a runner from a validated configuration.
    ///
    /// Loads the guessing dataset up front so a bad file fails before any game is played.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let agents = AgentBlueprint::from_configs(&config.agents)?;
        let catalog = config.guessing.as_ref().map(load_catalog).transpose()?;

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            agents,
            catalog,
        })
    }

    /// Execute every puzzle game and guessing round, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.puzzle.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config)?;

        for game_index in 0..self.config.puzzle.games {
            let game_seed = rng.next_u64();
            let mut outcomes = Vec::with_capacity(self.agents.len());
            for (agent_index, agent) in self.agents.iter().enumerate() {
                outcomes.push(self.play_game(game_index, game_seed, agent_index, agent)?);
            }
            analytics.record_game(game_index, &outcomes)?;
            rows_written +=
                write_game_rows(&mut writer, &self.config, game_index, game_seed, &outcomes)?;
        }

        let mut guess_rounds = 0usize;
        if let (Some(guessing), Some(catalog)) = (self.config.guessing.as_ref(), &self.catalog) {
            let mut catalog = catalog.clone();
            let engine = InferenceEngine::new(guessing.inference_config());
            let mut rng = StdRng::seed_from_u64(guessing.seed.unwrap_or(0));

            for round_index in 0..guessing.rounds {
                let outcome =
                    self.play_round(round_index, guessing, engine, &mut catalog, &mut rng)?;
                analytics.record_round(&outcome);
                let row = GuessLogRow::new(&self.config.run_id, round_index, &outcome);
                serde_json::to_writer(&mut writer, &row)?;
                writer.write_all(b"\n")?;
                rows_written += 1;
                guess_rounds += 1;
            }
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let telemetry_dir = telemetry_dir(&self.outputs);
        let telemetry_path = if self.logging_enabled {
            Some(telemetry_dir.join("telemetry.jsonl"))
        } else {
            None
        };

        let telemetry_outputs = if let Some(path) = telemetry_path.as_ref() {
            write_summary_outputs(path, &telemetry_dir)?
        } else {
            None
        };

        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            games_played: self.config.puzzle.games,
            guess_rounds,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            telemetry_outputs,
        })
    }

    fn play_game(
        &self,
        game_index: usize,
        game_seed: u64,
        agent_index: usize,
        agent: &AgentBlueprint,
    ) -> Result<GameOutcome, RunnerError> {
        let mut session = PuzzleSession::with_seed(game_seed);
        let mut policy = agent.spawn_agent(game_seed, agent_index);
        let mut metrics = DecisionMetrics::default();
        let mut resigned = false;

        while !session.is_over() && session.moves() < self.config.puzzle.max_moves {
            let legal = session.legal_directions();
            let ctx = MoveContext {
                grid: session.grid(),
                legal: &legal,
                score: session.score(),
                moves: session.moves(),
            };

            let start = Instant::now();
            let choice = policy.choose_move(&ctx);
            let elapsed_ms = metrics.record(start.elapsed());

            let Some(direction) = choice else {
                resigned = true;
                break;
            };
            if !legal.contains(&direction) {
                return Err(RunnerError::IllegalMove {
                    agent: agent.name.clone(),
                    direction,
                });
            }

            let result = session.apply(direction)?;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "arcade_bench::move",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    game_index = game_index as u32,
                    agent = %agent.name,
                    direction = direction.as_str(),
                    score_delta = result.score_delta,
                    empty_cells = result.grid.empty_cells().len() as u32,
                    elapsed_ms
                );
            }
        }

        let grid = session.grid();
        Ok(GameOutcome {
            agent_name: agent.name.clone(),
            score: session.score(),
            moves: session.moves(),
            max_tile: grid.max_tile(),
            finished: session.is_over(),
            resigned,
            metrics: metrics.finalize(),
        })
    }

    fn play_round(
        &self,
        round_index: usize,
        guessing: &GuessingConfig,
        engine: InferenceEngine,
        catalog: &mut Catalog,
        rng: &mut StdRng,
    ) -> Result<RoundOutcome, RunnerError> {
        let secret = draw_secret(&catalog.candidates, rng).ok_or(RunnerError::EmptyCatalog)?;
        let answerer = SimulatedAnswerer::new(secret, guessing.answer_noise);
        let mut round = GuessRound::start(&catalog.candidates, engine)?;
        let mut transcript = Vec::new();

        let mut step = round.next_step(&catalog.questions, &catalog.stats)?;
        let (guess, reason) = loop {
            match step {
                RoundStep::Ask(question) => {
                    let answer = answerer.answer(question.id, &catalog.stats, rng);
                    transcript.push((question.id, answer));
                    step = round.answer(answer, &catalog.questions, &catalog.stats)?;

                    if self.logging_enabled && tracing::enabled!(Level::INFO) {
                        let leader = round.leader().map(|c| c.probability).unwrap_or_default();
                        event!(
                            target: "arcade_bench::guess",
                            Level::INFO,
                            run_id = %self.config.run_id,
                            round_index = round_index as u32,
                            phase = "question",
                            question = question.id.0,
                            answer = answer.as_str(),
                            leader_probability = leader
                        );
                    }
                }
                RoundStep::Guess { candidate, reason } => break (candidate, reason),
            }
        };

        let correct = guess.id == secret;
        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "arcade_bench::guess",
                Level::INFO,
                run_id = %self.config.run_id,
                round_index = round_index as u32,
                phase = "guess",
                reason = reason.as_str(),
                correct,
                questions = transcript.len() as u32,
                confidence = guess.probability
            );
        }

        if guessing.learn {
            for (question, answer) in &transcript {
                catalog.stats.record_answer(*question, secret, *answer);
            }
        }

        let secret_name = catalog
            .candidate(secret)
            .map(|c| c.name.clone())
            .unwrap_or_default();

        Ok(RoundOutcome {
            secret,
            secret_name,
            guess: guess.id,
            guess_name: guess.name,
            confidence: guess.probability,
            correct,
            questions: transcript.len(),
            reason,
        })
    }
}

fn load_catalog(guessing: &GuessingConfig) -> Result<Catalog, RunnerError> {
    let Some(dataset) = guessing.dataset.as_ref() else {
        return Ok(Catalog::builtin()?);
    };
    let persons = fs::read_to_string(&dataset.persons)?;
    let questions = fs::read_to_string(&dataset.questions)?;
    let catalog = Catalog::parse(&persons, &questions)?;
    if catalog.candidates.is_empty() {
        return Err(RunnerError::EmptyCatalog);
    }
    Ok(catalog)
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_rows(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    game_index: usize,
    game_seed: u64,
    outcomes: &[GameOutcome],
) -> Result<usize, RunnerError> {
    let game_id = format!("G{game_index:05}");

    let mut rows_written = 0usize;
    for outcome in outcomes {
        let row = GameLogRow {
            mode: "puzzle",
            run_id: config.run_id.clone(),
            game_id: game_id.clone(),
            game_index,
            game_seed,
            agent: outcome.agent_name.clone(),
            score: outcome.score,
            moves: outcome.moves,
            max_tile: outcome.max_tile,
            reached_2048: outcome.max_tile >= TARGET_TILE,
            finished: outcome.finished,
            resigned: outcome.resigned,
            speed_ms_move: outcome.metrics.avg_ms_per_decision,
            decisions: outcome.metrics.decisions,
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

/// Result of one agent playing one seeded game.
pub struct GameOutcome {
    pub agent_name: String,
    pub score: u64,
    pub moves: u32,
    pub max_tile: u32,
    /// The board reached a terminal state (as opposed to the move cap).
    pub finished: bool,
    /// The agent returned no move while legal moves remained.
    pub resigned: bool,
    pub metrics: DecisionSummary,
}

/// Result of one guessing round.
pub struct RoundOutcome {
    pub secret: CandidateId,
    pub secret_name: String,
    pub guess: CandidateId,
    pub guess_name: String,
    pub confidence: f64,
    pub correct: bool,
    pub questions: usize,
    pub reason: GuessReason,
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) -> f64 {
        self.total += duration;
        self.decisions += 1;
        duration.as_secs_f64() * 1000.0
    }

    fn finalize(self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Clone)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}

#[derive(Serialize)]
struct GameLogRow {
    mode: &'static str,
    run_id: String,
    game_id: String,
    game_index: usize,
    game_seed: u64,
    agent: String,
    score: u64,
    moves: u32,
    max_tile: u32,
    reached_2048: bool,
    finished: bool,
    resigned: bool,
    speed_ms_move: f64,
    decisions: u32,
}

#[derive(Serialize)]
struct GuessLogRow<'a> {
    mode: &'static str,
    run_id: &'a str,
    round_id: String,
    round_index: usize,
    secret_id: u32,
    secret: &'a str,
    guess_id: u32,
    guess: &'a str,
    correct: bool,
    questions: usize,
    reason: &'static str,
    confidence: f64,
}

impl<'a> GuessLogRow<'a> {
    fn new(run_id: &'a str, round_index: usize, outcome: &'a RoundOutcome) -> Self {
        Self {
            mode: "guess",
            run_id,
            round_id: format!("R{round_index:05}"),
            round_index,
            secret_id: outcome.secret.0,
            secret: &outcome.secret_name,
            guess_id: outcome.guess.0,
            guess: &outcome.guess_name,
            correct: outcome.correct,
            questions: outcome.questions,
            reason: outcome.reason.as_str(),
            confidence: outcome.confidence,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Agent(#[from] AgentError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("game execution failed: {0}")]
    Game(#[from] GameError),
    #[error("agent '{agent}' chose illegal move {direction}")]
    IllegalMove { agent: String, direction: Direction },
    #[error("failed to load guessing dataset: {0}")]
    Catalog(#[from] CatalogError),
    #[error("guessing dataset has no candidates")]
    EmptyCatalog,
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid {kind:?} parameter for agent '{name}': {message}")]
    InvalidParam {
        name: String,
        kind: AgentKind,
        message: String,
    },
}

struct AgentBlueprint {
    name: String,
    implementation: AgentImplementation,
}

enum AgentImplementation {
    Random { salt: u64 },
    Greedy { empty_weight: f64 },
    Corner { order: Vec<Direction> },
}

impl AgentBlueprint {
    fn from_configs(configs: &[AgentConfig]) -> Result<Vec<Self>, AgentError> {
        configs.iter().map(Self::from_config).collect()
    }

    fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let params = AgentParams::new(config)?;
        let implementation = match config.kind {
            AgentKind::Random => AgentImplementation::Random {
                salt: params.u64("seed")?.unwrap_or(0),
            },
            AgentKind::Greedy => {
                let empty_weight = params.f64("empty_weight")?.unwrap_or(DEFAULT_EMPTY_WEIGHT);
                if !empty_weight.is_finite() || empty_weight < 0.0 {
                    return Err(params.error("empty_weight must be a non-negative number"));
                }
                AgentImplementation::Greedy { empty_weight }
            }
            AgentKind::Corner => AgentImplementation::Corner {
                order: params
                    .directions("order")?
                    .unwrap_or_else(|| CornerAgent::DEFAULT_ORDER.to_vec()),
            },
        };

        Ok(Self {
            name: config.name.clone(),
            implementation,
        })
    }

    fn spawn_agent(&self, game_seed: u64, agent_index: usize) -> Box<dyn MoveAgent> {
        match &self.implementation {
            AgentImplementation::Random { salt } => {
                let seed = game_seed
                    .rotate_left(agent_index as u32 + 1)
                    .wrapping_add(*salt);
                Box::new(RandomAgent::new(seed))
            }
            AgentImplementation::Greedy { empty_weight } => {
                Box::new(GreedyAgent::new(*empty_weight))
            }
            AgentImplementation::Corner { order } => Box::new(CornerAgent::new(order.clone())),
        }
    }
}

/// Typed accessors over an agent's free-form `params` mapping.
struct AgentParams<'a> {
    name: &'a str,
    kind: AgentKind,
    mapping: Option<&'a serde_yaml::Mapping>,
}

impl<'a> AgentParams<'a> {
    fn new(config: &'a AgentConfig) -> Result<Self, AgentError> {
        let mut params = Self {
            name: &config.name,
            kind: config.kind.clone(),
            mapping: None,
        };
        if config.params.is_null() {
            return Ok(params);
        }
        let Some(mapping) = config.params.as_mapping() else {
            return Err(params.error("expected mapping for agent params"));
        };
        params.mapping = Some(mapping);
        Ok(params)
    }

    fn error(&self, message: impl Into<String>) -> AgentError {
        AgentError::InvalidParam {
            name: self.name.to_string(),
            kind: self.kind.clone(),
            message: message.into(),
        }
    }

    fn get(&self, key: &str) -> Option<&'a serde_yaml::Value> {
        self.mapping?
            .iter()
            .find_map(|(k, value)| (k.as_str() == Some(key)).then_some(value))
    }

    fn u64(&self, key: &str) -> Result<Option<u64>, AgentError> {
        self.get(key)
            .map(|value| {
                value
                    .as_u64()
                    .ok_or_else(|| self.error(format!("{key} must be an unsigned integer")))
            })
            .transpose()
    }

    fn f64(&self, key: &str) -> Result<Option<f64>, AgentError> {
        self.get(key)
            .map(|value| {
                value
                    .as_f64()
                    .ok_or_else(|| self.error(format!("{key} must be a number")))
            })
            .transpose()
    }

    fn directions(&self, key: &str) -> Result<Option<Vec<Direction>>, AgentError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let seq = value
            .as_sequence()
            .ok_or_else(|| self.error(format!("{key} must be a list of directions")))?;

        let mut order = Vec::with_capacity(seq.len());
        for item in seq {
            let text = item
                .as_str()
                .ok_or_else(|| self.error(format!("{key} entries must be strings")))?;
            let direction = Direction::from_str(text).map_err(|err| self.error(err.to_string()))?;
            if !order.contains(&direction) {
                order.push(direction);
            }
        }
        if order.is_empty() {
            return Err(self.error(format!("{key} must name at least one direction")));
        }
        Ok(Some(order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::FromIterator;

    fn agent(kind: AgentKind, params: serde_yaml::Value) -> AgentConfig {
        AgentConfig {
            name: "bot".to_string(),
            kind,
            params,
        }
    }

    fn mapping(key: &str, value: serde_yaml::Value) -> serde_yaml::Value {
        serde_yaml::Value::Mapping(serde_yaml::Mapping::from_iter([(
            serde_yaml::Value::String(key.into()),
            value,
        )]))
    }

    #[test]
    fn greedy_params_default_weight() {
        let config = agent(
            AgentKind::Greedy,
            serde_yaml::Value::Mapping(Default::default()),
        );
        let blueprint = AgentBlueprint::from_config(&config).unwrap();
        assert!(matches!(
            blueprint.implementation,
            AgentImplementation::Greedy { empty_weight } if empty_weight == DEFAULT_EMPTY_WEIGHT
        ));
    }

    #[test]
    fn corner_params_parse_direction_order() {
        let order = serde_yaml::Value::Sequence(vec![
            serde_yaml::Value::String("left".into()),
            serde_yaml::Value::String("DOWN".into()),
            serde_yaml::Value::String("left".into()),
        ]);
        let config = agent(AgentKind::Corner, mapping("order", order));
        let blueprint = AgentBlueprint::from_config(&config).unwrap();
        match blueprint.implementation {
            AgentImplementation::Corner { order } => {
                assert_eq!(order, vec![Direction::Left, Direction::Down]);
            }
            _ => panic!("expected corner agent"),
        }
    }

    #[test]
    fn corner_params_reject_unknown_direction() {
        let order = serde_yaml::Value::Sequence(vec![serde_yaml::Value::String(
            "sideways".into(),
        )]);
        let config = agent(AgentKind::Corner, mapping("order", order));
        let err = AgentBlueprint::from_config(&config)
            .err()
            .expect("unknown direction rejected");
        assert!(err.to_string().contains("sideways"));
    }

    #[test]
    fn greedy_params_reject_negative_weight() {
        let config = agent(
            AgentKind::Greedy,
            mapping("empty_weight", serde_yaml::Value::from(-1.0)),
        );
        assert!(AgentBlueprint::from_config(&config).is_err());
    }

    #[test]
    fn random_agents_differ_per_seat_but_repeat_per_seed() {
        let config = agent(AgentKind::Random, serde_yaml::Value::Null);
        let blueprint = AgentBlueprint::from_config(&config).unwrap();
        let mut session = PuzzleSession::with_seed(17);
        let legal = session.legal_directions();
        let ctx = MoveContext {
            grid: session.grid(),
            legal: &legal,
            score: 0,
            moves: 0,
        };
        let mut a = blueprint.spawn_agent(17, 0);
        let mut b = blueprint.spawn_agent(17, 0);
        for _ in 0..8 {
            assert_eq!(a.choose_move(&ctx), b.choose_move(&ctx));
        }
        let pick = a.choose_move(&ctx).unwrap();
        assert!(session.apply(pick).unwrap().moved);
    }
}
