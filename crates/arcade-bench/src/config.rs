use arcade_core::inference::InferenceConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_MAX_MOVES: u32 = 5_000;
const DEFAULT_LATENCY_BUDGET_MS: u64 = 5;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub puzzle: PuzzleConfig,
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub guessing: Option<GuessingConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.puzzle.validate()?;
        if let Some(guessing) = self.guessing.as_ref() {
            guessing.validate()?;
        }
        self.outputs.validate(&self.run_id)?;
        self.metrics.validate(&self.agents)?;
        self.logging.normalize();
        validate_agents(&mut self.agents)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// Puzzle self-play block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PuzzleConfig {
    pub seed: Option<u64>,
    pub games: usize,
    #[serde(default = "default_max_moves")]
    pub max_moves: u32,
}

impl PuzzleConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.games == 0 {
            return Err(ValidationError::InvalidField {
                field: "puzzle.games".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }

        if self.max_moves == 0 {
            return Err(ValidationError::InvalidField {
                field: "puzzle.max_moves".to_string(),
                message: "max_moves must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn default_max_moves() -> u32 {
    DEFAULT_MAX_MOVES
}

/// Guessing self-play block. Unset knobs fall back to the engine defaults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GuessingConfig {
    pub seed: Option<u64>,
    pub rounds: usize,
    #[serde(default)]
    pub dataset: Option<DatasetConfig>,
    #[serde(default)]
    pub likelihood_floor: Option<f64>,
    #[serde(default)]
    pub certainty_threshold: Option<f64>,
    #[serde(default)]
    pub question_cap: Option<usize>,
    #[serde(default)]
    pub search_window: Option<usize>,
    /// Probability that the simulated player flips its answer.
    #[serde(default)]
    pub answer_noise: f64,
    /// Feed every finished round back into the answer statistics.
    #[serde(default)]
    pub learn: bool,
}

impl GuessingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.rounds == 0 {
            return Err(ValidationError::InvalidField {
                field: "guessing.rounds".to_string(),
                message: "number of rounds must be greater than zero".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.answer_noise) {
            return Err(ValidationError::InvalidField {
                field: "guessing.answer_noise".to_string(),
                message: "answer_noise must lie in [0, 1]".to_string(),
            });
        }

        for (label, value) in [
            ("guessing.likelihood_floor", self.likelihood_floor),
            ("guessing.certainty_threshold", self.certainty_threshold),
        ] {
            if let Some(value) = value
                && !(value > 0.0 && value < 1.0)
            {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "value must lie strictly between 0 and 1".to_string(),
                });
            }
        }

        for (label, value) in [
            ("guessing.question_cap", self.question_cap),
            ("guessing.search_window", self.search_window),
        ] {
            if value == Some(0) {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "value must be at least 1".to_string(),
                });
            }
        }

        if let Some(dataset) = self.dataset.as_ref()
            && (dataset.persons.trim().is_empty() || dataset.questions.trim().is_empty())
        {
            return Err(ValidationError::InvalidField {
                field: "guessing.dataset".to_string(),
                message: "persons and questions paths must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Engine knobs with this block's overrides applied.
    pub fn inference_config(&self) -> InferenceConfig {
        let base = InferenceConfig::default();
        InferenceConfig {
            likelihood_floor: self.likelihood_floor.unwrap_or(base.likelihood_floor),
            certainty_threshold: self.certainty_threshold.unwrap_or(base.certainty_threshold),
            question_cap: self.question_cap.unwrap_or(base.question_cap),
            search_window: self.search_window.unwrap_or(base.search_window),
        }
    }
}

/// Text files in the persons/questions catalog format.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatasetConfig {
    pub persons: String,
    pub questions: String,
}

/// Definition of a puzzle-playing agent.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Random,
    Greedy,
    Corner,
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Metrics configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default)]
    pub baseline: Option<String>,
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            baseline: None,
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
        }
    }
}

impl MetricsConfig {
    fn validate(&self, agents: &[AgentConfig]) -> Result<(), ValidationError> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: "baseline agent must be specified".to_string(),
            });
        };

        if !agents.iter().any(|a| &a.name == baseline) {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: format!("baseline agent '{baseline}' is not defined in agents list"),
            });
        }

        if self.latency_budget_ms == 0 {
            return Err(ValidationError::InvalidField {
                field: "metrics.latency_budget_ms".to_string(),
                message: "latency budget must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn default_latency_budget_ms() -> u64 {
    DEFAULT_LATENCY_BUDGET_MS
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_agents(agents: &mut [AgentConfig]) -> Result<(), ValidationError> {
    if agents.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "agents".to_string(),
            message: "at least one agent must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for agent in agents.iter_mut() {
        if agent.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "agents.name".to_string(),
                message: "agent name must not be empty".to_string(),
            });
        }

        if !agent.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].name", agent.name),
                message: "agent name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(agent.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "agents".to_string(),
                message: format!("agent name '{}' defined more than once", agent.name),
            });
        }

        if agent.params.is_null() {
            agent.params = serde_yaml::Value::Mapping(Default::default());
        }
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
