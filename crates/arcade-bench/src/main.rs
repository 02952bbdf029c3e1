use std::path::PathBuf;

use clap::Parser;

use arcade_bench::arena::ArenaRunner;
use arcade_bench::config::{BenchmarkConfig, ResolvedOutputs};
use arcade_bench::logging::init_logging;

/// Self-play benchmarking harness for the puzzle and guessing engines.
#[derive(Debug, Parser)]
#[command(
    name = "arcade-bench",
    author,
    version,
    about = "Deterministic self-play harness for the slide puzzle and guessing engines"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of puzzle games per agent.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed for puzzle games.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the number of guessing rounds (ignored without a guessing block).
    #[arg(long, value_name = "ROUNDS")]
    rounds: Option<usize>,

    /// Override the simulated player's answer noise.
    #[arg(long, value_name = "P")]
    answer_noise: Option<f64>,

    /// Exit after validating the configuration (nothing is played).
    #[arg(long)]
    validate_only: bool,

    /// Write structured telemetry regardless of config.
    #[arg(long)]
    structured_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = cli.games {
        config.puzzle.games = games;
    }

    if let Some(seed) = cli.seed {
        config.puzzle.seed = Some(seed);
    }

    if let Some(guessing) = config.guessing.as_mut() {
        if let Some(rounds) = cli.rounds {
            guessing.rounds = rounds;
        }
        if let Some(noise) = cli.answer_noise {
            guessing.answer_noise = noise;
        }
    }

    if cli.structured_logs {
        config.logging.enable_structured = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let agent_count = config.agents.len();
    let run_id = config.run_id.clone();
    let games = config.puzzle.games;
    let rounds = config.guessing.as_ref().map_or(0, |g| g.rounds);

    println!(
        "Loaded configuration '{run_id}' with {agent_count} agent{} ({games} games, {rounds} guessing rounds)",
        if agent_count == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = ArenaRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: run skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {} games × {agent_count} agents, {} guessing rounds → {} rows at {}",
        summary.games_played,
        summary.guess_rounds,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Score plot: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        if let Some(avg_delta) = outputs.summary.moves.avg_score_delta {
            println!(
                "  Moves: {} events, avg merge score {:.2}",
                outputs.summary.moves.count, avg_delta
            );
        }
        if outputs.summary.guesses.guesses > 0 {
            println!(
                "  Guesses: {} ({} correct) after {} questions",
                outputs.summary.guesses.guesses,
                outputs.summary.guesses.correct,
                outputs.summary.guesses.questions
            );
        }
    }

    Ok(())
}
