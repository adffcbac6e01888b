//! Command-line driver for the ecosystem simulation.

mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use eco_core::{EcosystemConfig, EngineConfig, GeneratorConfig, Scenario, Schedule};
use eco_world::{generate, report, Report, Simulation};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Deterministic parallel rabbit/fox ecosystem simulator
#[derive(Parser, Debug)]
#[command(name = "ecosim", version)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and print the final state
    Run(RunArgs),
    /// Print a random scenario in the input format
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Worker threads
    #[arg(default_value_t = 1)]
    threads: usize,

    /// Scenario file (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Number of stripe locks guarding the destination grid
    #[arg(long, default_value_t = EngineConfig::default().lock_stripes)]
    lock_stripes: usize,

    /// Resolve cells in a plain loop on the main thread
    #[arg(long, conflicts_with = "threads")]
    sequential: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(long, default_value_t = 64)]
    rows: usize,

    #[arg(long, default_value_t = 64)]
    cols: usize,

    #[arg(long, default_value_t = 100)]
    generations: u64,

    #[arg(long, default_value_t = EcosystemConfig::default().rabbit_procreation)]
    rabbit_procreation: u32,

    #[arg(long, default_value_t = EcosystemConfig::default().fox_procreation)]
    fox_procreation: u32,

    #[arg(long, default_value_t = EcosystemConfig::default().fox_starvation)]
    fox_starvation: u32,

    #[arg(long, default_value_t = 0.05)]
    rock_density: f32,

    #[arg(long, default_value_t = 0.25)]
    rabbit_density: f32,

    #[arg(long, default_value_t = 0.1)]
    fox_density: f32,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl From<&GenerateArgs> for GeneratorConfig {
    fn from(args: &GenerateArgs) -> Self {
        GeneratorConfig {
            ecosystem: EcosystemConfig {
                rabbit_procreation: args.rabbit_procreation,
                fox_procreation: args.fox_procreation,
                fox_starvation: args.fox_starvation,
                generations: args.generations,
                rows: args.rows,
                cols: args.cols,
            },
            rock_density: args.rock_density,
            rabbit_density: args.rabbit_density,
            fox_density: args.fox_density,
            seed: args.seed,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_logging(cli.log_json)?;

    match cli.command {
        Command::Run(args) => run(args),
        Command::Generate(args) => {
            let scenario = generate(&GeneratorConfig::from(&args))?;
            io::stdout()
                .lock()
                .write_all(scenario.to_input_string().as_bytes())?;
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let scenario = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Scenario::read(file)
        }
        None => Scenario::read(io::stdin().lock()),
    }
    .context("invalid scenario")?;

    let engine = EngineConfig {
        schedule: if args.sequential {
            Schedule::Sequential
        } else {
            Schedule::Parallel {
                threads: args.threads,
            }
        },
        lock_stripes: args.lock_stripes,
    };

    info!(
        rows = scenario.config.rows,
        cols = scenario.config.cols,
        objects = scenario.placements.len(),
        schedule = ?engine.schedule,
        "Loaded scenario"
    );

    let mut sim = Simulation::new(&scenario, engine)?;

    let start = Instant::now();
    sim.run();
    let elapsed = start.elapsed();
    info!(elapsed_secs = elapsed.as_secs_f64(), "Execution time");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match args.format {
        Format::Text => {
            let left = sim.config().generations.saturating_sub(sim.generation());
            report::write_text(&mut out, sim.config(), left, sim.grid())?;
        }
        Format::Json => {
            writeln!(out, "{}", Report::new(&sim).to_json()?)?;
        }
    }
    out.flush()?;

    Ok(())
}
