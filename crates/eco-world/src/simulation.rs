//! Generation scheduler.
//!
//! One generation is two strictly ordered phases, rabbits then foxes. Each
//! phase seeds the destination buffer, resolves every agent of the active
//! species against the frozen source (merging writes under stripe locks), and
//! swaps the buffers. The result depends only on the starting grid and the
//! generation counter, never on thread count or scheduling.

use crate::conflict::merge;
use crate::grid::{Census, Grid, GridStore};
use crate::locks::{StripedCells, StripedLockTable};
use crate::movement::{self, PhaseStats};
use eco_core::{EcosystemConfig, EngineConfig, Error, Position, Result, Scenario, Schedule, Species};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, Level};

/// Where the scheduler is within a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Between generations, ready to start the next one
    Idle,
    SeedRabbitPhase,
    ResolveRabbitMoves,
    SeedFoxPhase,
    ResolveFoxMoves,
    /// The configured generation count has been reached
    Done,
}

/// Tallies for one generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub rabbits: PhaseStats,
    pub foxes: PhaseStats,
}

impl GenerationStats {
    pub fn combine(self, other: Self) -> Self {
        Self {
            rabbits: self.rabbits.combine(other.rabbits),
            foxes: self.foxes.combine(other.foxes),
        }
    }
}

pub struct Simulation {
    config: EcosystemConfig,
    engine: EngineConfig,
    store: GridStore,
    locks: StripedLockTable,
    pool: Option<rayon::ThreadPool>,
    generation: u64,
    phase: Phase,
    totals: GenerationStats,
}

impl Simulation {
    pub fn new(scenario: &Scenario, engine: EngineConfig) -> Result<Self> {
        Self::with_grid(scenario.config, Grid::from_scenario(scenario), engine)
    }

    /// Start from an explicit grid, e.g. one with agents of non-zero age.
    pub fn with_grid(config: EcosystemConfig, grid: Grid, engine: EngineConfig) -> Result<Self> {
        config.validate()?;
        engine.validate()?;
        if grid.rows() != config.rows || grid.cols() != config.cols {
            return Err(Error::Validation(format!(
                "grid is {}x{} but configuration says {}x{}",
                grid.rows(),
                grid.cols(),
                config.rows,
                config.cols
            )));
        }

        let pool = match engine.schedule {
            Schedule::Sequential => None,
            Schedule::Parallel { threads } => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("ecosim-worker-{i}"))
                    .build()
                    .map_err(|e| Error::ThreadPool(e.to_string()))?,
            ),
        };

        debug!(
            rows = config.rows,
            cols = config.cols,
            generations = config.generations,
            schedule = ?engine.schedule,
            lock_stripes = engine.lock_stripes,
            "Simulation created"
        );

        let phase = if config.generations == 0 {
            Phase::Done
        } else {
            Phase::Idle
        };

        Ok(Self {
            config,
            engine,
            store: GridStore::from_grid(grid),
            locks: StripedLockTable::new(engine.lock_stripes),
            pool,
            generation: 0,
            phase,
            totals: GenerationStats::default(),
        })
    }

    pub fn config(&self) -> &EcosystemConfig {
        &self.config
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Generations completed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// The grid as of the last completed generation.
    pub fn grid(&self) -> &Grid {
        self.store.current()
    }

    pub fn into_grid(self) -> Grid {
        self.store.into_current()
    }

    /// Run all remaining generations.
    #[instrument(skip(self), fields(generations = self.config.generations))]
    pub fn run(&mut self) -> SimulationResult {
        info!("Starting simulation for {} generations", self.config.generations);

        while !self.is_done() {
            self.step();
        }

        let result = self.result();
        info!(
            event = "run_summary",
            generations = result.generations,
            rocks = result.census.rocks,
            rabbits = result.census.rabbits,
            foxes = result.census.foxes,
            rabbit_births = result.stats.rabbits.births,
            fox_births = result.stats.foxes.births,
            rabbits_eaten = result.stats.foxes.ate,
            foxes_starved = result.stats.foxes.starved,
            "Simulation complete"
        );
        result
    }

    /// Advance one full generation. Once the configured count is reached this
    /// leaves the grid alone and returns empty stats.
    pub fn step(&mut self) -> GenerationStats {
        if self.is_done() {
            return GenerationStats::default();
        }

        let stats = GenerationStats {
            rabbits: self.run_phase(Species::Rabbit),
            foxes: self.run_phase(Species::Fox),
        };
        self.generation += 1;
        self.totals = self.totals.combine(stats);
        self.phase = if self.generation >= self.config.generations {
            Phase::Done
        } else {
            Phase::Idle
        };

        if tracing::enabled!(Level::DEBUG) {
            let census = self.grid().census();
            debug!(
                event = "generation_census",
                generation = self.generation,
                rocks = census.rocks,
                rabbits = census.rabbits,
                foxes = census.foxes,
                births = stats.rabbits.births + stats.foxes.births,
                starved = stats.foxes.starved,
                "Generation complete"
            );
        }

        stats
    }

    fn run_phase(&mut self, species: Species) -> PhaseStats {
        let (seed_phase, resolve_phase) = match species {
            Species::Rabbit => (Phase::SeedRabbitPhase, Phase::ResolveRabbitMoves),
            Species::Fox => (Phase::SeedFoxPhase, Phase::ResolveFoxMoves),
        };

        self.phase = seed_phase;
        match &self.pool {
            None => self.store.seed(species),
            Some(pool) => {
                let store = &mut self.store;
                pool.install(|| store.par_seed(species));
            }
        }

        self.phase = resolve_phase;
        let generation = self.generation;
        let config = &self.config;
        let (source, dest) = self.store.buffers();
        let dest = StripedCells::new(dest.shared(), &self.locks);
        let resolve = |row| resolve_row(species, source, &dest, row, generation, config);

        let stats = match &self.pool {
            None => (0..source.rows())
                .map(resolve)
                .fold(PhaseStats::default(), PhaseStats::combine),
            Some(pool) => pool.install(|| {
                (0..source.rows())
                    .into_par_iter()
                    .map(resolve)
                    .reduce(PhaseStats::default, PhaseStats::combine)
            }),
        };

        self.store.swap();

        trace!(
            generation,
            %species,
            moved = stats.moved,
            stayed = stats.stayed,
            births = stats.births,
            starved = stats.starved,
            "Phase resolved"
        );

        stats
    }

    fn result(&self) -> SimulationResult {
        SimulationResult {
            generations: self.generation,
            census: self.grid().census(),
            stats: self.totals,
        }
    }
}

/// Resolve every agent of `species` in one source row.
fn resolve_row(
    species: Species,
    source: &Grid,
    dest: &StripedCells<'_>,
    row: usize,
    generation: u64,
    config: &EcosystemConfig,
) -> PhaseStats {
    let cols = source.cols();
    let mut stats = PhaseStats::default();

    for col in 0..cols {
        let pos = Position::new(row, col);
        if !source.get(pos).is(species.kind()) {
            continue;
        }

        let outcome = movement::resolve(species, source, pos, generation, config);
        stats.record(&outcome);
        for (target, candidate) in outcome.writes(pos).into_iter().flatten() {
            dest.update(target.index(cols), |cell| merge(cell, candidate));
        }
    }

    stats
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub generations: u64,
    pub census: Census,
    pub stats: GenerationStats,
}
