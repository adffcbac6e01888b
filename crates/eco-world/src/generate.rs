//! Random scenario synthesis.

use eco_core::{CellKind, GeneratorConfig, Placement, Result, Scenario};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Build a scenario by rolling each cell against the configured densities.
/// The same config always yields the same scenario.
pub fn generate(config: &GeneratorConfig) -> Result<Scenario> {
    config.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let rock = config.rock_density;
    let rabbit = rock + config.rabbit_density;
    let fox = rabbit + config.fox_density;

    let mut placements = Vec::new();
    for row in 0..config.ecosystem.rows {
        for col in 0..config.ecosystem.cols {
            let roll = rng.gen::<f32>();
            let kind = if roll < rock {
                CellKind::Rock
            } else if roll < rabbit {
                CellKind::Rabbit
            } else if roll < fox {
                CellKind::Fox
            } else {
                continue;
            };
            placements.push(Placement::new(kind, row, col));
        }
    }

    debug!(
        seed = config.seed,
        objects = placements.len(),
        "Generated scenario"
    );

    Scenario::new(config.ecosystem, placements)
}
