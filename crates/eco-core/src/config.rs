//! Configuration types for the simulation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on the bytes one grid position costs across both buffers.
const BYTES_PER_CELL: usize = 32;

/// Ecosystem rules and grid dimensions, as read from the scenario header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcosystemConfig {
    /// A rabbit that moves with `proc_age + 1` above this leaves a baby behind
    pub rabbit_procreation: u32,
    /// A fox that moves with `proc_age + 1` above this leaves a baby behind
    pub fox_procreation: u32,
    /// A fox with no prey in reach dies once `food_age + 1` reaches this
    pub fox_starvation: u32,
    /// Number of full generations to run
    pub generations: u64,
    /// Grid height
    pub rows: usize,
    /// Grid width
    pub cols: usize,
}

impl Default for EcosystemConfig {
    fn default() -> Self {
        Self {
            rabbit_procreation: 2,
            fox_procreation: 4,
            fox_starvation: 3,
            generations: 6,
            rows: 5,
            cols: 5,
        }
    }
}

impl EcosystemConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::Validation(format!(
                "grid must be at least 1x1, got {}x{}",
                self.rows, self.cols
            )));
        }
        let bytes = self
            .rows
            .checked_mul(self.cols)
            .and_then(|cells| cells.checked_mul(BYTES_PER_CELL));
        match bytes {
            Some(bytes) if bytes <= isize::MAX as usize => Ok(()),
            _ => Err(Error::Validation(format!(
                "grid {}x{} is too large",
                self.rows, self.cols
            ))),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// How a phase's per-cell work is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    /// Plain row-major loop on the calling thread
    Sequential,
    /// Rows distributed over a worker pool
    Parallel { threads: usize },
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Parallel { threads: 1 }
    }
}

/// Engine settings that never change the simulation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub schedule: Schedule,
    /// Number of stripe locks guarding destination cells, rounded up to a power of two
    pub lock_stripes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schedule: Schedule::default(),
            lock_stripes: 65_536,
        }
    }
}

impl EngineConfig {
    pub fn parallel(threads: usize) -> Self {
        Self {
            schedule: Schedule::Parallel { threads },
            ..Default::default()
        }
    }

    pub fn sequential() -> Self {
        Self {
            schedule: Schedule::Sequential,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Schedule::Parallel { threads: 0 } = self.schedule {
            return Err(Error::Validation(
                "thread count must be positive".to_string(),
            ));
        }
        if self.lock_stripes == 0 {
            return Err(Error::Validation(
                "lock table needs at least one stripe".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for synthesising a random scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Rules and dimensions written into the scenario header
    pub ecosystem: EcosystemConfig,
    /// Probability that a cell starts as rock (0.0 to 1.0)
    pub rock_density: f32,
    /// Probability that a cell starts as a rabbit (0.0 to 1.0)
    pub rabbit_density: f32,
    /// Probability that a cell starts as a fox (0.0 to 1.0)
    pub fox_density: f32,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ecosystem: EcosystemConfig {
                generations: 100,
                rows: 64,
                cols: 64,
                ..Default::default()
            },
            rock_density: 0.05,
            rabbit_density: 0.25,
            fox_density: 0.1,
            seed: 0,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        self.ecosystem.validate()?;
        let densities = [self.rock_density, self.rabbit_density, self.fox_density];
        if densities.iter().any(|d| !(0.0..=1.0).contains(d)) {
            return Err(Error::Validation(
                "densities must lie in 0.0..=1.0".to_string(),
            ));
        }
        if densities.iter().sum::<f32>() > 1.0 {
            return Err(Error::Validation(
                "densities must not sum above 1.0".to_string(),
            ));
        }
        Ok(())
    }
}
