use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Training and board settings. Missing fields in a config file take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid_width: usize,
    pub grid_height: usize,
    pub snake_length: usize,
    /// Steps a trained snake may take without eating.
    pub energy_max: u32,
    pub population: usize,
    pub generations: usize,
    /// Parents drawn by roulette each generation.
    pub parents: usize,
    /// Fraction of the population carried over unchanged.
    pub elitism: f32,
    /// Write best parameters and fitness history every this many generations; 0 disables.
    pub checkpoint_every: usize,
    pub mutation_rate: f32,
    pub mutation_range: f32,
    /// Worker threads for evaluation; 0 lets rayon decide.
    pub threads: usize,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_width: 30,
            grid_height: 30,
            snake_length: 4,
            energy_max: 300,
            population: 50,
            generations: 100,
            parents: 10,
            elitism: 0.5,
            checkpoint_every: 50,
            mutation_rate: 0.1,
            mutation_range: 1.0,
            threads: 0,
            seed: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |msg: String| Err(ConfigError::Invalid(msg));
        if self.grid_width < 5 || self.grid_height < 5 {
            return bad(format!(
                "grid must be at least 5x5, got {}x{}",
                self.grid_width, self.grid_height
            ));
        }
        if self.snake_length == 0 {
            return bad("snake_length must be at least 1".into());
        }
        if self.energy_max == 0 {
            return bad("energy_max must be positive".into());
        }
        if self.population == 0 {
            return bad("population must be positive".into());
        }
        if self.parents == 0 || self.parents > self.population {
            return bad(format!(
                "parents must be in 1..={}, got {}",
                self.population, self.parents
            ));
        }
        if !(0.0..=1.0).contains(&self.elitism) {
            return bad(format!("elitism must be within [0, 1], got {}", self.elitism));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return bad(format!(
                "mutation_rate must be within [0, 1], got {}",
                self.mutation_rate
            ));
        }
        if !(self.mutation_range.is_finite() && self.mutation_range >= 0.0) {
            return bad(format!(
                "mutation_range must be finite and non-negative, got {}",
                self.mutation_range
            ));
        }
        Ok(())
    }

    /// Number of individuals copied verbatim into the next generation.
    pub fn elite_count(&self) -> usize {
        ((self.population as f32 * self.elitism).floor() as usize).min(self.population)
    }
}
