use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    pub run: RunConfig,
}

/// Parameters for one evolution run, read from `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    /// Directory of `*.txt` recipe files forming the initial population.
    pub recipe_dir: String,
    /// Directory that receives one subdirectory per generation.
    pub output_dir: String,
    /// Number of generation transitions to run.
    pub generations: usize,
    /// RNG seed; omit for a fresh seed per run. Setting it makes the run
    /// reproducible.
    pub seed: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.run.generations == 0 {
            return Err("generations must be at least 1".to_string());
        }
        if self.run.recipe_dir.trim().is_empty() {
            return Err("recipe_dir must not be empty".to_string());
        }
        if self.run.output_dir.trim().is_empty() {
            return Err("output_dir must not be empty".to_string());
        }
        Ok(())
    }
}
