//! Writes evolved generations back to disk: one text file per recipe under
//! a per-generation directory, plus a JSON run manifest with enough metadata
//! (config snapshot, seed, fitness history) to reproduce the run.

use crate::config::Config;
use crate::evolution::GenerationReport;
use crate::recipe::Recipe;
use rand::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DISH_NAMES: [&str; 4] = ["soup", "broth", "stew", "ramen"];
const CHEF_NAMES: [&str; 5] = [
    "Gordon Ramsay's",
    "Salt Bae's",
    "Bowdoin's",
    "Thorne's",
    "Moulton's",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write generation output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize run manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Clears any previous run's output and recreates the directory.
pub fn prepare_output_dir(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Writes every recipe of `population` under `<output_dir>/<generation>/`,
/// one text file each, and returns the written paths.
///
/// Filenames lead with the generation's "star" rating and the recipe's two
/// largest-amount ingredients, with a dish name drawn at random; a filename
/// collision gets a random chef-name prefix, and anything still colliding
/// falls back to an index suffix.
pub fn write_generation<R: Rng + ?Sized>(
    output_dir: &Path,
    generation: usize,
    population: &[Recipe],
    rng: &mut R,
) -> Result<Vec<PathBuf>, ExportError> {
    let generation_dir = output_dir.join(generation.to_string());
    fs::create_dir_all(&generation_dir)?;

    let mut used = HashSet::new();
    let mut written = Vec::with_capacity(population.len());
    for (index, recipe) in population.iter().enumerate() {
        let mut name = dish_filename(recipe, generation, index, rng);
        if !used.insert(name.clone()) {
            name = format!("{} {}", CHEF_NAMES.choose(rng).unwrap_or(&CHEF_NAMES[0]), name);
            if !used.insert(name.clone()) {
                name = format!("{} {}", name, index);
                used.insert(name.clone());
            }
        }

        let path = generation_dir.join(format!("{}.txt", name));
        fs::write(&path, recipe.to_string())?;
        written.push(path);
    }
    Ok(written)
}

fn dish_filename<R: Rng + ?Sized>(
    recipe: &Recipe,
    generation: usize,
    index: usize,
    rng: &mut R,
) -> String {
    let mut ranked: Vec<_> = recipe.entries().to_vec();
    ranked.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    match ranked.as_slice() {
        [(top, _), (second, _), ..] => {
            let dish = DISH_NAMES.choose(rng).unwrap_or(&DISH_NAMES[0]);
            sanitize(&format!(
                "{} star {} and {} {}",
                generation, top, second, dish
            ))
        }
        // Too few ingredients for a dish name.
        _ => format!("{} star recipe {}", generation, index),
    }
}

fn sanitize(name: &str) -> String {
    name.replace(['/', '\\'], "-")
}

/// Summary of a completed run, written once at the end.
#[derive(Serialize)]
pub struct RunManifest {
    /// Schema version for forward compatibility.
    pub schema_version: String,
    /// Unix timestamp when the manifest was generated.
    pub generated_at: i64,
    /// The seed the run actually used, whether configured or freshly drawn.
    pub seed: u64,
    /// Snapshot of the run configuration.
    pub config: Config,
    /// Per-generation fitness reports.
    pub history: Vec<GenerationReport>,
    /// Fitness of every recipe in the final population.
    pub final_fitness: Vec<usize>,
}

impl RunManifest {
    pub fn new(
        config: &Config,
        seed: u64,
        history: Vec<GenerationReport>,
        final_population: &[Recipe],
    ) -> Self {
        Self {
            schema_version: "1.0.0".to_string(),
            generated_at: chrono::Utc::now().timestamp(),
            seed,
            config: config.clone(),
            history,
            final_fitness: final_population.iter().map(Recipe::fitness_level).collect(),
        }
    }
}

/// Writes the manifest as pretty-printed JSON.
pub fn write_manifest(manifest: &RunManifest, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json)?;
    Ok(())
}
