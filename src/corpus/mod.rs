//! Loads the input recipe corpus: one `*.txt` file per recipe, one
//! `"<amount> oz <ingredient>"` line per entry. Every parsed line also
//! feeds the run-wide inspiring set that mutation samples from.

use crate::recipe::{Amount, Ingredient, Recipe};
use log::info;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("failed to read recipe files: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed ingredient line in {file} at line {line}: '{content}'")]
    MalformedLine {
        file: String,
        line: usize,
        content: String,
    },
    #[error("no .txt recipe files found in '{0}'")]
    EmptyCorpus(String),
}

/// The parsed input corpus: the initial population plus the inspiring set
/// aggregated from every ingredient line across all files.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub recipes: Vec<Recipe>,
    pub inspiring_set: Vec<(Ingredient, Amount)>,
}

/// Reads every `*.txt` file in `dir` into a [`Corpus`]. Files are visited
/// in sorted path order so a given directory always yields the same
/// population ordering.
pub fn load_directory(dir: &Path) -> Result<Corpus, CorpusError> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(CorpusError::EmptyCorpus(dir.display().to_string()));
    }

    let mut recipes = Vec::with_capacity(paths.len());
    let mut inspiring_set = Vec::new();

    for path in &paths {
        let content = fs::read_to_string(path)?;
        let mut recipe = Recipe::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (ingredient, amount) =
                parse_line(line).ok_or_else(|| CorpusError::MalformedLine {
                    file: path.display().to_string(),
                    line: index + 1,
                    content: line.to_string(),
                })?;
            recipe.add_ingredient(ingredient.clone(), amount);
            inspiring_set.push((ingredient, amount));
        }
        recipes.push(recipe);
    }

    info!(
        "Loaded {} recipe(s) and an inspiring set of {} sample(s) from '{}'.",
        recipes.len(),
        inspiring_set.len(),
        dir.display()
    );
    Ok(Corpus {
        recipes,
        inspiring_set,
    })
}

/// Parses one `"<amount> oz <ingredient>"` line. The amount must be a
/// non-negative number and the ingredient name non-empty.
fn parse_line(line: &str) -> Option<(Ingredient, Amount)> {
    let mut parts = line.trim().splitn(3, ' ');
    let amount: f64 = parts.next()?.parse().ok()?;
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }
    if parts.next()? != "oz" {
        return None;
    }
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }
    Some((Ingredient::new(name), Amount::new(amount)))
}
