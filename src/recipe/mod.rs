use rand::Rng;
use std::fmt;
use thiserror::Error;

/// Every recipe is rescaled so its amounts sum to this after mutation.
pub const NORMALIZATION_TARGET: f64 = 100.0;

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("cannot split a recipe with {0} ingredient(s); at least 2 are required")]
    TooSmallToSplit(usize),
    #[error("ingredient '{0}' not found in the recipe")]
    MissingIngredient(String),
}

/// A named food component. Equality and hashing go by name, so two
/// `Ingredient` values with the same name are the same ingredient for
/// recipe-membership purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ingredient {
    name: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A non-negative quantity in ounces.
///
/// Arithmetic is exposed as named methods returning new values; `Amount`
/// itself is never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(f64);

impl Amount {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }

    pub fn subtract(self, other: Amount) -> Amount {
        Amount(self.0 - other.0)
    }

    pub fn multiply(self, other: Amount) -> Amount {
        Amount(self.0 * other.0)
    }

    /// Division by a zero amount is the caller's responsibility to avoid;
    /// the only internal divisor is a recipe's total, which is checked
    /// before `normalization` divides by it.
    pub fn divide(self, other: Amount) -> Amount {
        Amount(self.0 / other.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} oz", self.0)
    }
}

/// An ordered mapping from [`Ingredient`] to [`Amount`].
///
/// No two entries ever share an ingredient name; inserting a duplicate name
/// replaces the prior entry. Insertion order is meaningful only to
/// [`Recipe::split_recipe`], which splits positionally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipe {
    entries: Vec<(Ingredient, Amount)>,
}

impl Recipe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a recipe from a list of pairs, applying the usual
    /// replace-on-duplicate-name semantics in order.
    pub fn from_entries(entries: impl IntoIterator<Item = (Ingredient, Amount)>) -> Self {
        let mut recipe = Self::new();
        for (ingredient, amount) in entries {
            recipe.add_ingredient(ingredient, amount);
        }
        recipe
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries in insertion order.
    pub fn entries(&self) -> &[(Ingredient, Amount)] {
        &self.entries
    }

    pub fn get_ingredient_amount(&self, ingredient: &Ingredient) -> Option<Amount> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == ingredient)
            .map(|(_, amount)| *amount)
    }

    /// Inserts or replaces the entry for `ingredient`. A replaced entry
    /// moves to the end of the insertion order.
    pub fn add_ingredient(&mut self, ingredient: Ingredient, amount: Amount) {
        self.remove_ingredient(&ingredient);
        self.entries.push((ingredient, amount));
    }

    /// Removes the entry matching `ingredient` by name; no-op when absent.
    pub fn remove_ingredient(&mut self, ingredient: &Ingredient) {
        if let Some(position) = self.entries.iter().position(|(existing, _)| existing == ingredient) {
            self.entries.remove(position);
        }
    }

    /// Re-keys `old`'s amount under `new`. Fails when `old` is not present.
    pub fn change_ingredient_name(
        &mut self,
        old: &Ingredient,
        new: Ingredient,
    ) -> Result<(), RecipeError> {
        let amount = self
            .get_ingredient_amount(old)
            .ok_or_else(|| RecipeError::MissingIngredient(old.name().to_string()))?;
        self.remove_ingredient(old);
        self.add_ingredient(new, amount);
        Ok(())
    }

    /// Splits the recipe at a pivot drawn uniformly from `1..=len-1` into
    /// two contiguous sub-recipes by insertion order. This is the crossover
    /// support primitive: a positional split, not a random subset.
    pub fn split_recipe<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Recipe, Recipe), RecipeError> {
        if self.len() < 2 {
            return Err(RecipeError::TooSmallToSplit(self.len()));
        }
        let pivot = rng.random_range(1..self.len());
        let front = Recipe {
            entries: self.entries[..pivot].to_vec(),
        };
        let back = Recipe {
            entries: self.entries[pivot..].to_vec(),
        };
        Ok((front, back))
    }

    /// Merges `other` into `self`: same-named ingredients have their amounts
    /// summed, new ingredients are appended. `other` is left unmodified.
    pub fn combine_with_other(&mut self, other: &Recipe) {
        for (ingredient, amount) in other.entries() {
            let merged = match self.get_ingredient_amount(ingredient) {
                Some(existing) => existing.add(*amount),
                None => *amount,
            };
            self.add_ingredient(ingredient.clone(), merged);
        }
    }

    /// Diversity-as-fitness: the count of distinct ingredients.
    pub fn fitness_level(&self) -> usize {
        self.entries.len()
    }

    /// Rescales every amount so the total is [`NORMALIZATION_TARGET`].
    /// No-op on an empty recipe. A non-empty recipe whose amounts sum to
    /// zero cannot be rescaled and is left alone with a warning.
    pub fn normalization(&mut self) {
        if self.is_empty() {
            return;
        }
        let total = self
            .entries
            .iter()
            .fold(Amount::new(0.0), |sum, (_, amount)| sum.add(*amount));
        if total.value() == 0.0 {
            log::warn!("skipping normalization of a recipe whose amounts sum to zero");
            return;
        }
        if total.value() != NORMALIZATION_TARGET {
            let coefficient = Amount::new(NORMALIZATION_TARGET).divide(total);
            for (_, amount) in self.entries.iter_mut() {
                *amount = amount.multiply(coefficient);
            }
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Blank recipe");
        }
        for (ingredient, amount) in &self.entries {
            writeln!(f, "{} {}", amount, ingredient)?;
        }
        Ok(())
    }
}
