//! recipegen evolves a population of recipes with a genetic algorithm:
//! fitness-proportionate parent selection, single-point crossover, four
//! randomized mutation operators, and truncation survivor selection.
//!
//! The engine itself lives in [`evolution`]; [`recipe`] holds the value
//! types it operates on. [`corpus`] and [`export`] are the thin I/O layers
//! that feed recipe files in and write each generation back out.

pub mod config;
pub mod corpus;
pub mod evolution;
pub mod export;
pub mod recipe;
