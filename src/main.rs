use rand::rngs::StdRng;
use rand::SeedableRng;
use recipegen::config::Config;
use recipegen::corpus;
use recipegen::evolution::EvolutionEngine;
use recipegen::export::{self, RunManifest};
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();
    log::info!("Booting recipegen...");

    // 1. Load and validate configuration
    let config = match Config::load(Path::new("config.toml")) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    log::info!("Configuration loaded and validated.");

    // 2. Load the recipe corpus
    let corpus = match corpus::load_directory(Path::new(&config.run.recipe_dir)) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load recipe corpus: {}", e);
            process::exit(1);
        }
    };

    let seed = config.run.seed.unwrap_or_else(rand::random);
    log::info!("Using RNG seed {}.", seed);

    let output_dir = Path::new(&config.run.output_dir);
    if let Err(e) = export::prepare_output_dir(output_dir) {
        log::error!("Failed to prepare output directory: {}", e);
        process::exit(1);
    }

    // 3. Run the evolution, writing each generation as it completes.
    // File naming has its own derived stream so its draws never perturb
    // the engine's.
    let mut engine = EvolutionEngine::new(corpus.recipes, &corpus.inspiring_set, seed);
    let mut naming_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut history = Vec::with_capacity(config.run.generations);
    for _ in 0..config.run.generations {
        let report = match engine.step() {
            Ok(r) => r,
            Err(e) => {
                log::error!(
                    "Evolution failed at generation {}: {}",
                    engine.generation() + 1,
                    e
                );
                process::exit(1);
            }
        };
        if let Err(e) = export::write_generation(
            output_dir,
            report.generation,
            engine.population(),
            &mut naming_rng,
        ) {
            log::error!("Failed to write generation {}: {}", report.generation, e);
            process::exit(1);
        }
        history.push(report);
    }

    // 4. Persist the run manifest for reproducibility.
    let manifest = RunManifest::new(&config, seed, history, engine.population());
    if let Err(e) = export::write_manifest(&manifest, &output_dir.join("manifest.json")) {
        log::error!("Failed to write run manifest: {}", e);
        process::exit(1);
    }

    log::info!(
        "Run complete; wrote {} generation(s) to '{}'.",
        config.run.generations,
        output_dir.display()
    );
}
