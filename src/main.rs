//! Marble Race headless runner
//!
//! Runs one race in the built-in physics world and prints the final
//! ranking as JSON for a presentation layer.
//!
//! Usage: `marble-race [settings.json] [--seed N] [--field compact|full]`

use marble_race::sim::{Race, RapierWorld};
use marble_race::{FieldPreset, RaceSettings};

struct Args {
    settings_path: Option<String>,
    seed: Option<u64>,
    field: Option<FieldPreset>,
}

fn parse_args() -> Args {
    let mut args = Args {
        settings_path: None,
        seed: None,
        field: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => match iter.next().map(|s| s.parse::<u64>()) {
                Some(Ok(seed)) => args.seed = Some(seed),
                _ => log::warn!("--seed expects an unsigned integer, ignoring"),
            },
            "--field" => match iter.next().as_deref().and_then(FieldPreset::from_str) {
                Some(field) => args.field = Some(field),
                None => log::warn!("--field expects compact or full, ignoring"),
            },
            _ => args.settings_path = Some(arg),
        }
    }
    args
}

fn load_settings(path: Option<&str>) -> RaceSettings {
    let Some(path) = path else {
        log::info!("Using default settings");
        return RaceSettings::default();
    };
    match RaceSettings::load(path) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("{err}; using default settings");
            RaceSettings::default()
        }
    }
}

fn seed_from_clock() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();

    let args = parse_args();
    let mut settings = load_settings(args.settings_path.as_deref());
    if let Some(field) = args.field {
        settings.apply_preset(field);
        log::info!("Field preset: {}", field.as_str());
    }
    let seed = args.seed.unwrap_or_else(seed_from_clock);
    let max_steps = settings.max_steps;

    log::info!(
        "Marble Race starting: seed={seed}, balls={}, canvas={}x{}",
        settings.ball_count,
        settings.width,
        settings.height
    );

    let mut race = match Race::with_seed(RapierWorld::new(), settings, seed) {
        Ok(race) => race,
        Err(err) => {
            log::error!("Invalid settings: {err}");
            std::process::exit(2);
        }
    };

    race.start();
    let mut steps = 0;
    while !race.is_complete() && steps < max_steps {
        race.step();
        steps += 1;
    }

    if !race.is_complete() {
        log::warn!(
            "Stopped after {steps} steps with {} of {} balls finished",
            race.ranking().len(),
            race.balls().len()
        );
    }

    match serde_json::to_string_pretty(&race.ranking_entries()) {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("Failed to serialize ranking: {err}"),
    }
}
