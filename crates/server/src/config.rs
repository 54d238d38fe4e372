use std::{collections::HashMap, fs, str::FromStr, time::Duration};

use dispatcher::{SimulatorOptions, DEFAULT_HISTORY_LIMIT, MAX_GRID_SIDE};
use tracing::warn;

pub const SETTINGS_FILE: &str = "server.toml";
pub const DEFAULT_MAX_SIMULATIONS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub pull_delay_ms: u64,
    pub history_limit: usize,
    pub seed_sample_images: bool,
    pub grid_columns: usize,
    pub grid_rows: usize,
    pub max_simulations: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let simulator = SimulatorOptions::default();
        Self {
            server_bind: "127.0.0.1:8080".into(),
            pull_delay_ms: 1000,
            history_limit: DEFAULT_HISTORY_LIMIT,
            seed_sample_images: simulator.seed_sample_images,
            grid_columns: simulator.grid_columns,
            grid_rows: simulator.grid_rows,
            max_simulations: DEFAULT_MAX_SIMULATIONS,
        }
    }
}

impl Settings {
    pub fn simulator_options(&self) -> SimulatorOptions {
        SimulatorOptions {
            seed_sample_images: self.seed_sample_images,
            history_limit: self.history_limit,
            grid_columns: self.grid_columns,
            grid_rows: self.grid_rows,
        }
    }

    pub fn pull_delay(&self) -> Duration {
        Duration::from_millis(self.pull_delay_ms)
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    resolve_settings(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then `server.toml` keys, then environment variables. Unparseable values are
/// logged and skipped.
pub(crate) fn resolve_settings(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => {
                let lookup = |key: &str| file_cfg.get(key).map(toml_scalar);
                apply(&mut settings, &lookup, FILE_KEYS);
            }
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file"),
        }
    }

    apply(&mut settings, &env, ENV_KEYS);
    settings
}

struct Keys {
    bind: &'static [&'static str],
    pull_delay_ms: &'static str,
    history_limit: &'static str,
    seed_sample_images: &'static str,
    grid_columns: &'static str,
    grid_rows: &'static str,
    max_simulations: &'static str,
}

const FILE_KEYS: Keys = Keys {
    bind: &["bind_addr"],
    pull_delay_ms: "pull_delay_ms",
    history_limit: "history_limit",
    seed_sample_images: "seed_sample_images",
    grid_columns: "grid_columns",
    grid_rows: "grid_rows",
    max_simulations: "max_simulations",
};

const ENV_KEYS: Keys = Keys {
    bind: &["SERVER_BIND", "APP__BIND_ADDR"],
    pull_delay_ms: "APP__PULL_DELAY_MS",
    history_limit: "APP__HISTORY_LIMIT",
    seed_sample_images: "APP__SEED_SAMPLE_IMAGES",
    grid_columns: "APP__GRID_COLUMNS",
    grid_rows: "APP__GRID_ROWS",
    max_simulations: "APP__MAX_SIMULATIONS",
};

fn apply(settings: &mut Settings, lookup: &impl Fn(&str) -> Option<String>, keys: Keys) {
    for key in keys.bind.iter().copied() {
        if let Some(v) = lookup(key) {
            settings.server_bind = v;
        }
    }
    if let Some(v) = parsed(lookup, keys.pull_delay_ms) {
        settings.pull_delay_ms = v;
    }
    if let Some(v) = parsed(lookup, keys.history_limit) {
        settings.history_limit = v;
    }
    if let Some(v) = parsed(lookup, keys.seed_sample_images) {
        settings.seed_sample_images = v;
    }
    if let Some(v) = bounded(lookup, keys.grid_columns, MAX_GRID_SIDE) {
        settings.grid_columns = v;
    }
    if let Some(v) = bounded(lookup, keys.grid_rows, MAX_GRID_SIDE) {
        settings.grid_rows = v;
    }
    if let Some(v) = bounded(lookup, keys.max_simulations, usize::MAX) {
        settings.max_simulations = v;
    }
}

/// A count in `1..=max`; anything else is logged and skipped.
fn bounded(lookup: &impl Fn(&str) -> Option<String>, key: &str, max: usize) -> Option<usize> {
    let value = parsed::<usize>(lookup, key)?;
    if (1..=max).contains(&value) {
        return Some(value);
    }
    warn!(key, value, max, "ignoring out-of-range setting");
    None
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid setting");
            None
        }
    }
}

fn toml_scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
