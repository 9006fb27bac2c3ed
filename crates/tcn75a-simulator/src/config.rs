//! Simulator settings, overridable from the environment.

use std::time::Duration;

use log::warn;

pub const AMBIENT_VAR: &str = "TCN75A_SIM_AMBIENT";
pub const SWING_VAR: &str = "TCN75A_SIM_SWING";
pub const TICK_MS_VAR: &str = "TCN75A_SIM_TICK_MS";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Centre of the simulated room temperature, °C.
    pub ambient: f32,
    /// Peak deviation from `ambient`, °C.
    pub swing: f32,
    /// Time between simulated conversions.
    pub tick: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        // Swings across the power-on 75/80 °C limits
        Self {
            ambient: 78.0,
            swing: 4.0,
            tick: Duration::from_millis(500),
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup. Unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ambient) = parse_var::<f32>(&lookup, AMBIENT_VAR) {
            config.ambient = ambient;
        }
        if let Some(swing) = parse_var::<f32>(&lookup, SWING_VAR) {
            config.swing = swing.abs();
        }
        match parse_var::<u64>(&lookup, TICK_MS_VAR) {
            Some(0) => warn!("{} must be positive, keeping default", TICK_MS_VAR),
            Some(ms) => config.tick = Duration::from_millis(ms),
            None => {}
        }
        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        assert_eq!(SimConfig::from_lookup(|_| None), SimConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = SimConfig::from_lookup(lookup(&[
            (AMBIENT_VAR, "22.5"),
            (SWING_VAR, "-1.5"),
            (TICK_MS_VAR, " 100 "),
        ]));
        assert_eq!(config.ambient, 22.5);
        assert_eq!(config.swing, 1.5);
        assert_eq!(config.tick, Duration::from_millis(100));
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = SimConfig::from_lookup(lookup(&[
            (AMBIENT_VAR, "warm"),
            (TICK_MS_VAR, "0"),
        ]));
        assert_eq!(config, SimConfig::default());
    }
}
