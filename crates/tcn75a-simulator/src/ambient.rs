//! Synthetic room temperature fed to the simulated sensor.

use std::sync::{Mutex, PoisonError};

use log::info;

use crate::config::SimConfig;

/// Slow sinusoid around a base temperature with a faster ripple on top.
#[derive(Debug)]
pub struct AmbientModel {
    base: f64,
    swing: f64,
    elapsed_secs: f64,
}

impl AmbientModel {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            base: f64::from(config.ambient),
            swing: f64::from(config.swing),
            elapsed_secs: 0.0,
        }
    }

    /// Advance the clock by `dt_secs` and return the new temperature.
    pub fn next(&mut self, dt_secs: f64) -> f32 {
        self.elapsed_secs += dt_secs;
        let t = self.elapsed_secs;
        let ripple = 0.1 * self.swing * (t / 7.0).cos();
        (self.base + self.swing * (t / 30.0).sin() + ripple) as f32
    }
}

/// Temperature pinned from the console, taking precedence over the model.
#[derive(Debug, Default)]
pub struct AmbientOverride {
    pinned: Mutex<Option<f32>>,
}

impl AmbientOverride {
    pub fn pin(&self, degrees: f32) {
        *self.pinned.lock().unwrap_or_else(PoisonError::into_inner) = Some(degrees);
        info!("Ambient pinned at {:.2} C", degrees);
    }

    pub fn release(&self) {
        *self.pinned.lock().unwrap_or_else(PoisonError::into_inner) = None;
        info!("Ambient follows the model again");
    }

    pub fn get(&self) -> Option<f32> {
        *self.pinned.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pinned value if any, otherwise the model's next sample.
    pub fn resolve(&self, model: &mut AmbientModel, dt_secs: f64) -> f32 {
        let modelled = model.next(dt_secs);
        self.get().unwrap_or(modelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_stays_within_swing() {
        let config = SimConfig::default();
        let mut model = AmbientModel::new(&config);
        let limit = config.swing * 1.1 + 1e-3;
        for _ in 0..1000 {
            let t = model.next(0.5);
            assert!((t - config.ambient).abs() <= limit, "{t}");
        }
    }

    #[test]
    fn test_flat_model_without_swing() {
        let config = SimConfig {
            swing: 0.0,
            ..SimConfig::default()
        };
        let mut model = AmbientModel::new(&config);
        assert_eq!(model.next(10.0), config.ambient);
    }

    #[test]
    fn test_pin_overrides_model() {
        let ambient = AmbientOverride::default();
        let mut model = AmbientModel::new(&SimConfig::default());

        ambient.pin(90.0);
        assert_eq!(ambient.resolve(&mut model, 1.0), 90.0);

        ambient.release();
        assert_eq!(ambient.get(), None);
        assert_ne!(ambient.resolve(&mut model, 1.0), 90.0);
    }
}
