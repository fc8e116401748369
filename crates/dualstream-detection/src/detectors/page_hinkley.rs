//! Page-Hinkley sequential mean-shift detector.
//!
//! Accumulates the deviation of each observation from the running mean
//! (minus a tolerance `delta`) and raises an alarm once the cumulative sum
//! rises more than `lambda` above its running minimum. Observation order
//! matters; the alarm is sticky only as long as the inequality holds and the
//! state is never reset automatically.

use dualstream_core::config::PageHinkleyConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Detector state after the last observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageHinkleyState {
    /// Running mean of all observations
    pub mean: f64,
    /// Cumulative deviation
    pub cum: f64,
    /// Minimum of the cumulative deviation so far (starts at 0)
    pub min_cum: f64,
    /// Number of observations
    pub t: u64,
    /// Whether the last observation raised the alarm
    pub changed: bool,
}

/// Page-Hinkley detector
#[derive(Debug, Clone)]
pub struct PageHinkley {
    config: PageHinkleyConfig,
    state: PageHinkleyState,
}

impl Default for PageHinkley {
    fn default() -> Self {
        Self::new(PageHinkleyConfig::default())
    }
}

impl PageHinkley {
    pub fn new(config: PageHinkleyConfig) -> Self {
        Self {
            config,
            state: PageHinkleyState::default(),
        }
    }

    /// Feed one observation; returns whether the alarm is raised after it
    pub fn update(&mut self, x: f64) -> bool {
        let PageHinkleyConfig {
            delta,
            lambda,
            alpha,
        } = self.config;
        let s = &mut self.state;

        s.t += 1;
        s.mean += (x - s.mean) / s.t as f64;
        s.cum = alpha * (s.cum + x - s.mean - delta);
        s.min_cum = s.min_cum.min(s.cum);
        s.changed = (s.cum - s.min_cum) > lambda;

        if s.changed {
            debug!(
                t = s.t,
                mean = s.mean,
                cum = s.cum,
                min_cum = s.min_cum,
                lambda,
                "Page-Hinkley alarm raised"
            );
        }

        s.changed
    }

    /// Zero all accumulated state and clear the alarm
    pub fn reset(&mut self) {
        self.state = PageHinkleyState::default();
    }

    /// Whether the most recent observation raised the alarm
    pub fn changed(&self) -> bool {
        self.state.changed
    }

    pub fn state(&self) -> &PageHinkleyState {
        &self.state
    }

    pub fn config(&self) -> &PageHinkleyConfig {
        &self.config
    }
}
