//! Simulation configuration, statistics, and owned run state
//!
//! `SimState` is the single owner of the needle sequence, the running
//! counters, and the convergence history. The engine mutates it through one
//! control flow; everything downstream sees read-only borrows.

use serde::{Deserialize, Serialize};

use super::geometry::estimate_pi;
use super::needle::Needle;
use crate::consts::*;

/// User-controlled simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Length of each needle (canvas units)
    pub needle_length: f64,
    /// Distance between parallel ruled lines (canvas units)
    pub line_spacing: f64,
    /// Needles per tick (>= 1) or inverse tick interval (< 1)
    pub speed: f64,
    /// Cap on total needles for one run
    pub max_needles: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            needle_length: DEFAULT_NEEDLE_LENGTH,
            line_spacing: DEFAULT_LINE_SPACING,
            speed: DEFAULT_SPEED,
            max_needles: DEFAULT_MAX_NEEDLES,
        }
    }
}

impl SimulationConfig {
    /// Clamp all parameters to the control-panel ranges and restore the
    /// `needle_length <= line_spacing` invariant. The engine itself assumes
    /// config it receives has passed through here.
    pub fn clamped(mut self) -> Self {
        self.line_spacing = self.line_spacing.clamp(MIN_LINE_SPACING, MAX_LINE_SPACING);
        self.needle_length = self.needle_length.clamp(MIN_NEEDLE_LENGTH, self.line_spacing);
        self.speed = self.speed.clamp(MIN_SPEED, MAX_SPEED);
        self.max_needles = self.max_needles.clamp(MIN_MAX_NEEDLES, MAX_MAX_NEEDLES);
        self
    }

    /// True when the change alters crossing geometry, which invalidates
    /// every previously computed crossing flag.
    pub fn geometry_differs(&self, other: &Self) -> bool {
        self.needle_length != other.needle_length || self.line_spacing != other.line_spacing
    }
}

/// Derived statistics for the current run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStats {
    /// Total needles dropped
    pub total: usize,
    /// Needles crossing a line
    pub crossings: usize,
    /// Current pi estimate - `None` until the first crossing
    pub pi_estimate: Option<f64>,
    /// Absolute error from pi - `None` until the first crossing
    pub error: Option<f64>,
}

/// A sampled `(total, estimate)` pair for convergence charting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiHistoryPoint {
    pub total: usize,
    pub pi_estimate: f64,
}

/// Accumulated run state: the append-only needle sequence, incrementally
/// maintained counters, and the sampled history.
#[derive(Debug, Default)]
pub struct SimState {
    needles: Vec<Needle>,
    total: usize,
    crossings: usize,
    history: Vec<PiHistoryPoint>,
    last_history_total: usize,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needles(&self) -> &[Needle] {
        &self.needles
    }

    pub fn history(&self) -> &[PiHistoryPoint] {
        &self.history
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn crossings(&self) -> usize {
        self.crossings
    }

    /// Append one needle, updating the counters in O(1).
    pub fn record(&mut self, needle: Needle) {
        self.needles.push(needle);
        self.total += 1;
        if needle.crossing {
            self.crossings += 1;
        }
    }

    /// Current derived statistics. Zero crossings means "no estimate yet",
    /// never a division by zero.
    pub fn stats(&self, config: &SimulationConfig) -> SimulationStats {
        let pi_estimate = (self.crossings > 0).then(|| {
            estimate_pi(
                self.total,
                self.crossings,
                config.needle_length,
                config.line_spacing,
            )
        });
        SimulationStats {
            total: self.total,
            crossings: self.crossings,
            pi_estimate,
            error: pi_estimate.map(|est| (est - std::f64::consts::PI).abs()),
        }
    }

    /// Record a history point if the total has advanced enough since the
    /// last one and an estimate exists. Returns whether a point was added.
    pub fn sample_history(&mut self, config: &SimulationConfig) -> bool {
        if self.total - self.last_history_total < HISTORY_SAMPLE_INTERVAL {
            return false;
        }
        self.push_history_point(config)
    }

    /// Record a history point immediately (manual drops skip the sampling
    /// interval). Still requires a defined estimate.
    pub fn force_history(&mut self, config: &SimulationConfig) -> bool {
        self.push_history_point(config)
    }

    fn push_history_point(&mut self, config: &SimulationConfig) -> bool {
        let Some(pi_estimate) = self.stats(config).pi_estimate else {
            return false;
        };
        self.history.push(PiHistoryPoint {
            total: self.total,
            pi_estimate,
        });
        self.last_history_total = self.total;
        true
    }

    /// Clear the sequence, counters, and history to their zero values.
    pub fn reset(&mut self) {
        self.needles.clear();
        self.total = 0;
        self.crossings = 0;
        self.history.clear();
        self.last_history_total = 0;
    }
}
