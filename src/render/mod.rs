//! Output boundaries of the simulation engine
//!
//! Two independent channels with distinct cadences:
//! - `RenderSink`: incremental needle drawing, pushed every tick so the
//!   canvas stays visually current regardless of UI re-render rate
//! - `StateSink`: aggregate state flushes, throttled adaptively by speed
//!
//! Sinks only ever receive borrows; they hold no authority over engine
//! state.

#[cfg(target_arch = "wasm32")]
pub mod canvas;

use serde::{Deserialize, Serialize};

use crate::sim::{Needle, PiHistoryPoint, SimulationConfig, SimulationStats};

/// Renderer boundary. Incremental appends must not require clearing or
/// redrawing prior content; full redraws rebuild from the complete
/// sequence (reset, geometry change, theme change, resize).
pub trait RenderSink {
    fn append_needles(&mut self, batch: &[Needle]);
    fn full_redraw(&mut self, needles: &[Needle], config: &SimulationConfig);
}

/// UI boundary: receives the complete aggregate state at the throttled
/// flush cadence.
pub trait StateSink {
    fn flush(&mut self, snapshot: &EngineSnapshot<'_>);
}

/// Read-only view of the engine's current state.
#[derive(Debug, Clone, Copy)]
pub struct EngineSnapshot<'a> {
    pub needles: &'a [Needle],
    pub stats: SimulationStats,
    pub history: &'a [PiHistoryPoint],
    pub is_running: bool,
    pub config: SimulationConfig,
}

/// Canvas color palette selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Discards everything. Used for headless runs where only the final
/// statistics matter.
#[derive(Debug, Default)]
pub struct NullRender;

impl RenderSink for NullRender {
    fn append_needles(&mut self, _batch: &[Needle]) {}
    fn full_redraw(&mut self, _needles: &[Needle], _config: &SimulationConfig) {}
}

impl StateSink for NullRender {
    fn flush(&mut self, _snapshot: &EngineSnapshot<'_>) {}
}
