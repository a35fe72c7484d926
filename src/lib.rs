//! Buffon's Needle - interactive Monte Carlo estimation of pi
//!
//! Core modules:
//! - `sim`: deterministic simulation core (geometry, needle generation,
//!   engine/scheduler, production strategies)
//! - `render`: output boundaries (incremental canvas drawing, throttled
//!   UI-state flushes) and the Canvas2D implementation

pub mod render;
pub mod sim;

pub use sim::{Engine, Needle, SimulationConfig, SimulationStats};

/// Simulation defaults and control-boundary limits
pub mod consts {
    /// Default needle length (canvas units)
    pub const DEFAULT_NEEDLE_LENGTH: f64 = 50.0;
    /// Default distance between ruled lines (canvas units)
    pub const DEFAULT_LINE_SPACING: f64 = 80.0;
    /// Default throughput (needles per tick)
    pub const DEFAULT_SPEED: f64 = 5.0;
    /// Default cap on total needles per run
    pub const DEFAULT_MAX_NEEDLES: usize = 5000;

    /// Default canvas dimensions
    pub const DEFAULT_CANVAS_WIDTH: f64 = 700.0;
    pub const DEFAULT_CANVAS_HEIGHT: f64 = 520.0;

    /// Record a convergence history point every this many needles
    pub const HISTORY_SAMPLE_INTERVAL: usize = 50;

    /// Control-boundary limits (the engine assumes validated config)
    pub const MIN_NEEDLE_LENGTH: f64 = 10.0;
    pub const MIN_LINE_SPACING: f64 = 30.0;
    pub const MAX_LINE_SPACING: f64 = 200.0;
    /// Slowest speed: 1 needle every 50 ticks
    pub const MIN_SPEED: f64 = 0.02;
    /// Fastest speed: 200 needles per tick
    pub const MAX_SPEED: f64 = 200.0;
    pub const MIN_MAX_NEEDLES: usize = 100;
    pub const MAX_MAX_NEEDLES: usize = 50_000;
}

/// Number of ticks between needle drops for a given speed.
///
/// Speeds >= 1 drop every tick (possibly many needles at once); speeds < 1
/// drop a single needle every `round(1/speed)` ticks.
#[inline]
pub fn speed_to_frame_interval(speed: f64) -> u32 {
    if speed >= 1.0 {
        1
    } else {
        (1.0 / speed).round() as u32
    }
}

/// Adaptive UI flush interval in milliseconds for a given speed.
///
/// Low speeds flush every drop so single needles feel responsive; high
/// speeds flush less often to avoid saturating the UI layer with redundant
/// state updates. The canvas itself is always drawn every tick.
pub fn adaptive_flush_interval(speed: f64) -> f64 {
    if speed < 1.0 {
        0.0
    } else if speed <= 5.0 {
        40.0
    } else if speed <= 20.0 {
        80.0
    } else if speed <= 100.0 {
        150.0
    } else {
        250.0
    }
}
