//! Deterministic simulation core
//!
//! All estimation logic lives here. This module must stay pure and
//! deterministic:
//! - Seeded RNG only
//! - Single control flow over all mutable run state
//! - No rendering or platform dependencies (those sit behind the sink
//!   traits in `crate::render`)

pub mod engine;
pub mod geometry;
pub mod needle;
pub mod producer;
pub mod state;

pub use engine::{CanvasBounds, Engine};
pub use geometry::{check_crossing, estimate_pi};
pub use needle::{Needle, NeedleGen};
pub use producer::{InlineProducer, ProduceKind, ProduceRequest, ProduceResponse, Producer};
pub use state::{PiHistoryPoint, SimState, SimulationConfig, SimulationStats};

#[cfg(not(target_arch = "wasm32"))]
pub use producer::ThreadProducer;
