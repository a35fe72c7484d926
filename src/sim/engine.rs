//! Simulation engine and per-tick scheduler
//!
//! The engine owns all run state and drives production from a single
//! control flow. The host calls `tick` once per animation frame with the
//! frame timestamp; the engine decides whether to request needles, applies
//! any completed production, pushes the batch to the renderer immediately,
//! and flushes aggregate state to the UI at a throttled cadence.

use std::collections::VecDeque;

use crate::render::{EngineSnapshot, RenderSink, StateSink};
use crate::{adaptive_flush_interval, speed_to_frame_interval};

use super::producer::{ProduceKind, ProduceRequest, ProduceResponse, Producer};
use super::state::{SimState, SimulationConfig, SimulationStats};

/// Canvas extent in canvas units. Needle centers are generated within it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasBounds {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            width: crate::consts::DEFAULT_CANVAS_WIDTH,
            height: crate::consts::DEFAULT_CANVAS_HEIGHT,
        }
    }
}

/// The simulation state machine.
///
/// Two states: idle and running. Reaching the needle cap while running
/// drops back to idle; a capped engine refuses `start` and manual drops
/// until reset. Manual drops themselves work in either state and never
/// change it.
pub struct Engine {
    producer: Box<dyn Producer>,
    state: SimState,
    config: SimulationConfig,
    bounds: CanvasBounds,
    running: bool,
    /// Bumped on pause/reset/geometry change; in-flight responses carrying
    /// an older epoch are discarded, never applied.
    epoch: u64,
    in_flight: bool,
    /// Manual drops requested while another request was in flight.
    queued_drops: VecDeque<Option<(f64, f64)>>,
    /// Ticks since the last drop, for sub-integer speeds.
    frame_counter: u32,
    last_flush_ms: f64,
}

impl Engine {
    pub fn new(producer: Box<dyn Producer>, config: SimulationConfig, bounds: CanvasBounds) -> Self {
        Self {
            producer,
            state: SimState::new(),
            config,
            bounds,
            running: false,
            epoch: 0,
            in_flight: false,
            queued_drops: VecDeque::new(),
            frame_counter: 0,
            last_flush_ms: 0.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn bounds(&self) -> CanvasBounds {
        self.bounds
    }

    pub fn stats(&self) -> SimulationStats {
        self.state.stats(&self.config)
    }

    pub fn snapshot(&self) -> EngineSnapshot<'_> {
        EngineSnapshot {
            needles: self.state.needles(),
            stats: self.state.stats(&self.config),
            history: self.state.history(),
            is_running: self.running,
            config: self.config,
        }
    }

    /// Begin continuous production. No-op when already running or capped.
    pub fn start(&mut self) {
        if self.running || self.state.total() >= self.config.max_needles {
            return;
        }
        self.frame_counter = 0;
        self.last_flush_ms = 0.0;
        self.running = true;
        log::debug!("engine started (total {})", self.state.total());
    }

    /// Stop continuous production and flush current state unconditionally.
    /// Any in-flight production response is discarded on arrival.
    pub fn pause(&mut self, ui: &mut dyn StateSink) {
        self.running = false;
        self.cancel_in_flight();
        ui.flush(&self.snapshot());
    }

    /// Clear the sequence, statistics, and history. Config is untouched.
    pub fn reset(&mut self, render: &mut dyn RenderSink, ui: &mut dyn StateSink) {
        self.running = false;
        self.cancel_in_flight();
        self.queued_drops.clear();
        self.frame_counter = 0;
        self.state.reset();
        render.full_redraw(self.state.needles(), &self.config);
        ui.flush(&self.snapshot());
        log::debug!("engine reset");
    }

    /// Apply a new configuration. Changing needle length or line spacing
    /// changes what "crossing" means, so every accumulated needle would be
    /// stale: that forces a full reset and stops a running loop. Speed or
    /// cap changes apply in place.
    pub fn configure(
        &mut self,
        new_config: SimulationConfig,
        render: &mut dyn RenderSink,
        ui: &mut dyn StateSink,
    ) {
        if new_config.geometry_differs(&self.config) {
            self.running = false;
            self.cancel_in_flight();
            self.queued_drops.clear();
            self.frame_counter = 0;
            self.state.reset();
            self.config = new_config;
            render.full_redraw(self.state.needles(), &self.config);
            ui.flush(&self.snapshot());
            log::debug!("geometry changed; run cleared");
        } else {
            self.config = new_config;
        }
    }

    /// Resize the generation area. Accumulated needles stay valid; the
    /// renderer rebuilds from the full sequence.
    pub fn set_bounds(&mut self, bounds: CanvasBounds, render: &mut dyn RenderSink) {
        self.bounds = bounds;
        render.full_redraw(self.state.needles(), &self.config);
    }

    /// Drop one needle at a random position. No-op when capped.
    pub fn drop_one(&mut self) {
        if self.state.total() >= self.config.max_needles {
            return;
        }
        self.enqueue_drop(None);
    }

    /// Drop one needle anchored at `(cx, cy)` with a random angle.
    /// No-op when capped.
    pub fn drop_at(&mut self, cx: f64, cy: f64) {
        if self.state.total() >= self.config.max_needles {
            return;
        }
        self.enqueue_drop(Some((cx, cy)));
    }

    fn enqueue_drop(&mut self, at: Option<(f64, f64)>) {
        if self.in_flight {
            self.queued_drops.push_back(at);
        } else {
            self.submit(ProduceKind::Drop { at });
        }
    }

    fn cancel_in_flight(&mut self) {
        if self.in_flight {
            self.epoch += 1;
            self.in_flight = false;
            // A synchronous producer may already hold the response;
            // discard it now so the slot is free for the next request.
            while self.producer.try_recv().is_some() {}
        }
    }

    fn submit(&mut self, kind: ProduceKind) {
        self.in_flight = true;
        self.producer.submit(ProduceRequest {
            kind,
            width: self.bounds.width,
            height: self.bounds.height,
            needle_length: self.config.needle_length,
            line_spacing: self.config.line_spacing,
            epoch: self.epoch,
        });
    }

    /// Advance one animation tick. `now_ms` is the host's frame timestamp,
    /// used only for flush throttling.
    pub fn tick(&mut self, now_ms: f64, render: &mut dyn RenderSink, ui: &mut dyn StateSink) {
        // Apply completed production first. Stale epochs are from requests
        // cancelled by pause/reset/configure: drain and discard them.
        while let Some(response) = self.producer.try_recv() {
            if response.epoch != self.epoch {
                log::trace!("discarding stale production response");
                continue;
            }
            self.in_flight = false;
            self.apply_response(response, now_ms, render, ui);
            break;
        }

        // Manual drops queued behind an in-flight request go out before any
        // further continuous production. The batch they waited on may have
        // filled the run, so the cap is re-checked here.
        if !self.in_flight {
            if self.state.total() >= self.config.max_needles {
                self.queued_drops.clear();
            } else if let Some(at) = self.queued_drops.pop_front() {
                self.submit(ProduceKind::Drop { at });
            }
        }

        if !self.running {
            return;
        }

        // Cap reached: stop and flush the final state unconditionally.
        if self.state.total() >= self.config.max_needles {
            self.running = false;
            self.last_flush_ms = now_ms;
            ui.flush(&self.snapshot());
            log::info!("needle cap reached ({})", self.state.total());
            return;
        }

        // One outstanding request at a time.
        if self.in_flight {
            return;
        }

        // Sub-integer speeds: only every round(1/speed)-th tick produces.
        self.frame_counter += 1;
        if self.frame_counter < speed_to_frame_interval(self.config.speed) {
            return;
        }
        self.frame_counter = 0;

        let count = if self.config.speed >= 1.0 {
            (self.config.speed.floor() as usize).min(self.config.max_needles - self.state.total())
        } else {
            1
        };
        self.submit(ProduceKind::Batch { count });
    }

    fn apply_response(
        &mut self,
        response: ProduceResponse,
        now_ms: f64,
        render: &mut dyn RenderSink,
        ui: &mut dyn StateSink,
    ) {
        for needle in &response.needles {
            self.state.record(*needle);
        }

        let manual = matches!(response.kind, ProduceKind::Drop { .. });
        if manual {
            self.state.force_history(&self.config);
        } else {
            self.state.sample_history(&self.config);
        }

        // Draw immediately, every tick; only the aggregate flush below is
        // throttled.
        render.append_needles(&response.needles);

        self.flush(now_ms, ui, manual);
    }

    fn flush(&mut self, now_ms: f64, ui: &mut dyn StateSink, force: bool) {
        let interval = adaptive_flush_interval(self.config.speed);
        if force || interval == 0.0 || now_ms - self.last_flush_ms >= interval {
            self.last_flush_ms = now_ms;
            ui.flush(&self.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullRender;
    use crate::sim::producer::InlineProducer;
    use crate::sim::PiHistoryPoint;

    /// Records appended batches and redraw calls.
    #[derive(Default)]
    struct RecordingRender {
        appended: Vec<usize>,
        redraws: usize,
    }

    impl RenderSink for RecordingRender {
        fn append_needles(&mut self, batch: &[crate::sim::Needle]) {
            self.appended.push(batch.len());
        }
        fn full_redraw(&mut self, _needles: &[crate::sim::Needle], _config: &SimulationConfig) {
            self.redraws += 1;
        }
    }

    /// Records flush count and the last snapshot's scalar fields.
    #[derive(Default)]
    struct RecordingUi {
        flushes: usize,
        last_stats: SimulationStats,
        last_history: Vec<PiHistoryPoint>,
        last_running: bool,
    }

    impl StateSink for RecordingUi {
        fn flush(&mut self, snapshot: &EngineSnapshot<'_>) {
            self.flushes += 1;
            self.last_stats = snapshot.stats;
            self.last_history = snapshot.history.to_vec();
            self.last_running = snapshot.is_running;
        }
    }

    fn engine_with(config: SimulationConfig) -> Engine {
        Engine::new(
            Box::new(InlineProducer::new(1234)),
            config,
            CanvasBounds::default(),
        )
    }

    fn run_ticks(engine: &mut Engine, ticks: usize, render: &mut dyn RenderSink, ui: &mut dyn StateSink) {
        for i in 0..ticks {
            engine.tick(i as f64 * 16.7, render, ui);
        }
    }

    #[test]
    fn test_start_produces_needles() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        assert!(engine.is_running());
        run_ticks(&mut engine, 20, &mut render, &mut ui);

        // speed 5: after the first submit, a 5-needle batch lands each tick.
        assert!(engine.stats().total >= 45);
        assert!(render.appended.iter().all(|&n| n == 5));
    }

    #[test]
    fn test_start_is_noop_while_running() {
        let mut engine = engine_with(SimulationConfig::default());
        engine.start();
        engine.start();
        assert!(engine.is_running());
    }

    #[test]
    fn test_slow_speed_one_needle_per_ten_ticks() {
        let config = SimulationConfig {
            speed: 0.1,
            ..SimulationConfig::default()
        };
        let mut engine = engine_with(config);
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        run_ticks(&mut engine, 100, &mut render, &mut ui);

        // Exactly one needle every 10 ticks, never more, never fractional.
        // 100 ticks minus one for the trailing submit/apply offset.
        let total = engine.stats().total;
        assert!((9..=10).contains(&total), "total was {total}");
        assert!(render.appended.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_cap_stops_engine_and_refuses_more() {
        let config = SimulationConfig {
            speed: 50.0,
            max_needles: 120,
            ..SimulationConfig::default()
        };
        let mut engine = engine_with(config);
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        run_ticks(&mut engine, 20, &mut render, &mut ui);

        assert_eq!(engine.stats().total, 120);
        assert!(!engine.is_running());
        // Final batch is clipped to the remaining headroom.
        assert_eq!(*render.appended.last().unwrap(), 20);

        // Capped engine refuses everything but reset.
        engine.start();
        assert!(!engine.is_running());
        engine.drop_one();
        engine.drop_at(10.0, 10.0);
        run_ticks(&mut engine, 5, &mut render, &mut ui);
        assert_eq!(engine.stats().total, 120);
    }

    #[test]
    fn test_reset_clears_everything() {
        let config = SimulationConfig {
            speed: 50.0,
            ..SimulationConfig::default()
        };
        let mut engine = engine_with(config);
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        run_ticks(&mut engine, 30, &mut render, &mut ui);
        assert!(engine.stats().total > 0);

        engine.reset(&mut render, &mut ui);
        assert!(!engine.is_running());
        let stats = engine.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.crossings, 0);
        assert_eq!(stats.pi_estimate, None);
        assert!(ui.last_history.is_empty());
        assert_eq!(render.redraws, 1);
        // Config untouched.
        assert_eq!(engine.config().speed, 50.0);
    }

    #[test]
    fn test_geometry_change_forces_reset() {
        let config = SimulationConfig {
            speed: 100.0,
            ..SimulationConfig::default()
        };
        let mut engine = engine_with(config);
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        run_ticks(&mut engine, 12, &mut render, &mut ui);
        assert!(engine.stats().total >= 500);

        let new_config = SimulationConfig {
            needle_length: 60.0,
            ..*engine.config()
        };
        engine.configure(new_config, &mut render, &mut ui);

        assert!(!engine.is_running());
        assert_eq!(engine.stats().total, 0);
        assert!(ui.last_history.is_empty());
        assert_eq!(engine.config().needle_length, 60.0);
        assert_eq!(render.redraws, 1);
    }

    #[test]
    fn test_speed_change_does_not_reset() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        run_ticks(&mut engine, 10, &mut render, &mut ui);
        let total_before = engine.stats().total;
        assert!(total_before > 0);

        let new_config = SimulationConfig {
            speed: 50.0,
            max_needles: 10_000,
            ..*engine.config()
        };
        engine.configure(new_config, &mut render, &mut ui);

        assert_eq!(engine.stats().total, total_before);
        assert!(engine.is_running());
        assert_eq!(render.redraws, 0);
    }

    #[test]
    fn test_pause_flushes_unconditionally() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut ui = RecordingUi::default();

        engine.start();
        engine.pause(&mut ui);
        assert!(!engine.is_running());
        assert_eq!(ui.flushes, 1);
        assert!(!ui.last_running);
    }

    #[test]
    fn test_stale_response_discarded_after_pause() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        // First tick submits a batch request; the inline producer holds the
        // response until the next poll.
        engine.tick(0.0, &mut render, &mut ui);
        engine.pause(&mut ui);

        // The response arrives after cancellation: it must not resurrect
        // needles into the paused state.
        engine.tick(16.7, &mut render, &mut ui);
        assert_eq!(engine.stats().total, 0);
        assert!(render.appended.is_empty());
    }

    #[test]
    fn test_stale_response_discarded_after_reset() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        engine.tick(0.0, &mut render, &mut ui);
        engine.reset(&mut render, &mut ui);

        engine.tick(16.7, &mut render, &mut ui);
        engine.tick(33.4, &mut render, &mut ui);
        assert_eq!(engine.stats().total, 0);
        assert!(render.appended.is_empty());
    }

    #[test]
    fn test_drop_works_after_pause_cancels_batch() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        // Pause while a batch is in flight: the cancelled response must be
        // cleared out of the producer so a fresh drop can go through.
        engine.start();
        engine.tick(0.0, &mut render, &mut ui);
        engine.pause(&mut ui);

        engine.drop_one();
        engine.tick(16.7, &mut render, &mut ui);

        assert!(!engine.is_running());
        assert_eq!(engine.stats().total, 1);
        assert_eq!(render.appended, vec![1]);
    }

    #[test]
    fn test_queued_drop_respects_cap() {
        let config = SimulationConfig {
            speed: 5.0,
            max_needles: 5,
            ..SimulationConfig::default()
        };
        let mut engine = engine_with(config);
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        engine.tick(0.0, &mut render, &mut ui); // 5-needle batch in flight
        engine.drop_one(); // queued behind it

        // The batch fills the run exactly; the queued drop must not land
        // on top of the cap.
        engine.tick(16.7, &mut render, &mut ui);
        engine.tick(33.4, &mut render, &mut ui);

        assert_eq!(engine.stats().total, 5);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_drop_one_works_while_idle() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.drop_one();
        engine.tick(0.0, &mut render, &mut ui);

        assert!(!engine.is_running());
        assert_eq!(engine.stats().total, 1);
        assert_eq!(render.appended, vec![1]);
        // Manual drops flush unconditionally.
        assert_eq!(ui.flushes, 1);
    }

    #[test]
    fn test_drop_at_records_history_immediately() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        // Center on a ruled line: every angle with any projection crosses,
        // and angle 0 lies exactly on the line, so crossing is certain.
        engine.drop_at(40.0, 0.0);
        engine.tick(0.0, &mut render, &mut ui);

        let stats = engine.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.crossings, 1);
        assert_eq!(ui.last_history.len(), 1);
        assert_eq!(ui.last_history[0].total, 1);
    }

    #[test]
    fn test_drop_queued_behind_in_flight_batch() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        engine.tick(0.0, &mut render, &mut ui); // batch in flight
        engine.drop_at(10.0, 10.0); // queued

        engine.tick(16.7, &mut render, &mut ui); // batch applies, drop submits
        engine.tick(33.4, &mut render, &mut ui); // drop applies

        assert_eq!(engine.stats().total, 6);
        assert!(render.appended.contains(&1));
    }

    #[test]
    fn test_monotonic_totals_while_running() {
        let mut engine = engine_with(SimulationConfig::default());
        let mut render = NullRender;
        let mut ui = RecordingUi::default();

        engine.start();
        let mut last_total = 0;
        for i in 0..50 {
            engine.tick(i as f64 * 16.7, &mut render, &mut ui);
            let stats = engine.stats();
            assert!(stats.total >= last_total);
            assert!(stats.crossings <= stats.total);
            last_total = stats.total;
        }
    }

    #[test]
    fn test_high_speed_flush_throttled() {
        let config = SimulationConfig {
            speed: 200.0,
            max_needles: 50_000,
            ..SimulationConfig::default()
        };
        let mut engine = engine_with(config);
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        run_ticks(&mut engine, 60, &mut render, &mut ui);

        // Every applying tick draws, but flushes are spaced >= 250ms apart:
        // 60 ticks * 16.7ms is ~1s, so roughly 4-5 flushes.
        let draws = render.appended.len();
        assert!(draws >= 25);
        assert!(ui.flushes <= 6, "flushes = {}", ui.flushes);
    }

    #[test]
    fn test_slow_speed_flushes_every_drop() {
        let config = SimulationConfig {
            speed: 0.5,
            ..SimulationConfig::default()
        };
        let mut engine = engine_with(config);
        let mut render = RecordingRender::default();
        let mut ui = RecordingUi::default();

        engine.start();
        run_ticks(&mut engine, 40, &mut render, &mut ui);

        // Below speed 1 every applied drop flushes.
        assert_eq!(ui.flushes, render.appended.len());
    }
}
