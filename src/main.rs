//! Buffon's Needle entry point
//!
//! Wasm builds wire the engine to a Canvas2D renderer and DOM controls;
//! native builds run a headless demo to the needle cap and print the
//! resulting estimate.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, HtmlInputElement, MouseEvent};

    use buffon::render::canvas::CanvasRenderer;
    use buffon::render::{EngineSnapshot, StateSink, Theme};
    use buffon::sim::{CanvasBounds, Engine, InlineProducer, SimulationConfig};
    use buffon::speed_to_frame_interval;

    /// Two-segment slider mapping: positions 0..=50 cover the slow range
    /// (0.02..=1 needles per tick), 50..=100 the fast range (1..=200).
    fn slider_to_speed(pos: f64) -> f64 {
        use buffon::consts::{MAX_SPEED, MIN_SPEED};
        if pos <= 50.0 {
            MIN_SPEED + (pos / 50.0) * (1.0 - MIN_SPEED)
        } else {
            1.0 + ((pos - 50.0) / 50.0) * (MAX_SPEED - 1.0)
        }
    }

    fn speed_to_slider(speed: f64) -> f64 {
        use buffon::consts::{MAX_SPEED, MIN_SPEED};
        if speed <= 1.0 {
            (speed - MIN_SPEED) / (1.0 - MIN_SPEED) * 50.0
        } else {
            50.0 + (speed - 1.0) / (MAX_SPEED - 1.0) * 50.0
        }
    }

    /// Writes aggregate state into the stats panel.
    struct Hud {
        document: Document,
    }

    impl Hud {
        fn set_text(&self, selector: &str, text: &str) {
            if let Some(el) = self.document.query_selector(selector).ok().flatten() {
                el.set_text_content(Some(text));
            }
        }
    }

    impl StateSink for Hud {
        fn flush(&mut self, snapshot: &EngineSnapshot<'_>) {
            self.set_text("#stat-total", &snapshot.stats.total.to_string());
            self.set_text("#stat-crossings", &snapshot.stats.crossings.to_string());
            self.set_text(
                "#stat-pi",
                &snapshot
                    .stats
                    .pi_estimate
                    .map(|est| format!("{est:.4}"))
                    .unwrap_or_else(|| "—".to_string()),
            );
            self.set_text(
                "#stat-error",
                &snapshot
                    .stats
                    .error
                    .map(|err| format!("{err:.4}"))
                    .unwrap_or_else(|| "—".to_string()),
            );
            self.set_text("#stat-samples", &snapshot.history.len().to_string());

            if let Some(el) = self.document.get_element_by_id("run-indicator") {
                let _ = el.set_attribute(
                    "class",
                    if snapshot.is_running {
                        "indicator running"
                    } else {
                        "indicator"
                    },
                );
            }
        }
    }

    struct App {
        engine: Engine,
        renderer: CanvasRenderer,
        hud: Hud,
    }

    impl App {
        fn tick(&mut self, time: f64) {
            self.engine.tick(time, &mut self.renderer, &mut self.hud);
        }

        fn configure(&mut self, config: SimulationConfig) {
            self.engine
                .configure(config.clamped(), &mut self.renderer, &mut self.hud);
        }

        fn redraw(&mut self) {
            use buffon::render::RenderSink;
            let App {
                engine, renderer, ..
            } = self;
            renderer.full_redraw(engine.snapshot().needles, engine.config());
        }
    }

    fn input_value(document: &Document, id: &str) -> Option<f64> {
        let input: HtmlInputElement = document.get_element_by_id(id)?.dyn_into().ok()?;
        input.value().parse().ok()
    }

    /// Read the four control sliders into a config, falling back to the
    /// current value for any missing control.
    fn read_config(document: &Document, current: &SimulationConfig) -> SimulationConfig {
        SimulationConfig {
            needle_length: input_value(document, "needle-length").unwrap_or(current.needle_length),
            line_spacing: input_value(document, "line-spacing").unwrap_or(current.line_spacing),
            speed: input_value(document, "speed")
                .map(slider_to_speed)
                .unwrap_or(current.speed),
            max_needles: input_value(document, "max-needles")
                .map(|v| v as usize)
                .unwrap_or(current.max_needles),
        }
        .clamped()
    }

    fn update_speed_label(document: &Document, speed: f64) {
        if let Some(el) = document.get_element_by_id("speed-label") {
            let label = if speed >= 1.0 {
                format!("×{}", speed.floor() as u32)
            } else {
                format!("1/{}", speed_to_frame_interval(speed))
            };
            el.set_text_content(Some(&label));
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Buffon's Needle starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        let dpr = window.device_pixel_ratio();
        let width = canvas.client_width() as f64;
        let height = canvas.client_height() as f64;

        let config = SimulationConfig::default();
        let seed = js_sys::Date::now() as u64;
        let engine = Engine::new(
            Box::new(InlineProducer::new(seed)),
            config,
            CanvasBounds { width, height },
        );

        let mut renderer =
            CanvasRenderer::new(canvas.clone(), &config, Theme::default()).expect("canvas renderer");
        renderer.resize(width, height, dpr);

        let hud = Hud {
            document: document.clone(),
        };

        let app = Rc::new(RefCell::new(App {
            engine,
            renderer,
            hud,
        }));
        app.borrow_mut().redraw();
        update_speed_label(&document, config.speed);

        log::info!("engine initialized with seed {seed}");

        setup_controls(&document, &canvas, app.clone());
        setup_resize(&canvas, app.clone());
        request_animation_frame(app);

        log::info!("Buffon's Needle running");
    }

    fn setup_controls(document: &Document, canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        on_click(document, "start-btn", {
            let app = app.clone();
            move || app.borrow_mut().engine.start()
        });

        on_click(document, "pause-btn", {
            let app = app.clone();
            move || {
                let app = &mut *app.borrow_mut();
                app.engine.pause(&mut app.hud);
            }
        });

        on_click(document, "reset-btn", {
            let app = app.clone();
            move || {
                let app = &mut *app.borrow_mut();
                app.engine.reset(&mut app.renderer, &mut app.hud);
            }
        });

        on_click(document, "drop-btn", {
            let app = app.clone();
            move || app.borrow_mut().engine.drop_one()
        });

        on_click(document, "theme-btn", {
            let app = app.clone();
            move || {
                let app = &mut *app.borrow_mut();
                let theme = app.renderer.theme().toggled();
                app.renderer.set_theme(theme);
                app.redraw();
            }
        });

        // Drop a needle wherever the canvas is clicked.
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                app.borrow_mut()
                    .engine
                    .drop_at(event.offset_x() as f64, event.offset_y() as f64);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Sliders reconfigure on every input event. The config boundary
        // (clamping) lives here, not in the engine.
        for id in ["needle-length", "line-spacing", "speed", "max-needles"] {
            let Some(input) = document.get_element_by_id(id) else {
                continue;
            };
            let app = app.clone();
            let document = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let app = &mut *app.borrow_mut();
                let config = read_config(&document, app.engine.config());
                update_speed_label(&document, config.speed);
                // Keep the needle-length slider consistent when spacing
                // dragged it down.
                if let Some(el) = document.get_element_by_id("needle-length") {
                    if let Ok(input) = el.dyn_into::<web_sys::HtmlInputElement>() {
                        input.set_max(&config.line_spacing.to_string());
                        input.set_value(&config.needle_length.to_string());
                    }
                }
                app.configure(config);
            });
            let _ =
                input.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Reflect the default speed in the slider position.
        if let Some(el) = document.get_element_by_id("speed") {
            if let Ok(input) = el.dyn_into::<HtmlInputElement>() {
                input.set_value(&speed_to_slider(SimulationConfig::default().speed).to_string());
            }
        }
    }

    fn on_click(document: &Document, id: &str, mut handler: impl FnMut() + 'static) {
        if let Some(btn) = document.get_element_by_id(id) {
            let closure =
                Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| handler());
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap();
        let canvas = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let window = web_sys::window().unwrap();
            let dpr = window.device_pixel_ratio();
            let width = canvas.client_width() as f64;
            let height = canvas.client_height() as f64;

            let app = &mut *app.borrow_mut();
            app.renderer.resize(width, height, dpr);
            app.engine
                .set_bounds(CanvasBounds { width, height }, &mut app.renderer);
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            frame_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(app: Rc<RefCell<App>>, time: f64) {
        app.borrow_mut().tick(time);
        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use buffon::render::NullRender;
    use buffon::sim::{CanvasBounds, Engine, SimulationConfig, ThreadProducer};

    env_logger::init();

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let config = SimulationConfig::default();

    log::info!(
        "headless run: seed {seed}, {} needles at speed {}",
        config.max_needles,
        config.speed
    );

    let mut engine = Engine::new(
        Box::new(ThreadProducer::spawn(seed)),
        config,
        CanvasBounds::default(),
    );
    let mut render = NullRender;
    let mut ui = NullRender;

    engine.start();
    let mut now_ms = 0.0;
    while engine.is_running() {
        engine.tick(now_ms, &mut render, &mut ui);
        now_ms += 16.7;
        // Give the producer thread a moment between polls.
        std::thread::sleep(std::time::Duration::from_micros(100));
    }

    let stats = engine.stats();
    println!("needles:   {}", stats.total);
    println!("crossings: {}", stats.crossings);
    match (stats.pi_estimate, stats.error) {
        (Some(estimate), Some(error)) => {
            println!("pi ≈ {estimate:.6} (error {error:.6})");
        }
        _ => println!("no crossings, no estimate"),
    }
    println!("history points: {}", engine.snapshot().history.len());

    // `--json` additionally dumps the convergence history for plotting.
    if std::env::args().any(|arg| arg == "--json") {
        if let Ok(json) = serde_json::to_string(engine.snapshot().history) {
            println!("{json}");
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main; this only satisfies the compiler.
}
