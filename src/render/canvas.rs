//! Canvas2D renderer (wasm)
//!
//! Performance strategy, same shape as the rest of the engine:
//! - Incremental drawing: new needles are painted on top without clearing
//! - Full redraw only on reset, geometry change, theme change, or resize
//! - Aggregate UI flushes are throttled elsewhere; the canvas itself is
//!   repainted every tick

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::{RenderSink, Theme};
use crate::sim::{Needle, SimulationConfig};

struct Palette {
    background: &'static str,
    line: &'static str,
    crossing: &'static str,
    miss: &'static str,
}

impl Theme {
    fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: "#0f172a",
                line: "rgba(148, 163, 184, 0.30)",
                crossing: "rgba(248, 113, 113, 0.85)",
                miss: "rgba(96, 165, 250, 0.70)",
            },
            Theme::Light => Palette {
                background: "#f8fafc",
                line: "rgba(100, 116, 139, 0.35)",
                crossing: "rgba(220, 38, 38, 0.80)",
                miss: "rgba(37, 99, 235, 0.65)",
            },
        }
    }
}

/// Draws needles and ruled lines onto an HTML canvas.
///
/// Keeps its own copy of the needle/line geometry so incremental appends
/// need nothing but the batch itself; `full_redraw` refreshes the copy.
pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// CSS-pixel dimensions (backing store is scaled by DPR)
    width: f64,
    height: f64,
    needle_length: f64,
    line_spacing: f64,
    theme: Theme,
}

impl CanvasRenderer {
    pub fn new(
        canvas: HtmlCanvasElement,
        config: &SimulationConfig,
        theme: Theme,
    ) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;

        Ok(Self {
            canvas,
            ctx,
            width: crate::consts::DEFAULT_CANVAS_WIDTH,
            height: crate::consts::DEFAULT_CANVAS_HEIGHT,
            needle_length: config.needle_length,
            line_spacing: config.line_spacing,
            theme,
        })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Switch palettes. The caller must follow up with a `full_redraw`.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Resize the backing store for `dpr` and remember the CSS-pixel size.
    /// The caller must follow up with a `full_redraw`.
    pub fn resize(&mut self, width: f64, height: f64, dpr: f64) {
        self.width = width;
        self.height = height;
        self.canvas.set_width((width * dpr).round() as u32);
        self.canvas.set_height((height * dpr).round() as u32);
        let _ = self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
    }

    fn draw_background(&self) {
        let palette = self.theme.palette();
        self.ctx.set_fill_style_str(palette.background);
        self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
    }

    fn draw_lines(&self) {
        let palette = self.theme.palette();
        self.ctx.set_stroke_style_str(palette.line);
        self.ctx.set_line_width(1.0);
        let mut y = self.line_spacing;
        while y < self.height {
            self.ctx.begin_path();
            self.ctx.move_to(0.0, y);
            self.ctx.line_to(self.width, y);
            self.ctx.stroke();
            y += self.line_spacing;
        }
    }

    fn draw_needle(&self, needle: &Needle) {
        let palette = self.theme.palette();
        let (a, b) = needle.endpoints(self.needle_length);
        self.ctx.set_stroke_style_str(if needle.crossing {
            palette.crossing
        } else {
            palette.miss
        });
        self.ctx.set_line_width(1.5);
        self.ctx.set_line_cap("round");
        self.ctx.begin_path();
        self.ctx.move_to(a.x, a.y);
        self.ctx.line_to(b.x, b.y);
        self.ctx.stroke();
    }
}

impl RenderSink for CanvasRenderer {
    fn append_needles(&mut self, batch: &[Needle]) {
        for needle in batch {
            self.draw_needle(needle);
        }
    }

    fn full_redraw(&mut self, needles: &[Needle], config: &SimulationConfig) {
        self.needle_length = config.needle_length;
        self.line_spacing = config.line_spacing;
        self.ctx.clear_rect(0.0, 0.0, self.width, self.height);
        self.draw_background();
        self.draw_lines();
        for needle in needles {
            self.draw_needle(needle);
        }
    }
}
