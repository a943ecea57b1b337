use eframe::egui::{self, Pos2, Rect, Vec2};

/// Fraction of the viewport the fitted content fills; the rest is border.
pub const FIT_FACTOR: f32 = 0.95;

pub const ARROW_MOVE_STEP: f32 = 4.0;

/// Mapping between the crop engine's space (the transformed image's
/// bounding box, origin top-left) and screen coordinates.
#[derive(Clone, Copy, Debug)]
pub struct ViewMetrics {
    /// Screen position of the engine-space origin.
    pub origin: Pos2,
    pub scale: f32,
}

impl ViewMetrics {
    /// Fit `content_size` (engine units) into `canvas`, centered.
    pub fn fit(canvas: Rect, content_size: Vec2) -> Self {
        let (display, scale) = fit_within(content_size, canvas.size() * FIT_FACTOR);
        Self {
            origin: canvas.min + (canvas.size() - display) * 0.5,
            scale,
        }
    }

    /// Fit a sub-rectangle of engine space into `canvas` instead, so the
    /// region fills the view the way the exported image would.
    pub fn fit_region(canvas: Rect, region: Rect) -> Self {
        let (display, scale) = fit_within(region.size(), canvas.size() * FIT_FACTOR);
        let region_min = canvas.min + (canvas.size() - display) * 0.5;
        Self {
            origin: region_min - region.min.to_vec2() * scale,
            scale,
        }
    }

    pub fn to_screen(&self, p: Pos2) -> Pos2 {
        self.origin + p.to_vec2() * self.scale
    }

    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.to_screen(rect.min), self.to_screen(rect.max))
    }

    pub fn to_engine(&self, pos: Pos2) -> Pos2 {
        let rel = pos - self.origin;
        egui::pos2(rel.x / self.scale, rel.y / self.scale)
    }

    pub fn delta_to_engine(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }
}

pub fn fit_within(content_size: Vec2, available: Vec2) -> (Vec2, f32) {
    let safe_size = egui::vec2(content_size.x.max(1.0), content_size.y.max(1.0));
    let scale = (available.x / safe_size.x)
        .min(available.y / safe_size.y)
        .max(0.01);
    (safe_size * scale, scale)
}

pub struct KeyboardState {
    pub next_image: bool,
    pub prev_image: bool,
    pub toggle_skip: bool,
    pub remove: bool,
    pub reset_crop: bool,
    pub toggle_preview: bool,
    pub rotate_cw: bool,
    pub rotate_ccw: bool,
    pub flip_h: bool,
    pub flip_v: bool,
    pub export_all: bool,
    pub escape: bool,
    /// Aspect ratio preset label selected this frame, e.g. `"1:1"`.
    pub ratio_preset: Option<&'static str>,
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
}
