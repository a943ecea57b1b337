use eframe::egui::{
    self, emath::Rot2, Color32, CornerRadius, Mesh, Painter, Pos2, Rect, Stroke, StrokeKind,
};

use crate::{
    crop::{CornerHandle, CropEngine, InteractionMode},
    geometry::normalize_degrees,
    ui::{KeyboardState, ViewMetrics, ARROW_MOVE_STEP},
};

pub const HANDLE_SIZE: f32 = 12.0;
pub const ROTATE_HANDLE_OFFSET: f32 = 28.0;
pub const ROTATE_HANDLE_RADIUS: f32 = 7.0;

struct RotateStart {
    pointer_angle: f32,
    rotation: f32,
}

/// Per-drag pointer state; the engine itself tracks which mode is active.
#[derive(Default)]
pub struct Canvas {
    rotate_start: Option<RotateStart>,
    move_last: Option<Pos2>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.rotate_start = None;
        self.move_last = None;
    }

    /// Route pointer input to the engine. Returns true when the drag
    /// actually edited the crop.
    pub fn handle_pointer(
        &mut self,
        response: &egui::Response,
        metrics: &ViewMetrics,
        engine: &mut CropEngine,
    ) -> bool {
        if engine.preview() {
            return false;
        }
        let mut edited = false;
        if response.drag_started() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let crop_screen = metrics.rect_to_screen(engine.crop_rect());
                if let Some(handle) = hit_corner_handle(crop_screen, pointer) {
                    engine.begin_resize(handle);
                } else if hit_rotation_handle(crop_screen, pointer) {
                    engine.begin_rotate();
                    self.rotate_start = Some(RotateStart {
                        pointer_angle: (pointer - crop_screen.center()).angle(),
                        rotation: engine.transform_state().rotation_degrees,
                    });
                } else if crop_screen.contains(pointer) {
                    engine.begin_move();
                    self.move_last = Some(pointer);
                }
            }
        } else if response.dragged() {
            if let Some(pointer) = response.interact_pointer_pos() {
                match engine.mode() {
                    InteractionMode::Resizing => {
                        engine.resize_to(metrics.to_engine(pointer));
                        edited = true;
                    }
                    InteractionMode::Rotating => {
                        if let Some(start) = &self.rotate_start {
                            let crop_screen = metrics.rect_to_screen(engine.crop_rect());
                            let angle = (pointer - crop_screen.center()).angle();
                            let delta =
                                normalize_degrees((angle - start.pointer_angle).to_degrees());
                            engine.rotate_to(start.rotation + delta);
                            edited = true;
                        }
                    }
                    InteractionMode::Moving => {
                        if let Some(last) = self.move_last {
                            engine.move_by(metrics.delta_to_engine(pointer - last));
                            self.move_last = Some(pointer);
                            edited = true;
                        }
                    }
                    InteractionMode::Idle => {}
                }
            }
        } else if response.drag_stopped() {
            engine.end_interaction();
            self.clear();
        }
        edited
    }

    /// Nudge the crop with the arrow keys. Returns true when it moved.
    pub fn handle_arrow_movement(&self, keys: &KeyboardState, engine: &mut CropEngine) -> bool {
        if engine.preview() {
            return false;
        }
        let mut delta = egui::Vec2::ZERO;
        if keys.move_up {
            delta.y -= ARROW_MOVE_STEP;
        }
        if keys.move_down {
            delta.y += ARROW_MOVE_STEP;
        }
        if keys.move_left {
            delta.x -= ARROW_MOVE_STEP;
        }
        if keys.move_right {
            delta.x += ARROW_MOVE_STEP;
        }
        if delta == egui::Vec2::ZERO {
            return false;
        }
        engine.move_by(delta);
        true
    }

    pub fn draw(
        &self,
        painter: &Painter,
        canvas_rect: Rect,
        metrics: &ViewMetrics,
        engine: &CropEngine,
        texture: &egui::TextureHandle,
    ) {
        draw_image(painter, metrics, engine, texture);
        let crop_screen = metrics.rect_to_screen(engine.crop_rect());
        if engine.preview() {
            draw_preview_mask(painter, canvas_rect, crop_screen);
        } else {
            draw_edit_overlay(painter, canvas_rect, crop_screen);
        }
    }
}

fn draw_image(
    painter: &Painter,
    metrics: &ViewMetrics,
    engine: &CropEngine,
    texture: &egui::TextureHandle,
) {
    let bounds = engine.bounds();
    let frame_center = metrics.to_screen(egui::pos2(bounds.x * 0.5, bounds.y * 0.5));
    let rect = Rect::from_center_size(frame_center, engine.image_size() * metrics.scale);
    let transform = engine.transform_state();
    // flips mirror the texture by swapping uv corners
    let uv = Rect::from_min_max(
        egui::pos2(
            if transform.flip_h { 1.0 } else { 0.0 },
            if transform.flip_v { 1.0 } else { 0.0 },
        ),
        egui::pos2(
            if transform.flip_h { 0.0 } else { 1.0 },
            if transform.flip_v { 0.0 } else { 1.0 },
        ),
    );
    let mut mesh = Mesh::with_texture(texture.id());
    mesh.add_rect_with_uv(rect, uv, Color32::WHITE);
    mesh.rotate(
        Rot2::from_angle(transform.rotation_degrees.to_radians()),
        frame_center,
    );
    painter.add(mesh);
}

fn draw_edit_overlay(painter: &Painter, canvas: Rect, crop: Rect) {
    let overlay = Color32::from_black_alpha(150);
    let sides = [
        Rect::from_min_max(canvas.min, egui::pos2(canvas.max.x, crop.min.y)),
        Rect::from_min_max(egui::pos2(canvas.min.x, crop.max.y), canvas.max),
        Rect::from_min_max(
            egui::pos2(canvas.min.x, crop.min.y),
            egui::pos2(crop.min.x, crop.max.y),
        ),
        Rect::from_min_max(
            egui::pos2(crop.max.x, crop.min.y),
            egui::pos2(canvas.max.x, crop.max.y),
        ),
    ];
    for side in sides {
        if side.width() > 0.0 && side.height() > 0.0 {
            painter.rect_filled(side, CornerRadius::ZERO, overlay);
        }
    }

    painter.rect_stroke(
        crop,
        CornerRadius::ZERO,
        Stroke::new(1.0, Color32::WHITE),
        StrokeKind::Middle,
    );

    let handle_fill = Color32::from_rgba_unmultiplied(255, 255, 255, 200);
    let handle_stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(0, 0, 0, 100));
    for handle in CornerHandle::ALL {
        let rect = handle_rect(handle.corner(crop));
        painter.rect_filled(rect, CornerRadius::same(2), handle_fill);
        painter.rect_stroke(rect, CornerRadius::same(2), handle_stroke, StrokeKind::Middle);
    }

    let rotate_center = rotation_handle_center(crop);
    painter.line_segment(
        [egui::pos2(crop.center().x, crop.max.y), rotate_center],
        Stroke::new(1.0, Color32::WHITE),
    );
    painter.circle_filled(rotate_center, ROTATE_HANDLE_RADIUS, handle_fill);
    painter.circle_stroke(rotate_center, ROTATE_HANDLE_RADIUS, handle_stroke);
}

/// Preview hides everything outside the crop behind white, simulating the
/// exported result. Slight overlap keeps subpixel seams from peeking.
fn draw_preview_mask(painter: &Painter, canvas: Rect, crop: Rect) {
    let eps = 0.5;
    let sides = [
        Rect::from_min_max(canvas.min, egui::pos2(canvas.max.x, crop.min.y + eps)),
        Rect::from_min_max(egui::pos2(canvas.min.x, crop.max.y - eps), canvas.max),
        Rect::from_min_max(
            egui::pos2(canvas.min.x, crop.min.y),
            egui::pos2(crop.min.x + eps, crop.max.y),
        ),
        Rect::from_min_max(
            egui::pos2(crop.max.x - eps, crop.min.y),
            egui::pos2(canvas.max.x, crop.max.y),
        ),
    ];
    for side in sides {
        if side.width() > 0.0 && side.height() > 0.0 {
            painter.rect_filled(side, CornerRadius::ZERO, Color32::WHITE);
        }
    }
}

fn handle_rect(corner: Pos2) -> Rect {
    Rect::from_center_size(corner, egui::vec2(HANDLE_SIZE, HANDLE_SIZE))
}

pub fn rotation_handle_center(crop_screen: Rect) -> Pos2 {
    egui::pos2(
        crop_screen.center().x,
        crop_screen.max.y + ROTATE_HANDLE_OFFSET,
    )
}

fn hit_corner_handle(crop_screen: Rect, pointer: Pos2) -> Option<CornerHandle> {
    CornerHandle::ALL
        .into_iter()
        .find(|h| handle_rect(h.corner(crop_screen)).contains(pointer))
}

fn hit_rotation_handle(crop_screen: Rect, pointer: Pos2) -> bool {
    (pointer - rotation_handle_center(crop_screen)).length() <= ROTATE_HANDLE_RADIUS + 4.0
}
