use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};

use crate::geometry::{
    largest_feasible_scale, normalize_degrees, slide_toward, RotatedImage, CONTAINMENT_TOLERANCE,
};

pub const DEFAULT_RATIO_LABEL: &str = "4:5";
pub const DEFAULT_ASPECT: f32 = 0.8;
/// Smallest crop width the engine will produce, in engine pixels.
pub const MIN_CROP_WIDTH: f32 = 10.0;

/// Loose clamp for normalized components; absorbs transient overshoot while
/// a drag is in progress without letting non-finite values through.
const NORM_LIMIT: f32 = 10.0;

/// Parse a `"W:H"` label into a width/height ratio.
pub fn parse_ratio_label(label: &str) -> Option<f32> {
    let (w, h) = label.split_once(':')?;
    let w: f32 = w.trim().parse().ok()?;
    let h: f32 = h.trim().parse().ok()?;
    if w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0 {
        Some(w / h)
    } else {
        None
    }
}

/// Maximal centered crop of the target `aspect` within a box of `bounds`
/// size, as normalized fractions of that box.
pub fn default_crop(bounds: Vec2, aspect: f32) -> NormalizedCrop {
    let bounds = vec2(bounds.x.max(1.0), bounds.y.max(1.0));
    let image_aspect = bounds.x / bounds.y;
    let (w, h) = if image_aspect > aspect {
        (aspect / image_aspect, 1.0)
    } else {
        (1.0, image_aspect / aspect)
    };
    NormalizedCrop::new((1.0 - w) * 0.5, (1.0 - h) * 0.5, w, h)
}

/// Crop rectangle as fractions of the transformed image's bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedCrop {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl NormalizedCrop {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }.clamped()
    }

    fn clamped(self) -> Self {
        let c = |v: f32, fallback: f32| {
            if v.is_finite() {
                v.clamp(-NORM_LIMIT, NORM_LIMIT)
            } else {
                fallback
            }
        };
        Self {
            x: c(self.x, 0.0),
            y: c(self.y, 0.0),
            w: c(self.w, 1.0),
            h: c(self.h, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransformState {
    pub rotation_degrees: f32,
    pub flip_h: bool,
    pub flip_v: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    Idle,
    Resizing,
    Moving,
    Rotating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CornerHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CornerHandle {
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub fn corner(self, rect: Rect) -> Pos2 {
        match self {
            Self::TopLeft => rect.min,
            Self::TopRight => pos2(rect.max.x, rect.min.y),
            Self::BottomLeft => pos2(rect.min.x, rect.max.y),
            Self::BottomRight => rect.max,
        }
    }

    /// The corner that stays fixed while this handle is dragged.
    pub fn opposite(self, rect: Rect) -> Pos2 {
        match self {
            Self::TopLeft => rect.max,
            Self::TopRight => pos2(rect.min.x, rect.max.y),
            Self::BottomLeft => pos2(rect.max.x, rect.min.y),
            Self::BottomRight => rect.min,
        }
    }

    /// Unit direction from the fixed corner toward this handle.
    fn direction(self) -> Vec2 {
        match self {
            Self::TopLeft => vec2(-1.0, -1.0),
            Self::TopRight => vec2(1.0, -1.0),
            Self::BottomLeft => vec2(-1.0, 1.0),
            Self::BottomRight => vec2(1.0, 1.0),
        }
    }
}

struct RotateGesture {
    /// Rotation pivot, locked in the unrotated image frame at drag start.
    pivot_local: Pos2,
    /// Crop size at drag start; rotating back toward the start angle grows
    /// the crop back to this size instead of staying shrunk.
    goal_size: Vec2,
}

/// Fixed-aspect crop rectangle over one rotated, optionally flipped image.
///
/// All coordinates are in "engine space": the axis-aligned bounding box of
/// the transformed image, origin top-left. Every operation is total; an
/// infeasible request clamps, slides, or leaves the crop unchanged.
pub struct CropEngine {
    image_size: Vec2,
    rotation: f32,
    flip_h: bool,
    flip_v: bool,
    aspect: f32,
    ratio_label: String,
    crop: Rect,
    mode: InteractionMode,
    rotate_gesture: Option<RotateGesture>,
    active_handle: Option<CornerHandle>,
    preview: bool,
    changed: bool,
}

impl CropEngine {
    pub fn new(image_size: Vec2, ratio_label: &str) -> Self {
        let (aspect, ratio_label) = match parse_ratio_label(ratio_label) {
            Some(aspect) => (aspect, ratio_label.to_owned()),
            None => (DEFAULT_ASPECT, DEFAULT_RATIO_LABEL.to_owned()),
        };
        let mut engine = Self {
            image_size: vec2(image_size.x.max(1.0), image_size.y.max(1.0)),
            rotation: 0.0,
            flip_h: false,
            flip_v: false,
            aspect,
            ratio_label,
            crop: Rect::ZERO,
            mode: InteractionMode::Idle,
            rotate_gesture: None,
            active_handle: None,
            preview: false,
            changed: false,
        };
        engine.reset_crop();
        engine.changed = false;
        engine
    }

    fn frame(&self) -> RotatedImage {
        RotatedImage::new(self.image_size, self.rotation)
    }

    pub fn image_size(&self) -> Vec2 {
        self.image_size
    }

    /// Bounding box of the transformed image; the space the crop lives in.
    pub fn bounds(&self) -> Vec2 {
        self.frame().bounds
    }

    pub fn crop_rect(&self) -> Rect {
        self.crop
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn ratio_label(&self) -> &str {
        &self.ratio_label
    }

    pub fn preview(&self) -> bool {
        self.preview
    }

    /// Switch between edit and preview rendering. Never touches the crop.
    pub fn set_preview(&mut self, preview: bool) {
        self.preview = preview;
    }

    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Swap in a different resolution of the same image (proxy to full);
    /// the crop keeps its normalized position.
    pub fn set_image_size(&mut self, size: Vec2) {
        let size = vec2(size.x.max(1.0), size.y.max(1.0));
        if size == self.image_size {
            return;
        }
        let norm = self.normalized_crop();
        self.image_size = size;
        self.apply_normalized(norm);
    }

    pub fn normalized_crop(&self) -> NormalizedCrop {
        let b = self.bounds();
        NormalizedCrop::new(
            self.crop.min.x / b.x,
            self.crop.min.y / b.y,
            self.crop.width() / b.x,
            self.crop.height() / b.y,
        )
    }

    fn apply_normalized(&mut self, norm: NormalizedCrop) {
        let b = self.bounds();
        self.crop = Rect::from_min_size(
            pos2(norm.x * b.x, norm.y * b.y),
            vec2(norm.w * b.x, norm.h * b.y),
        );
    }

    /// Restore a previously captured crop. Leaves preview mode so the
    /// restored rectangle is visible for editing.
    pub fn restore_crop(&mut self, norm: NormalizedCrop) {
        self.preview = false;
        self.apply_normalized(norm);
        self.mark_changed();
    }

    /// Maximal crop of the target ratio, centered in the transformed image.
    pub fn reset_crop(&mut self) {
        let norm = default_crop(self.bounds(), self.aspect);
        self.apply_normalized(norm);
        self.mark_changed();
    }

    pub fn set_aspect_ratio(&mut self, label: &str) {
        match parse_ratio_label(label) {
            Some(aspect) => {
                self.aspect = aspect;
                self.ratio_label = label.to_owned();
            }
            None => {
                self.aspect = DEFAULT_ASPECT;
                self.ratio_label = DEFAULT_RATIO_LABEL.to_owned();
            }
        }
        self.preview = false;
        self.reset_crop();
    }

    pub fn transform_state(&self) -> TransformState {
        TransformState {
            rotation_degrees: self.rotation,
            flip_h: self.flip_h,
            flip_v: self.flip_v,
        }
    }

    /// Restore rotation and flips about the image's natural center. Does not
    /// re-fit the crop; the caller follows up with `restore_crop` or
    /// `reset_crop`.
    pub fn set_transform_state(&mut self, state: TransformState) {
        self.rotation = normalize_degrees(state.rotation_degrees);
        self.flip_h = state.flip_h;
        self.flip_v = state.flip_v;
    }

    pub fn flip_horizontal(&mut self) {
        self.flip_h = !self.flip_h;
        self.mark_changed();
    }

    pub fn flip_vertical(&mut self) {
        self.flip_v = !self.flip_v;
        self.mark_changed();
    }

    /// Discrete quarter turn. Re-maximizes the crop into the new
    /// orientation instead of shrinking to fit.
    pub fn rotate_quarter(&mut self, steps: i32) {
        if self.mode != InteractionMode::Idle {
            return;
        }
        self.rotation = normalize_degrees(self.rotation + 90.0 * steps as f32);
        self.reset_crop();
    }

    /// Enter the interactive rotation mode, locking the pivot at the crop
    /// center (in image-local coordinates) and remembering the current crop
    /// size as the grow-back goal.
    pub fn begin_rotate(&mut self) {
        if self.mode != InteractionMode::Idle {
            return;
        }
        self.mode = InteractionMode::Rotating;
        self.rotate_gesture = Some(RotateGesture {
            pivot_local: self.frame().to_image_frame(self.crop.center()),
            goal_size: self.crop.size(),
        });
    }

    /// Interactive rotation toward `degrees` around the locked pivot.
    pub fn rotate_to(&mut self, degrees: f32) {
        if self.mode != InteractionMode::Rotating {
            return;
        }
        let Some(gesture) = &self.rotate_gesture else {
            return;
        };
        let pivot_local = gesture.pivot_local;
        let goal = gesture.goal_size;
        self.rotation = normalize_degrees(degrees);
        let center = self.frame().from_image_frame(pivot_local);
        self.shrink_to_fit(goal, center);
    }

    /// One-shot rotation outside a gesture; the pivot is recomputed from the
    /// current crop center.
    pub fn set_rotation(&mut self, degrees: f32) {
        if self.mode != InteractionMode::Idle {
            return;
        }
        let pivot_local = self.frame().to_image_frame(self.crop.center());
        let goal = self.crop.size();
        self.rotation = normalize_degrees(degrees);
        let center = self.frame().from_image_frame(pivot_local);
        self.shrink_to_fit(goal, center);
    }

    pub fn begin_resize(&mut self, handle: CornerHandle) {
        if self.mode != InteractionMode::Idle {
            return;
        }
        self.mode = InteractionMode::Resizing;
        self.active_handle = Some(handle);
    }

    /// Aspect-locked resize: the corner opposite the active handle stays
    /// fixed, the width follows the pointer, and the height is derived from
    /// the ratio. An infeasible width binary-searches down to the largest
    /// one that still fits, never below `MIN_CROP_WIDTH`.
    pub fn resize_to(&mut self, pointer: Pos2) {
        if self.mode != InteractionMode::Resizing {
            return;
        }
        let Some(handle) = self.active_handle else {
            return;
        };
        let frame = self.frame();
        let fixed = handle.opposite(self.crop);
        let dir = handle.direction();
        let aspect = self.aspect;
        let rect_for = |w: f32| {
            let w = w.max(MIN_CROP_WIDTH);
            let h = w / aspect;
            Rect::from_two_pos(fixed, fixed + vec2(w * dir.x, h * dir.y))
        };
        let desired_w = (pointer.x - fixed.x).abs();
        let desired = rect_for(desired_w);
        self.crop = if frame.contains_rect(desired, CONTAINMENT_TOLERANCE) {
            desired
        } else {
            let scale = largest_feasible_scale(|s| {
                frame.contains_rect(rect_for(desired_w * s), CONTAINMENT_TOLERANCE)
            });
            rect_for(desired_w * scale)
        };
        self.mark_changed();
    }

    pub fn begin_move(&mut self) {
        if self.mode != InteractionMode::Idle {
            return;
        }
        self.mode = InteractionMode::Moving;
    }

    /// Translate the crop. When the full delta leaves the image, slide along
    /// whichever single axis still fits; otherwise the step is dropped.
    pub fn move_by(&mut self, delta: Vec2) {
        if !matches!(self.mode, InteractionMode::Moving | InteractionMode::Idle) {
            return;
        }
        let frame = self.frame();
        for d in [delta, vec2(delta.x, 0.0), vec2(0.0, delta.y)] {
            if d == Vec2::ZERO {
                continue;
            }
            let moved = self.crop.translate(d);
            if frame.contains_rect(moved, CONTAINMENT_TOLERANCE) {
                self.crop = moved;
                self.mark_changed();
                return;
            }
        }
    }

    /// Release whatever gesture is active and return to `Idle`.
    pub fn end_interaction(&mut self) {
        self.mode = InteractionMode::Idle;
        self.rotate_gesture = None;
        self.active_handle = None;
    }

    /// Keep the crop inside the rotated image: try the goal size at the
    /// given center, sliding the center toward the image middle first if
    /// even it has escaped the bounds, then binary-search the largest
    /// uniform scale of the goal that passes all five containment probes.
    fn shrink_to_fit(&mut self, goal: Vec2, center: Pos2) {
        let frame = self.frame();
        let aspect = self.aspect;
        let goal_w = goal.x.max(MIN_CROP_WIDTH);
        let center = if frame.contains_point(center, CONTAINMENT_TOLERANCE) {
            center
        } else {
            slide_toward(center, frame.center(), |p| {
                frame.contains_point(p, CONTAINMENT_TOLERANCE)
            })
        };
        let rect_for = |w: f32| Rect::from_center_size(center, vec2(w, w / aspect));
        let goal_rect = rect_for(goal_w);
        self.crop = if frame.contains_rect(goal_rect, CONTAINMENT_TOLERANCE) {
            goal_rect
        } else {
            let scale = largest_feasible_scale(|s| {
                frame.contains_rect(rect_for(goal_w * s), CONTAINMENT_TOLERANCE)
            });
            rect_for((goal_w * scale).max(MIN_CROP_WIDTH))
        };
        self.mark_changed();
    }
}
