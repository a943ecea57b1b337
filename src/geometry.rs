use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};

/// Outward slack, in pixels, applied to every containment probe so that
/// rectangles resting exactly on the image edge survive floating-point error.
pub const CONTAINMENT_TOLERANCE: f32 = 1.0;

/// Iteration count for the feasibility binary searches. Twenty halvings of a
/// screen-sized interval land well below a pixel.
pub const FEASIBILITY_ITERATIONS: u32 = 20;

/// Normalize an angle in degrees to the half-open range (-180, 180].
pub fn normalize_degrees(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a <= -180.0 {
        a += 360.0;
    }
    if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// Size of the axis-aligned bounding box of a `size` rectangle rotated by
/// `degrees` about its center.
pub fn rotated_bounds(size: Vec2, degrees: f32) -> Vec2 {
    let rad = degrees.to_radians();
    let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
    vec2(size.x * cos + size.y * sin, size.x * sin + size.y * cos)
}

/// The transformed image as the crop engine sees it: the axis-aligned
/// bounding box of the rotated image spans from the origin to `bounds`, and
/// the image itself sits rotated about the box center. Flips mirror the
/// image about its own center and therefore never change this footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotatedImage {
    pub image_size: Vec2,
    pub degrees: f32,
    pub bounds: Vec2,
}

impl RotatedImage {
    pub fn new(image_size: Vec2, degrees: f32) -> Self {
        let image_size = vec2(image_size.x.max(1.0), image_size.y.max(1.0));
        Self {
            image_size,
            degrees,
            bounds: rotated_bounds(image_size, degrees),
        }
    }

    pub fn center(&self) -> Pos2 {
        pos2(self.bounds.x * 0.5, self.bounds.y * 0.5)
    }

    /// Map a point from bounding-box space into the unrotated image frame
    /// (origin at the image's own top-left corner).
    pub fn to_image_frame(&self, p: Pos2) -> Pos2 {
        let rad = (-self.degrees).to_radians();
        let (sin, cos) = rad.sin_cos();
        let d = p - self.center();
        pos2(
            d.x * cos - d.y * sin + self.image_size.x * 0.5,
            d.x * sin + d.y * cos + self.image_size.y * 0.5,
        )
    }

    /// Map a point from the unrotated image frame back into bounding-box
    /// space.
    pub fn from_image_frame(&self, p: Pos2) -> Pos2 {
        let rad = self.degrees.to_radians();
        let (sin, cos) = rad.sin_cos();
        let d = vec2(
            p.x - self.image_size.x * 0.5,
            p.y - self.image_size.y * 0.5,
        );
        self.center() + vec2(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
    }

    pub fn contains_point(&self, p: Pos2, tolerance: f32) -> bool {
        let q = self.to_image_frame(p);
        q.x >= -tolerance
            && q.x <= self.image_size.x + tolerance
            && q.y >= -tolerance
            && q.y <= self.image_size.y + tolerance
    }

    /// Five-probe containment: the four corners plus the center.
    pub fn contains_rect(&self, rect: Rect, tolerance: f32) -> bool {
        self.contains_point(rect.min, tolerance)
            && self.contains_point(pos2(rect.max.x, rect.min.y), tolerance)
            && self.contains_point(pos2(rect.min.x, rect.max.y), tolerance)
            && self.contains_point(rect.max, tolerance)
            && self.contains_point(rect.center(), tolerance)
    }
}

/// Largest scale factor in (0, 1] accepted by `probe`, found by binary
/// search. Returns 0.0 when no tested scale is feasible.
pub fn largest_feasible_scale(probe: impl Fn(f32) -> bool) -> f32 {
    if probe(1.0) {
        return 1.0;
    }
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    for _ in 0..FEASIBILITY_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if probe(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Slide `from` along the segment toward `target` until `probe` accepts the
/// point, staying as close to `from` as the search resolves. `target` must
/// be acceptable; it is returned when nothing closer passes.
pub fn slide_toward(from: Pos2, target: Pos2, probe: impl Fn(Pos2) -> bool) -> Pos2 {
    if probe(from) {
        return from;
    }
    let at = |t: f32| pos2(from.x + (target.x - from.x) * t, from.y + (target.y - from.y) * t);
    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    for _ in 0..FEASIBILITY_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if probe(at(mid)) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    at(hi)
}
