// Stage transform: fit-to-view, pointer/centre anchored zoom, pan.
use kurbo::{Affine, Point, Vec2};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 10.0;
/// Multiplier applied per wheel notch.
pub const WHEEL_STEP: f64 = 1.1;
/// Multiplier applied by the zoom buttons.
pub const BUTTON_STEP: f64 = 1.2;

/// Stage size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Natural size of the loaded background image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundDimensions {
    pub width: f64,
    pub height: f64,
}

impl BackgroundDimensions {
    /// `None` until the image has real, non-zero dimensions.
    pub fn new(width: f64, height: f64) -> Option<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        (ok(width) && ok(height)).then_some(Self { width, height })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Transform {
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.offset_x, self.offset_y)
    }

    /// World (image pixel) to view mapping for the rendering surface.
    pub fn affine(&self) -> Affine {
        Affine::translate(self.offset()) * Affine::scale(self.scale)
    }

    pub fn view_to_world(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset_x) / self.scale,
            (p.y - self.offset_y) / self.scale,
        )
    }

    pub fn world_to_view(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.offset_x,
            p.y * self.scale + self.offset_y,
        )
    }

    /// Rescales so the world point under `anchor` stays under `anchor`.
    /// A degenerate current scale has no world point to keep, so nothing changes.
    fn zoom_about(&self, anchor: Point, new_scale: f64) -> Self {
        if !usable_scale(self.scale) {
            return *self;
        }
        let world = self.view_to_world(anchor);
        Self {
            scale: new_scale,
            offset_x: anchor.x - world.x * new_scale,
            offset_y: anchor.y - world.y * new_scale,
        }
    }
}

fn usable_scale(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}

fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Largest scale (capped at 1, never upscaling) showing the whole background, centred.
///
/// Returns `None` when the background has not loaded yet or the viewport has no area.
pub fn fit_to_view(viewport: Viewport, background: Option<BackgroundDimensions>) -> Option<Transform> {
    let bg = background?;
    let scale = (viewport.width / bg.width)
        .min(viewport.height / bg.height)
        .min(1.0);
    if !usable_scale(scale) {
        return None;
    }
    let scaled_w = bg.width * scale;
    let scaled_h = bg.height * scale;
    Some(Transform {
        scale,
        offset_x: ((viewport.width - scaled_w) / 2.0).max(0.0),
        offset_y: ((viewport.height - scaled_h) / 2.0).max(0.0),
    })
}

/// Camera state for the garden stage.
#[derive(Debug, Clone)]
pub struct Camera {
    pub transform: Transform,
    pub viewport: Viewport,
    pub background: Option<BackgroundDimensions>,
    pub panning: bool,
    pub last_x: f64,
    pub last_y: f64,
    /// A resize happened; the host should call `reset` once layout settles.
    pub refit_pending: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Viewport::new(800.0, 600.0))
    }
}

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            transform: Transform::default(),
            viewport,
            background: None,
            panning: false,
            last_x: 0.0,
            last_y: 0.0,
            refit_pending: false,
        }
    }

    pub fn scale(&self) -> f64 {
        self.transform.scale
    }

    /// Zoom anchored at the pointer. Positive delta multiplies, negative divides.
    pub fn wheel_zoom(&mut self, pointer: Point, delta_y: f64) {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let old = self.transform.scale;
        if !usable_scale(old) {
            return;
        }
        let new = if delta_y > 0.0 {
            old * WHEEL_STEP
        } else {
            old / WHEEL_STEP
        };
        self.transform = self.transform.zoom_about(pointer, clamp_scale(new));
    }

    /// Zoom anchored at the viewport centre.
    pub fn zoom_by(&mut self, multiplier: f64) {
        if !usable_scale(multiplier) || !usable_scale(self.transform.scale) {
            return;
        }
        let new = clamp_scale(self.transform.scale * multiplier);
        self.transform = self.transform.zoom_about(self.viewport.center(), new);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(BUTTON_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / BUTTON_STEP);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.transform.offset_x += dx;
        self.transform.offset_y += dy;
    }

    pub fn begin_pan(&mut self, x: f64, y: f64) {
        self.panning = true;
        self.last_x = x;
        self.last_y = y;
    }

    /// Moves the stage with the pointer while panning. Returns whether anything moved.
    pub fn pan_to(&mut self, x: f64, y: f64) -> bool {
        if !self.panning {
            return false;
        }
        self.pan_by(x - self.last_x, y - self.last_y);
        self.last_x = x;
        self.last_y = y;
        true
    }

    pub fn end_pan(&mut self) {
        self.panning = false;
    }

    /// Fits the background into the viewport. No-op (returns false) before the image loads.
    pub fn reset(&mut self) -> bool {
        self.refit_pending = false;
        match fit_to_view(self.viewport, self.background) {
            Some(t) => {
                tracing::debug!(scale = t.scale, x = t.offset_x, y = t.offset_y, "fit to view");
                self.transform = t;
                true
            }
            None => {
                tracing::debug!("background or viewport size not available, skipping reset");
                false
            }
        }
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.refit_pending = true;
    }

    pub fn set_background(&mut self, background: Option<BackgroundDimensions>) {
        self.background = background;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn camera_with_bg(vw: f64, vh: f64, bw: f64, bh: f64) -> Camera {
        let mut cam = Camera::new(Viewport::new(vw, vh));
        cam.set_background(BackgroundDimensions::new(bw, bh));
        cam
    }

    #[test]
    fn fit_shrinks_large_background() {
        let t = fit_to_view(
            Viewport::new(800.0, 600.0),
            BackgroundDimensions::new(2000.0, 1000.0),
        )
        .unwrap();
        assert_relative_eq!(t.scale, 0.4);
        assert_relative_eq!(t.offset_x, 0.0);
        assert_relative_eq!(t.offset_y, 100.0);
    }

    #[test]
    fn fit_never_upscales() {
        let t = fit_to_view(
            Viewport::new(800.0, 600.0),
            BackgroundDimensions::new(400.0, 300.0),
        )
        .unwrap();
        assert_eq!(t.scale, 1.0);
        assert_relative_eq!(t.offset_x, 200.0);
        assert_relative_eq!(t.offset_y, 150.0);
    }

    #[test]
    fn fit_without_background_keeps_transform() {
        let mut cam = Camera::new(Viewport::new(800.0, 600.0));
        cam.transform = Transform {
            scale: 2.0,
            offset_x: 5.0,
            offset_y: -7.0,
        };
        assert!(BackgroundDimensions::new(0.0, 300.0).is_none());
        assert!(!cam.reset());
        assert_eq!(
            cam.transform,
            Transform {
                scale: 2.0,
                offset_x: 5.0,
                offset_y: -7.0
            }
        );
    }

    #[test]
    fn zero_height_viewport_keeps_transform_finite() {
        let mut cam = camera_with_bg(800.0, 0.0, 2000.0, 1000.0);
        assert!(fit_to_view(cam.viewport, cam.background).is_none());
        assert!(!cam.reset());
        assert_eq!(cam.transform, Transform::default());

        cam.transform.scale = 0.0;
        cam.zoom_in();
        cam.wheel_zoom(Point::new(10.0, 10.0), -1.0);
        assert_eq!(cam.scale(), 0.0);
        assert!(cam.transform.offset_x.is_finite() && cam.transform.offset_y.is_finite());

        cam.resize(Viewport::new(800.0, 600.0));
        assert!(cam.reset());
        assert_relative_eq!(cam.scale(), 0.4);
    }

    #[test]
    fn wheel_zoom_clamps_both_ends() {
        let mut cam = Camera::default();
        let p = Point::new(120.0, 80.0);
        cam.transform.scale = 9.0;
        for _ in 0..20 {
            cam.wheel_zoom(p, 1.0);
            assert!(cam.scale() <= MAX_SCALE);
        }
        assert_eq!(cam.scale(), MAX_SCALE);

        cam.transform.scale = 0.15;
        for _ in 0..20 {
            cam.wheel_zoom(p, -1.0);
            assert!(cam.scale() >= MIN_SCALE);
        }
        assert_eq!(cam.scale(), MIN_SCALE);
    }

    #[test]
    fn wheel_zoom_keeps_world_point_under_pointer() {
        let mut cam = Camera::default();
        cam.transform = Transform {
            scale: 0.8,
            offset_x: 33.0,
            offset_y: -12.5,
        };
        let p = Point::new(301.0, 177.0);
        for delta in [1.0, 1.0, -1.0, 1.0, -1.0, -1.0, -1.0] {
            let before = cam.transform.view_to_world(p);
            cam.wheel_zoom(p, delta);
            let after = cam.transform.view_to_world(p);
            assert_relative_eq!(before.x, after.x, epsilon = 1e-9);
            assert_relative_eq!(before.y, after.y, epsilon = 1e-9);
        }
        let s = cam.scale();
        cam.wheel_zoom(p, 0.0);
        assert_eq!(cam.scale(), s);
    }

    #[test]
    fn button_zoom_anchors_at_center() {
        let mut cam = Camera::new(Viewport::new(1000.0, 500.0));
        let center = cam.viewport.center();
        let before = cam.transform.view_to_world(center);
        cam.zoom_in();
        assert_relative_eq!(cam.scale(), 1.2);
        cam.zoom_out();
        cam.zoom_out();
        assert_relative_eq!(cam.scale(), 1.0 / 1.2, epsilon = 1e-12);
        let after = cam.transform.view_to_world(center);
        assert_relative_eq!(before.x, after.x, epsilon = 1e-9);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-9);
    }

    #[test]
    fn resize_marks_refit_and_reset_applies_it() {
        let mut cam = camera_with_bg(800.0, 600.0, 2000.0, 1000.0);
        cam.resize(Viewport::new(400.0, 600.0));
        assert!(cam.refit_pending);
        assert!(cam.reset());
        assert!(!cam.refit_pending);
        assert_relative_eq!(cam.scale(), 0.2);
        assert_relative_eq!(cam.transform.offset_y, 200.0);
    }

    #[test]
    fn pan_follows_pointer_only_while_panning() {
        let mut cam = Camera::default();
        assert!(!cam.pan_to(10.0, 10.0));
        cam.begin_pan(10.0, 10.0);
        assert!(cam.pan_to(25.0, 5.0));
        cam.end_pan();
        assert_eq!(cam.transform.offset(), Vec2::new(15.0, -5.0));
    }

    #[test]
    fn affine_matches_world_to_view() {
        let t = Transform {
            scale: 2.5,
            offset_x: 10.0,
            offset_y: 20.0,
        };
        let p = Point::new(3.0, 4.0);
        let a = t.affine() * p;
        let b = t.world_to_view(p);
        assert_relative_eq!(a.x, b.x);
        assert_relative_eq!(a.y, b.y);
        let back = t.view_to_world(b);
        assert_relative_eq!(back.x, p.x);
        assert_relative_eq!(back.y, p.y);
    }
}
