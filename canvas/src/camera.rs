#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::consts::{BUTTON_ZOOM_IN, BUTTON_ZOOM_OUT, MAX_ZOOM, MIN_ZOOM};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Camera state for pan/zoom on the infinite canvas.
///
/// Maps world coordinates to screen coordinates as
/// `screen = world * zoom + offset`. `offset_x` / `offset_y` are in CSS
/// pixels, `zoom` is a scale factor (1.0 = no zoom) kept inside
/// [`MIN_ZOOM`]..=[`MAX_ZOOM`] by every mutating method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { zoom: 1.0, offset_x: 0.0, offset_y: 0.0 }
    }
}

/// Clamp a zoom factor into the supported range. Non-finite input maps to 1.0.
#[must_use]
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() { zoom.clamp(MIN_ZOOM, MAX_ZOOM) } else { 1.0 }
}

impl Camera {
    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        let zoom = clamp_zoom(self.zoom);
        Point {
            x: (screen.x - self.offset_x) / zoom,
            y: (screen.y - self.offset_y) / zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.offset_x,
            y: world.y * self.zoom + self.offset_y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / clamp_zoom(self.zoom)
    }

    /// Multiply zoom by `factor` while keeping the world point under `anchor`
    /// fixed on screen.
    ///
    /// Returns `false` (and leaves the camera untouched) when the factor is
    /// not a finite positive number or the clamped zoom would not change.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let anchor_world = self.screen_to_world(anchor);
        let new_zoom = clamp_zoom(clamp_zoom(self.zoom) * factor);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return false;
        }
        self.zoom = new_zoom;
        self.offset_x = anchor.x - anchor_world.x * new_zoom;
        self.offset_y = anchor.y - anchor_world.y * new_zoom;
        true
    }

    /// Translate the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Toolbar zoom-in step around `anchor`.
    pub fn zoom_in(&mut self, anchor: Point) -> bool {
        self.zoom_at(anchor, BUTTON_ZOOM_IN)
    }

    /// Toolbar zoom-out step around `anchor`.
    pub fn zoom_out(&mut self, anchor: Point) -> bool {
        self.zoom_at(anchor, BUTTON_ZOOM_OUT)
    }

    /// Reset to the identity transform.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Repair a camera that came from outside (storage, imported JSON).
    #[must_use]
    pub fn sanitized(self) -> Self {
        let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            zoom: clamp_zoom(self.zoom),
            offset_x: finite_or_zero(self.offset_x),
            offset_y: finite_or_zero(self.offset_y),
        }
    }
}
