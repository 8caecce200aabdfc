//! Edge routing: where a connection leaves and enters a class box, and the
//! cubic Bézier drawn between them.
//!
//! Anchors sit at the midpoint of the side facing the other box. Control
//! points are pushed outward along that side's normal so every curve leaves
//! and enters perpendicular to the border. The push distance scales with the
//! Manhattan distance between the anchors, with a floor so short edges still
//! bend.
//!
//! Geometry is computed in world space and transformed to screen space at the
//! end; the returned routes are in screen pixels.

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

use crate::camera::{Camera, Point};
use crate::consts::{CONTROL_SCALE, MIN_CONTROL_OFFSET};
use crate::doc::ConnectionKind;
use crate::hit::Rect;

/// A side of a class box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    /// Outward unit normal.
    #[must_use]
    pub fn normal(self) -> Point {
        match self {
            Self::Left => Point::new(-1.0, 0.0),
            Self::Right => Point::new(1.0, 0.0),
            Self::Top => Point::new(0.0, -1.0),
            Self::Bottom => Point::new(0.0, 1.0),
        }
    }
}

/// Side of a box centred at `center` that faces `toward`.
///
/// Horizontal when `|dx| > |dy|`, vertical otherwise (ties go vertical).
#[must_use]
pub fn exit_side(center: Point, toward: Point) -> Side {
    let dx = toward.x - center.x;
    let dy = toward.y - center.y;
    if dx.abs() > dy.abs() {
        if dx > 0.0 { Side::Right } else { Side::Left }
    } else if dy > 0.0 {
        Side::Bottom
    } else {
        Side::Top
    }
}

/// Midpoint of `side` on `rect`.
#[must_use]
pub fn anchor_on(rect: Rect, side: Side) -> Point {
    let c = rect.center();
    match side {
        Side::Left => Point::new(rect.x, c.y),
        Side::Right => Point::new(rect.right(), c.y),
        Side::Top => Point::new(c.x, rect.y),
        Side::Bottom => Point::new(c.x, rect.bottom()),
    }
}

/// Anchor on `rect` facing `toward`, plus the side it sits on.
#[must_use]
pub fn exit_point(rect: Rect, toward: Point) -> (Point, Side) {
    let side = exit_side(rect.center(), toward);
    (anchor_on(rect, side), side)
}

/// A cubic Bézier in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeRoute {
    pub start: Point,
    pub c1: Point,
    pub c2: Point,
    pub end: Point,
}

impl EdgeRoute {
    /// Point on the curve at parameter `t` in `[0, 1]`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let a = u * u * u;
        let b = 3.0 * u * u * t;
        let c = 3.0 * u * t * t;
        let d = t * t * t;
        Point::new(
            a * self.start.x + b * self.c1.x + c * self.c2.x + d * self.end.x,
            a * self.start.y + b * self.c1.y + c * self.c2.y + d * self.end.y,
        )
    }

    /// SVG path data, `M x y C x y, x y, x y`.
    #[must_use]
    pub fn svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x, self.start.y, self.c1.x, self.c1.y, self.c2.x, self.c2.y, self.end.x, self.end.y
        )
    }
}

/// Route a connection between two world-space boxes.
#[must_use]
pub fn route_between(from: Rect, to: Rect, camera: &Camera) -> EdgeRoute {
    let (start, from_side) = exit_point(from, to.center());
    let (end, to_side) = exit_point(to, from.center());

    let manhattan = (end.x - start.x).abs() + (end.y - start.y).abs();
    let push = (manhattan * CONTROL_SCALE).max(MIN_CONTROL_OFFSET);
    let offset = |n: Point| Point::new(n.x * push, n.y * push);

    let c1 = start + offset(from_side.normal());
    let c2 = end + offset(to_side.normal());

    EdgeRoute {
        start: camera.world_to_screen(start),
        c1: camera.world_to_screen(c1),
        c2: camera.world_to_screen(c2),
        end: camera.world_to_screen(end),
    }
}

/// Straight preview segment in screen space, `M x y L x y`.
#[must_use]
pub fn preview_path(from_world: Point, to_world: Point, camera: &Camera) -> String {
    let a = camera.world_to_screen(from_world);
    let b = camera.world_to_screen(to_world);
    format!("M {} {} L {} {}", a.x, a.y, b.x, b.y)
}

/// Stroke style for a connection kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub color: &'static str,
    pub width: f64,
    pub dash: &'static [f64],
}

#[must_use]
pub fn edge_style(kind: ConnectionKind) -> EdgeStyle {
    match kind {
        ConnectionKind::Uses => EdgeStyle { color: "#3b82f6", width: 2.0, dash: &[] },
        ConnectionKind::Extends => EdgeStyle { color: "#10b981", width: 2.5, dash: &[] },
        ConnectionKind::Contains => EdgeStyle { color: "#f59e0b", width: 2.0, dash: &[] },
        ConnectionKind::Creates => EdgeStyle { color: "#8b5cf6", width: 2.0, dash: &[5.0, 3.0] },
        ConnectionKind::Related => EdgeStyle { color: "#6b7280", width: 2.0, dash: &[] },
    }
}
