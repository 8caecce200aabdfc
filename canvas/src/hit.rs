//! Hit-testing: which class box is under a point, which boxes a selection
//! rectangle touches, and which connection curve passes near the pointer.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use std::collections::BTreeSet;

use crate::camera::{Camera, Point};
use crate::consts::{CURVE_SAMPLES, EDGE_HIT_SLOP_PX};
use crate::doc::{ClassNode, Connection, Diagram, ObjectId};
use crate::route::{EdgeRoute, route_between};
use crate::size::NodeSizes;

/// Axis-aligned rectangle with non-negative width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanned by two corners in any drag direction.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Zero width or zero height.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Separating-axis overlap test. Touching edges do not count.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() && self.right() > other.x && self.y < other.bottom() && self.bottom() > other.y
    }

    /// Whether `pt` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }

    /// Map a world-space rectangle to screen space.
    #[must_use]
    pub fn to_screen(&self, camera: &Camera) -> Rect {
        let origin = camera.world_to_screen(Point::new(self.x, self.y));
        Rect::new(origin.x, origin.y, self.width * camera.zoom, self.height * camera.zoom)
    }
}

/// Topmost class under `world_pt`. Later classes draw on top.
#[must_use]
pub fn node_at<'a>(doc: &'a Diagram, sizes: &NodeSizes, world_pt: Point) -> Option<&'a ClassNode> {
    doc.classes.iter().rev().find(|node| sizes.bounds(node).contains(world_pt))
}

/// Ids of every class whose screen-space box intersects `screen_rect`.
///
/// A zero-area rectangle selects nothing.
#[must_use]
pub fn select_in_rect(doc: &Diagram, sizes: &NodeSizes, camera: &Camera, screen_rect: Rect) -> BTreeSet<ObjectId> {
    if screen_rect.is_empty() {
        return BTreeSet::new();
    }
    doc.classes
        .iter()
        .filter(|node| sizes.bounds(node).to_screen(camera).intersects(&screen_rect))
        .map(|node| node.id.clone())
        .collect()
}

/// Screen-space route of every connection whose endpoints both exist.
pub fn routes<'a>(
    doc: &'a Diagram,
    sizes: &'a NodeSizes,
    camera: &'a Camera,
) -> impl Iterator<Item = (&'a Connection, EdgeRoute)> + 'a {
    doc.connections.iter().filter_map(move |conn| {
        let from = doc.node(&conn.from)?;
        let to = doc.node(&conn.to)?;
        Some((conn, route_between(sizes.bounds(from), sizes.bounds(to), camera)))
    })
}

/// Nearest connection whose curve passes within the hit slop of `screen_pt`.
#[must_use]
pub fn connection_at(doc: &Diagram, sizes: &NodeSizes, camera: &Camera, screen_pt: Point) -> Option<ObjectId> {
    routes(doc, sizes, camera)
        .map(|(conn, route)| (conn, distance_to_curve(&route, screen_pt)))
        .filter(|(_, dist)| *dist <= EDGE_HIT_SLOP_PX)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(conn, _)| conn.id.clone())
}

/// Approximate distance from `pt` to a route, by sampling it as a polyline.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn distance_to_curve(route: &EdgeRoute, pt: Point) -> f64 {
    let mut best = f64::INFINITY;
    let mut prev = route.start;
    for i in 1..=CURVE_SAMPLES {
        let next = route.point_at(i as f64 / CURVE_SAMPLES as f64);
        best = best.min(distance_to_segment(pt, prev, next));
        prev = next;
    }
    best
}

fn distance_to_segment(pt: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f64::EPSILON {
        return pt.distance(a);
    }
    let ap = pt - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    pt.distance(Point::new(a.x + ab.x * t, a.y + ab.y * t))
}
