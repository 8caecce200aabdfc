//! Node sizing.
//!
//! Class boxes have no stored size: the host lays them out, so the true size
//! is whatever was last measured. Until a box has been measured its size is
//! estimated from its member counts. [`NodeSizes`] combines both, preferring a
//! measurement.

#[cfg(test)]
#[path = "size_test.rs"]
mod size_test;

use std::collections::HashMap;

use crate::consts::{
    NODE_HEADER_HEIGHT, NODE_LINE_HEIGHT, NODE_METHODS_PADDING, NODE_MIN_HEIGHT, NODE_PROPERTIES_PADDING,
    NODE_SECTION_HEADER_HEIGHT, NODE_VISIBLE_MEMBERS, NODE_WIDTH,
};
use crate::doc::{ClassNode, ObjectId};
use crate::hit::Rect;

/// Width and height in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions finite and strictly positive.
    #[must_use]
    pub fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Something that can tell how big a class box is, in world units.
pub trait NodeSizeProvider {
    /// Size of `node`, or `None` when this provider has no answer.
    fn node_size(&self, node: &ClassNode) -> Option<Size>;
}

/// Content-based estimate. Always answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedSize;

impl EstimatedSize {
    #[must_use]
    pub fn estimate(node: &ClassNode) -> Size {
        let mut height = NODE_HEADER_HEIGHT;
        height += section_height(node.properties.len(), NODE_PROPERTIES_PADDING);
        height += section_height(node.methods.len(), NODE_METHODS_PADDING);
        Size::new(NODE_WIDTH, height.max(NODE_MIN_HEIGHT))
    }
}

#[allow(clippy::cast_precision_loss)]
fn section_height(count: usize, padding: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let visible = count.min(NODE_VISIBLE_MEMBERS) as f64;
    let overflow = if count > NODE_VISIBLE_MEMBERS { NODE_LINE_HEIGHT } else { 0.0 };
    NODE_SECTION_HEADER_HEIGHT + visible * NODE_LINE_HEIGHT + overflow + padding
}

impl NodeSizeProvider for EstimatedSize {
    fn node_size(&self, node: &ClassNode) -> Option<Size> {
        Some(Self::estimate(node))
    }
}

/// Sizes reported by the host after layout.
#[derive(Debug, Clone, Default)]
pub struct MeasuredSizes {
    sizes: HashMap<ObjectId, Size>,
}

impl MeasuredSizes {
    /// Record a box measured on screen at `zoom`. Stored in world units.
    ///
    /// Non-positive or non-finite measurements clear any previous record so
    /// the estimate takes over again.
    pub fn record_screen(&mut self, id: &str, width: f64, height: f64, zoom: f64) {
        let zoom = crate::camera::clamp_zoom(zoom);
        let size = Size::new(width / zoom, height / zoom);
        if size.is_usable() {
            self.sizes.insert(id.to_string(), size);
        } else {
            self.sizes.remove(id);
        }
    }

    pub fn forget(&mut self, id: &str) {
        self.sizes.remove(id);
    }

    pub fn clear(&mut self) {
        self.sizes.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl NodeSizeProvider for MeasuredSizes {
    fn node_size(&self, node: &ClassNode) -> Option<Size> {
        self.sizes.get(&node.id).copied()
    }
}

/// Measured size when available, estimate otherwise.
#[derive(Debug, Clone, Default)]
pub struct NodeSizes {
    pub measured: MeasuredSizes,
    estimated: EstimatedSize,
}

impl NodeSizes {
    #[must_use]
    pub fn size_of(&self, node: &ClassNode) -> Size {
        self.node_size(node).unwrap_or_else(|| EstimatedSize::estimate(node))
    }

    /// World-space bounding box of `node`.
    #[must_use]
    pub fn bounds(&self, node: &ClassNode) -> Rect {
        let size = self.size_of(node);
        Rect::new(node.position.x, node.position.y, size.width, size.height)
    }
}

impl NodeSizeProvider for NodeSizes {
    fn node_size(&self, node: &ClassNode) -> Option<Size> {
        self.measured.node_size(node).or_else(|| self.estimated.node_size(node))
    }
}
