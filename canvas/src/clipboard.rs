//! Single-slot class clipboard.

#[cfg(test)]
#[path = "clipboard_test.rs"]
mod clipboard_test;

use crate::camera::{Camera, Point};
use crate::consts::{SPAWN_SCREEN_X, SPAWN_SCREEN_Y};
use crate::doc::{ClassNode, new_id};

#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    slot: Option<ClassNode>,
}

impl Clipboard {
    /// Store a copy of `node`, replacing whatever was held.
    pub fn copy(&mut self, node: &ClassNode) {
        self.slot = Some(node.clone());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&ClassNode> {
        self.slot.as_ref()
    }

    /// Build an independent copy of the held class: fresh id, `_copy` name
    /// suffix, placed at the world point under the spawn point on screen.
    #[must_use]
    pub fn paste(&self, camera: &Camera) -> Option<ClassNode> {
        let source = self.slot.as_ref()?;
        let mut node = source.clone();
        node.id = new_id();
        node.name = format!("{}_copy", source.name);
        node.position = spawn_point(camera);
        Some(node)
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

/// World point under the screen spawn point, where new classes appear.
#[must_use]
pub fn spawn_point(camera: &Camera) -> Point {
    camera.screen_to_world(Point::new(SPAWN_SCREEN_X, SPAWN_SCREEN_Y))
}
