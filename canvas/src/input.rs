//! Input model: modifier keys, mouse buttons, UI state, and the gesture slot.
//!
//! `Gesture` is the single active interaction tracked between pointer-down and
//! pointer-up. Only one gesture can exist at a time, so panning, dragging,
//! box selection, and connecting are mutually exclusive by construction.
//! `ConnectState` is the two-step connect interaction; a preview line can only
//! exist once a source has been picked.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::BTreeSet;

use crate::camera::Point;
use crate::doc::{ConnectionKind, ObjectId};
use crate::route::Side;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on Windows/Linux, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (`"Delete"`, `"Escape"`, `"c"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }

    /// Case-insensitive comparison for letter shortcuts.
    #[must_use]
    pub fn is_letter(&self, letter: char) -> bool {
        let mut chars = self.0.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.eq_ignore_ascii_case(&letter))
    }

    /// Keys that hold the selection-mode modifier.
    #[must_use]
    pub fn is_command(&self) -> bool {
        self.is("Control") || self.is("Meta")
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive = scroll down.
    pub dy: f64,
}

/// State of the connect interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectState {
    /// Connect mode is on, no source picked.
    Armed,
    /// Source picked; waiting for a target click.
    AwaitingTarget {
        source: ObjectId,
        /// World-space anchor on the source border.
        exit_point: Point,
        exit_side: Side,
        /// Live pointer position in world space, drives the preview line.
        pointer: Point,
    },
}

/// The active gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    /// Dragging empty canvas, or any middle-button drag.
    Panning {
        /// Screen-space position at the previous event.
        last_screen: Point,
        /// Connect state to restore on release when the pan started in connect mode.
        resume: Option<ConnectState>,
    },
    /// Moving a single class.
    DraggingNode {
        id: ObjectId,
        /// Screen-space offset from the class's top-left to the pointer at press.
        grab_offset: Point,
        /// World position at press; an unmoved click commits nothing.
        origin: Point,
    },
    /// Moving every selected class rigidly.
    DraggingSelection {
        /// Screen-space pointer at press.
        initial_pointer: Point,
        /// World positions of the selected classes at press.
        snapshot: Vec<(ObjectId, Point)>,
    },
    /// Dragging out a selection rectangle.
    BoxSelecting {
        /// Screen-space corners.
        start: Point,
        current: Point,
    },
    /// Connect mode is on. Survives pointer-up.
    Connecting(ConnectState),
}

impl Gesture {
    /// Whether connect mode is on.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting(_) | Self::Panning { resume: Some(_), .. })
    }

    /// The connect state, including one parked under a pan.
    pub fn connect_state_mut(&mut self) -> Option<&mut ConnectState> {
        match self {
            Self::Connecting(state) | Self::Panning { resume: Some(state), .. } => Some(state),
            _ => None,
        }
    }

    /// Whether a press/move/release interaction is in progress.
    #[must_use]
    pub fn is_pointer_gesture(&self) -> bool {
        !matches!(self, Self::Idle | Self::Connecting(_))
    }
}

/// UI state visible to the renderer and the host.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// The class shown in the editor panel.
    pub active_id: Option<ObjectId>,
    /// Multi-selection, from box selection.
    pub selected_ids: BTreeSet<ObjectId>,
    /// Ctrl/Meta is held: pointer-down on empty canvas starts a box selection.
    pub selection_mode: bool,
    /// Relationship type used for the next connection.
    pub connection_kind: ConnectionKind,
    /// Connection highlighted under the pointer.
    pub hovered_connection: Option<ObjectId>,
}

impl UiState {
    /// Whether `id` belongs to a multi-selection (two or more classes).
    #[must_use]
    pub fn in_group(&self, id: &str) -> bool {
        self.selected_ids.len() > 1 && self.selected_ids.contains(id)
    }
}
