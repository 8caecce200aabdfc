//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest zoom factor the camera accepts.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom factor the camera accepts.
pub const MAX_ZOOM: f64 = 3.0;

/// Wheel step when scrolling down (zoom out).
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Wheel step when scrolling up (zoom in).
pub const WHEEL_ZOOM_IN: f64 = 1.1;

/// Toolbar "zoom in" step.
pub const BUTTON_ZOOM_IN: f64 = 1.2;

/// Toolbar "zoom out" step.
pub const BUTTON_ZOOM_OUT: f64 = 0.8;

// ── Class boxes ─────────────────────────────────────────────────

/// Rendered class box width in world units.
pub const NODE_WIDTH: f64 = 192.0;

/// Header band height (class name + category).
pub const NODE_HEADER_HEIGHT: f64 = 48.0;

/// Section title row ("Properties" / "Methods") including its padding.
pub const NODE_SECTION_HEADER_HEIGHT: f64 = 28.0;

/// One member line inside a section.
pub const NODE_LINE_HEIGHT: f64 = 20.0;

/// Bottom padding after the properties section.
pub const NODE_PROPERTIES_PADDING: f64 = 8.0;

/// Bottom padding after the methods section.
pub const NODE_METHODS_PADDING: f64 = 12.0;

/// Minimum estimated class box height.
pub const NODE_MIN_HEIGHT: f64 = 80.0;

/// Members listed per section before collapsing into an "and N more" line.
pub const NODE_VISIBLE_MEMBERS: usize = 3;

/// Screen point (CSS pixels) where new and pasted classes are placed.
pub const SPAWN_SCREEN_X: f64 = 100.0;

/// Screen point (CSS pixels) where new and pasted classes are placed.
pub const SPAWN_SCREEN_Y: f64 = 100.0;

// ── Edge routing ────────────────────────────────────────────────

/// Control-point distance as a fraction of the Manhattan distance between anchors.
pub const CONTROL_SCALE: f64 = 0.5;

/// Minimum control-point distance in world units.
pub const MIN_CONTROL_OFFSET: f64 = 30.0;

/// Line segments used when sampling a routed curve for hit-testing.
pub const CURVE_SAMPLES: usize = 32;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for connection curves.
pub const EDGE_HIT_SLOP_PX: f64 = 8.0;

// ── Rendering ───────────────────────────────────────────────────

/// Background dot grid spacing in world units.
pub const GRID_SPACING: f64 = 20.0;
