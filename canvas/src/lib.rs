//! Canvas geometry and interaction engine for the architecture sketcher.
//!
//! This crate compiles to WebAssembly and runs in the browser, but everything
//! except [`engine::Engine`] and [`render`] is plain Rust and tested natively.
//! It owns the camera (pan/zoom), the diagram document model, node sizing,
//! hit-testing, edge routing, and the gesture state machine. The host layer
//! wires DOM events into the engine and persists the committed
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Diagram document: classes, connections, sparse patches |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`size`] | Measured and estimated class box sizes |
//! | [`hit`] | Hit-testing and box selection |
//! | [`route`] | Connection anchors and Bézier routing |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`clipboard`] | Copy/paste of a single class |
//! | [`render`] | Canvas2D scene rendering |
//! | [`consts`] | Shared numeric constants (zoom limits, box metrics, etc.) |

pub mod camera;
pub mod clipboard;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod hit;
pub mod input;
pub mod render;
pub mod route;
pub mod size;
