//! Application layer for the architecture sketcher.
//!
//! The [`canvas`] crate owns geometry and interaction. This crate owns
//! everything around it: the set of diagrams a user works on, category and
//! template management, import/export, the document store and auth
//! collaborators, and the write-coalescing sync queue that keeps local edits
//! flowing to the store without blocking the UI.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`editor`] | Glue between engine actions, the workspace and sync |
//! | [`workspace`] | Ordered diagram list with a current diagram |
//! | [`categories`] | Adding and removing class categories |
//! | [`templates`] | Built-in architecture templates |
//! | [`export`] | JSON and stub-code export, JSON import |
//! | [`store`] | Document store trait plus memory and file backends |
//! | [`auth`] | Signed-in user and persistence mode |
//! | [`sync`] | Debounced background writes with retry |
//! | [`config`] | Environment-driven settings |

pub mod auth;
pub mod categories;
pub mod config;
pub mod editor;
pub mod export;
pub mod store;
pub mod sync;
pub mod templates;
pub mod workspace;

pub use canvas;
