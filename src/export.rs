//! Import and export of diagrams.
//!
//! Two export formats: the diagram JSON (lossless, re-importable) and a
//! C#-flavoured stub listing every class with its members. Import accepts
//! the JSON format and repairs what the editor would never produce itself.

use std::fmt::Write as _;

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::warn;

use canvas::doc::{DEFAULT_CATEGORIES, Diagram};

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;

pub const JSON_EXTENSION: &str = "json";
pub const CODE_EXTENSION: &str = "cs";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid diagram json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not format stub code")]
    Format(#[from] std::fmt::Error),
    #[error("could not format date: {0}")]
    Date(#[from] time::error::Format),
}

/// What an import had to repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub dropped_classes: usize,
    pub dropped_connections: usize,
}

/// Pretty-printed diagram JSON.
///
/// # Errors
///
/// [`ExportError::Json`] if serialization fails.
pub fn to_json(diagram: &Diagram) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(diagram)?)
}

/// Parse and validate diagram JSON.
///
/// The camera is clamped into range, repeated class ids keep their first
/// occurrence, an empty category list is replaced by the defaults, and
/// connections that are dangling, self loops, or repeat a joined pair are
/// dropped.
///
/// # Errors
///
/// [`ExportError::Json`] when the input is not a diagram.
pub fn from_json(json: &str) -> Result<(Diagram, ImportReport), ExportError> {
    let mut diagram: Diagram = serde_json::from_str(json)?;
    diagram.camera = diagram.camera.sanitized();

    let before = diagram.classes.len();
    let mut seen = std::collections::HashSet::new();
    diagram.classes.retain(|class| seen.insert(class.id.clone()));
    let dropped_classes = before - diagram.classes.len();

    if diagram.categories.is_empty() {
        diagram.categories = DEFAULT_CATEGORIES.iter().map(|c| (*c).to_string()).collect();
    }

    let dropped_connections = diagram.prune_connections();
    let report = ImportReport { dropped_classes, dropped_connections };
    if report != ImportReport::default() {
        warn!(diagram_id = %diagram.id, dropped_classes, dropped_connections, "imported diagram repaired");
    }
    Ok((diagram, report))
}

/// Stub source listing every class, its properties, and empty method bodies.
///
/// # Errors
///
/// [`ExportError::Date`] if a timestamp cannot be formatted.
pub fn stub_code(diagram: &Diagram) -> Result<String, ExportError> {
    let mut code = String::new();
    writeln!(code, "// Generated Game Architecture: {}", diagram.name)?;
    writeln!(code, "// Created: {}", format_date(diagram.created_at)?)?;
    writeln!(code, "// Last Modified: {}", format_date(diagram.last_modified)?)?;
    code.push('\n');

    for class in &diagram.classes {
        writeln!(code, "class {} {{", class.name)?;
        if !class.properties.is_empty() {
            code.push_str("  // Properties\n");
            for prop in &class.properties {
                writeln!(code, "  {} {} {};", prop.access.as_str(), prop.ty, prop.name)?;
            }
            code.push('\n');
        }
        if !class.methods.is_empty() {
            code.push_str("  // Methods\n");
            for method in &class.methods {
                writeln!(
                    code,
                    "  {} {} {}({}) {{\n    // TODO: Implement\n  }}\n",
                    method.access.as_str(),
                    method.return_type,
                    method.name,
                    method.params
                )?;
            }
        }
        code.push_str("}\n\n");
    }
    Ok(code)
}

/// `"My Game!"` + `"cs"` -> `"My_Game__architecture.cs"`.
#[must_use]
pub fn export_file_name(name: &str, extension: &str) -> String {
    let stem: String = name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
    format!("{stem}_architecture.{extension}")
}

fn format_date(at: OffsetDateTime) -> Result<String, ExportError> {
    Ok(at.format(format_description!("[year]-[month]-[day]"))?)
}
