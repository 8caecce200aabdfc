//! Built-in architecture templates.
//!
//! Each template is a small diagram fragment shipped as JSON under
//! `templates/` and embedded at compile time. Applying one appends fresh
//! copies of its classes to a diagram, laid out next to what is already
//! there, with connections rewired to the new ids.

use serde::{Deserialize, Serialize};
use tracing::debug;

use canvas::camera::Point;
use canvas::doc::{ClassNode, Connection, ConnectionKind, DEFAULT_CATEGORIES, Diagram, DiagramPatch, Method, ObjectId, Property, new_id};

#[cfg(test)]
#[path = "templates_test.rs"]
mod tests;

/// Horizontal step between successive template placements.
const OFFSET_STEP_X: f64 = 300.0;
/// Vertical step per row of three placements.
const OFFSET_STEP_Y: f64 = 200.0;
const OFFSET_COLUMNS: usize = 3;

const BUILTIN_SOURCES: [(&str, &str); 6] = [
    ("mvc", include_str!("../templates/mvc.json")),
    ("mvvm", include_str!("../templates/mvvm.json")),
    ("ecs", include_str!("../templates/ecs.json")),
    ("statemachine", include_str!("../templates/statemachine.json")),
    ("observer", include_str!("../templates/observer.json")),
    ("command", include_str!("../templates/command.json")),
];

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template: {0}")]
    Unknown(String),
    #[error("template {key} is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub classes: Vec<TemplateClass>,
    #[serde(default)]
    pub connections: Vec<TemplateConnection>,
}

/// A class in a template. `id` is local to the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateClass {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub position: Point,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConnection {
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default)]
    pub kind: ConnectionKind,
    #[serde(default)]
    pub label: String,
}

/// Keys of the built-in templates, in menu order.
#[must_use]
pub fn builtin_keys() -> Vec<&'static str> {
    BUILTIN_SOURCES.iter().map(|(key, _)| *key).collect()
}

/// Parse every built-in template.
///
/// # Errors
///
/// [`TemplateError::Malformed`] if an embedded asset does not parse.
pub fn builtin() -> Result<Vec<Template>, TemplateError> {
    BUILTIN_SOURCES.iter().map(|(key, json)| parse(key, json)).collect()
}

/// Parse one built-in template by key.
///
/// # Errors
///
/// [`TemplateError::Unknown`] or [`TemplateError::Malformed`].
pub fn find(key: &str) -> Result<Template, TemplateError> {
    let (key, json) =
        BUILTIN_SOURCES.iter().find(|(k, _)| *k == key).ok_or_else(|| TemplateError::Unknown(key.to_string()))?;
    parse(key, json)
}

/// Parse a template from JSON, e.g. a user-supplied file.
///
/// # Errors
///
/// [`TemplateError::Malformed`].
pub fn parse(key: &str, json: &str) -> Result<Template, TemplateError> {
    serde_json::from_str(json).map_err(|source| TemplateError::Malformed { key: key.to_string(), source })
}

/// Top-left offset for a template applied to a diagram that already holds
/// `existing` classes: three placements per row.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn placement_offset(existing: usize) -> Point {
    Point::new(
        (existing % OFFSET_COLUMNS) as f64 * OFFSET_STEP_X,
        (existing / OFFSET_COLUMNS) as f64 * OFFSET_STEP_Y,
    )
}

/// Compute the patch that appends `template` to `diagram`.
///
/// Classes get fresh ids and are shifted by [`placement_offset`].
/// Connections are remapped to the new ids; ones naming classes the template
/// does not define, self loops, and pairs already joined are skipped. Every
/// category the new classes use is added to the diagram's list.
#[must_use]
pub fn apply_template(diagram: &Diagram, template: &Template) -> DiagramPatch {
    let offset = placement_offset(diagram.classes.len());
    let mut classes = diagram.classes.clone();
    let mut connections = diagram.connections.clone();
    let mut categories = diagram.categories.clone();
    let mut id_map: Vec<(&str, ObjectId)> = Vec::with_capacity(template.classes.len());

    for class in &template.classes {
        let category = if class.category.trim().is_empty() {
            DEFAULT_CATEGORIES[0].to_string()
        } else {
            class.category.clone()
        };
        if !categories.contains(&category) {
            categories.push(category.clone());
        }
        let mut node = ClassNode::new(class.name.clone(), category, class.position + offset);
        node.properties.clone_from(&class.properties);
        node.methods.clone_from(&class.methods);
        id_map.push((class.id.as_str(), node.id.clone()));
        classes.push(node);
    }

    let lookup = |template_id: &str| id_map.iter().find(|(local, _)| *local == template_id).map(|(_, id)| id.clone());
    let mut skipped = 0_usize;
    for link in &template.connections {
        let (Some(from), Some(to)) = (lookup(&link.from), lookup(&link.to)) else {
            skipped += 1;
            continue;
        };
        if from == to || connections.iter().any(|c| c.joins(&from, &to)) {
            skipped += 1;
            continue;
        }
        connections.push(Connection { id: new_id(), from, to, kind: link.kind, label: link.label.clone() });
    }

    debug!(template = %template.key, classes = template.classes.len(), skipped, "template applied");
    DiagramPatch {
        classes: Some(classes),
        connections: Some(connections),
        categories: Some(categories),
        ..DiagramPatch::default()
    }
}
