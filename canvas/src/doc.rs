//! Document model: diagrams, class nodes, connections, and sparse updates.
//!
//! This module defines what is on the canvas (`Diagram`, `ClassNode`,
//! `Connection`), a sparse-update type for incremental edits
//! (`DiagramPatch`), and the graph invariants the rest of the crate relies
//! on: a connection always references two distinct existing classes, and at
//! most one connection exists per unordered pair of classes.
//!
//! The serde shape of `Diagram` is the export/import JSON format and the
//! document shape handed to the persistence layer.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::camera::{Camera, Point};

/// Unique identifier for a class, connection, or diagram.
///
/// Ids are opaque strings: generated ids are UUIDs, imported documents may
/// carry anything.
pub type ObjectId = String;

/// Generate a fresh random id.
#[must_use]
pub fn new_id() -> ObjectId {
    Uuid::new_v4().to_string()
}

/// Categories every new diagram starts with.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Gameplay", "System", "UI", "Data", "Network"];

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Public,
    #[default]
    Private,
    Protected,
}

impl Access {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
        }
    }
}

/// A field declared on a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub access: Access,
}

impl Default for Property {
    fn default() -> Self {
        Self { name: "newProperty".into(), ty: "int".into(), access: Access::Private }
    }
}

/// A method declared on a class. `params` is free text, e.g. `"dt: float"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub params: String,
    pub return_type: String,
    #[serde(default = "public_access")]
    pub access: Access,
}

fn public_access() -> Access {
    Access::Public
}

impl Default for Method {
    fn default() -> Self {
        Self { name: "newMethod".into(), params: String::new(), return_type: "void".into(), access: Access::Public }
    }
}

/// A class box on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    pub id: ObjectId,
    pub name: String,
    /// Category name; one of the diagram's `categories` under normal editing.
    #[serde(rename = "type")]
    pub category: String,
    /// Top-left corner in world coordinates.
    pub position: Point,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub methods: Vec<Method>,
}

impl ClassNode {
    /// Create an empty class with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>, position: Point) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            category: category.into(),
            position,
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Append a default property and return its index.
    pub fn add_property(&mut self) -> usize {
        self.properties.push(Property::default());
        self.properties.len() - 1
    }

    /// Append a default method and return its index.
    pub fn add_method(&mut self) -> usize {
        self.methods.push(Method::default());
        self.methods.len() - 1
    }

    /// Replace the property at `index`. Returns false when out of range.
    pub fn set_property(&mut self, index: usize, property: Property) -> bool {
        match self.properties.get_mut(index) {
            Some(slot) => {
                *slot = property;
                true
            }
            None => false,
        }
    }

    /// Replace the method at `index`. Returns false when out of range.
    pub fn set_method(&mut self, index: usize, method: Method) -> bool {
        match self.methods.get_mut(index) {
            Some(slot) => {
                *slot = method;
                true
            }
            None => false,
        }
    }

    /// Remove the property at `index`, if present.
    pub fn remove_property(&mut self, index: usize) -> Option<Property> {
        (index < self.properties.len()).then(|| self.properties.remove(index))
    }

    /// Remove the method at `index`, if present.
    pub fn remove_method(&mut self, index: usize) -> Option<Method> {
        (index < self.methods.len()).then(|| self.methods.remove(index))
    }
}

/// Relationship type of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Uses,
    Extends,
    Contains,
    Creates,
    #[default]
    Related,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 5] = [Self::Uses, Self::Extends, Self::Contains, Self::Creates, Self::Related];

    /// Wire name, as used in the JSON format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uses => "uses",
            Self::Extends => "extends",
            Self::Contains => "contains",
            Self::Creates => "creates",
            Self::Related => "related",
        }
    }

    /// Human-readable verb shown next to a connection.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Uses => "uses",
            Self::Extends => "extends",
            Self::Contains => "contains",
            Self::Creates => "creates",
            Self::Related => "related to",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

/// A typed relationship between two classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ObjectId,
    pub from: ObjectId,
    pub to: ObjectId,
    #[serde(rename = "type", default)]
    pub kind: ConnectionKind,
    #[serde(default)]
    pub label: String,
}

impl Connection {
    /// Whether this connection joins `a` and `b`, in either direction.
    #[must_use]
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// Whether either endpoint is `id`.
    #[must_use]
    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to == id
    }
}

/// Why a connection was not created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectRejection {
    /// Source and target are the same class.
    SelfLoop,
    /// One of the endpoints does not exist.
    MissingEndpoint,
    /// A connection between the unordered pair already exists.
    Duplicate,
}

/// A whole diagram document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub classes: Vec<ClassNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub camera: Camera,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| (*c).to_string()).collect()
}

/// Sparse update for a diagram. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Connection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<Camera>,
}

impl DiagramPatch {
    /// A patch that overwrites every content field with `diagram`'s.
    #[must_use]
    pub fn full(diagram: &Diagram) -> Self {
        Self {
            name: Some(diagram.name.clone()),
            classes: Some(diagram.classes.clone()),
            connections: Some(diagram.connections.clone()),
            categories: Some(diagram.categories.clone()),
            camera: Some(diagram.camera),
        }
    }

    /// A patch carrying only a camera.
    #[must_use]
    pub fn camera(camera: Camera) -> Self {
        Self { camera: Some(camera), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.classes.is_none()
            && self.connections.is_none()
            && self.categories.is_none()
            && self.camera.is_none()
    }
}

impl Diagram {
    /// Create an empty diagram with the default categories.
    #[must_use]
    pub fn new(name: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            classes: Vec::new(),
            connections: Vec::new(),
            categories: default_categories(),
            camera: Camera::default(),
            created_at: now,
            last_modified: now,
        }
    }

    /// Look up a class by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ClassNode> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Mutable lookup of a class by id.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut ClassNode> {
        self.classes.iter_mut().find(|c| c.id == id)
    }

    /// Look up a connection by id.
    #[must_use]
    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Append a class. A class with the same id is replaced in place.
    pub fn add_class(&mut self, node: ClassNode) {
        if let Some(existing) = self.node_mut(&node.id) {
            *existing = node;
        } else {
            self.classes.push(node);
        }
    }

    /// Remove a class and every connection referencing it.
    ///
    /// Returns the removed class together with the ids of the cascaded
    /// connections, or `None` when the class does not exist.
    pub fn remove_class(&mut self, id: &str) -> Option<(ClassNode, Vec<ObjectId>)> {
        let index = self.classes.iter().position(|c| c.id == id)?;
        let node = self.classes.remove(index);
        let mut removed = Vec::new();
        self.connections.retain(|conn| {
            if conn.touches(id) {
                removed.push(conn.id.clone());
                false
            } else {
                true
            }
        });
        Some((node, removed))
    }

    /// Whether a connection exists between `a` and `b` in either direction.
    #[must_use]
    pub fn has_connection_between(&self, a: &str, b: &str) -> bool {
        self.connections.iter().any(|c| c.joins(a, b))
    }

    /// Create a connection from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Rejects self loops, unknown endpoints, and duplicates of the
    /// unordered pair.
    pub fn add_connection(
        &mut self,
        from: &str,
        to: &str,
        kind: ConnectionKind,
        label: impl Into<String>,
    ) -> Result<Connection, ConnectRejection> {
        if from == to {
            return Err(ConnectRejection::SelfLoop);
        }
        if self.node(from).is_none() || self.node(to).is_none() {
            return Err(ConnectRejection::MissingEndpoint);
        }
        if self.has_connection_between(from, to) {
            return Err(ConnectRejection::Duplicate);
        }
        let conn = Connection { id: new_id(), from: from.to_string(), to: to.to_string(), kind, label: label.into() };
        self.connections.push(conn.clone());
        Ok(conn)
    }

    /// Remove a connection by id.
    pub fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        let index = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(index))
    }

    /// Drop connections that break the graph invariants: dangling
    /// endpoints, self loops, and repeated unordered pairs (first one wins).
    ///
    /// Returns how many connections were dropped.
    pub fn prune_connections(&mut self) -> usize {
        let before = self.connections.len();
        let mut kept: Vec<Connection> = Vec::with_capacity(before);
        for conn in std::mem::take(&mut self.connections) {
            let valid = conn.from != conn.to
                && self.node(&conn.from).is_some()
                && self.node(&conn.to).is_some()
                && !kept.iter().any(|k| k.joins(&conn.from, &conn.to));
            if valid {
                kept.push(conn);
            }
        }
        self.connections = kept;
        before - self.connections.len()
    }

    /// Apply a sparse update. Returns true when any field was present.
    pub fn apply_patch(&mut self, patch: &DiagramPatch) -> bool {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(classes) = &patch.classes {
            self.classes.clone_from(classes);
        }
        if let Some(connections) = &patch.connections {
            self.connections.clone_from(connections);
        }
        if let Some(categories) = &patch.categories {
            self.categories.clone_from(categories);
        }
        if let Some(camera) = patch.camera {
            self.camera = camera.sanitized();
        }
        !patch.is_empty()
    }
}
