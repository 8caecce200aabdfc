//! The set of diagrams a user is working on, with one of them current.
//!
//! A workspace never becomes empty: deleting the last diagram is refused and
//! hydrating from an empty store yields a fresh default diagram.

use time::OffsetDateTime;
use tracing::{debug, info};

use canvas::doc::{Diagram, DiagramPatch, ObjectId, new_id};

#[cfg(test)]
#[path = "workspace_test.rs"]
mod tests;

pub const DEFAULT_DIAGRAM_NAME: &str = "New Architecture";
pub const COPY_SUFFIX: &str = " (copy)";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("diagram name must not be blank")]
    BlankName,
    #[error("diagram not found: {0}")]
    NotFound(ObjectId),
    #[error("cannot delete the last diagram")]
    LastDiagram,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    diagrams: Vec<Diagram>,
    current: ObjectId,
}

impl Workspace {
    /// A workspace holding one empty default diagram.
    #[must_use]
    pub fn new(now: OffsetDateTime) -> Self {
        let first = Diagram::new(DEFAULT_DIAGRAM_NAME, now);
        Self { current: first.id.clone(), diagrams: vec![first] }
    }

    /// Build from loaded diagrams; the first one becomes current.
    #[must_use]
    pub fn from_diagrams(diagrams: Vec<Diagram>, now: OffsetDateTime) -> Self {
        let mut workspace = Self::new(now);
        workspace.replace_all(diagrams, now);
        workspace
    }

    #[must_use]
    pub fn diagrams(&self) -> &[Diagram] {
        &self.diagrams
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagrams.len()
    }

    /// Never true: a workspace always holds a diagram.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagrams.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Diagram> {
        self.diagrams.iter().find(|d| d.id == id)
    }

    #[must_use]
    pub fn current_id(&self) -> &str {
        &self.current
    }

    /// The current diagram. Falls back to the first one if the current id
    /// went stale.
    #[must_use]
    pub fn current(&self) -> &Diagram {
        let index = self.index_of(&self.current).unwrap_or(0);
        &self.diagrams[index]
    }

    /// Create an empty diagram and make it current.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::BlankName`] when `name` is blank.
    pub fn create(&mut self, name: &str, now: OffsetDateTime) -> Result<&Diagram, WorkspaceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::BlankName);
        }
        let diagram = Diagram::new(name, now);
        info!(diagram_id = %diagram.id, name, "diagram created");
        Ok(self.insert(diagram))
    }

    /// Add (or replace by id) a diagram and make it current.
    pub fn insert(&mut self, diagram: Diagram) -> &Diagram {
        self.current.clone_from(&diagram.id);
        let index = match self.index_of(&diagram.id) {
            Some(index) => {
                self.diagrams[index] = diagram;
                index
            }
            None => {
                self.diagrams.push(diagram);
                self.diagrams.len() - 1
            }
        };
        &self.diagrams[index]
    }

    /// Remove a diagram. When it was current, the first remaining one
    /// becomes current.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::LastDiagram`] when it is the only diagram, or
    /// [`WorkspaceError::NotFound`].
    pub fn delete(&mut self, id: &str) -> Result<Diagram, WorkspaceError> {
        let index = self.index_of(id).ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
        if self.diagrams.len() <= 1 {
            return Err(WorkspaceError::LastDiagram);
        }
        let removed = self.diagrams.remove(index);
        if self.current == id {
            self.current.clone_from(&self.diagrams[0].id);
        }
        info!(diagram_id = %id, "diagram deleted");
        Ok(removed)
    }

    /// Copy a diagram under a fresh id with ` (copy)` appended to its name.
    /// The current diagram does not change.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::NotFound`].
    pub fn duplicate(&mut self, id: &str, now: OffsetDateTime) -> Result<&Diagram, WorkspaceError> {
        let source = self.get(id).ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
        let copy = Diagram {
            id: new_id(),
            name: format!("{}{COPY_SUFFIX}", source.name),
            created_at: now,
            last_modified: now,
            ..source.clone()
        };
        info!(source_id = %id, diagram_id = %copy.id, "diagram duplicated");
        self.diagrams.push(copy);
        Ok(&self.diagrams[self.diagrams.len() - 1])
    }

    /// # Errors
    ///
    /// [`WorkspaceError::BlankName`] or [`WorkspaceError::NotFound`].
    pub fn rename(&mut self, id: &str, name: &str, now: OffsetDateTime) -> Result<(), WorkspaceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::BlankName);
        }
        let diagram = self.get_mut(id).ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
        diagram.name = name.to_string();
        diagram.last_modified = now;
        Ok(())
    }

    /// # Errors
    ///
    /// [`WorkspaceError::NotFound`].
    pub fn switch_to(&mut self, id: &str) -> Result<&Diagram, WorkspaceError> {
        let index = self.index_of(id).ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
        self.current = id.to_string();
        debug!(diagram_id = %id, "switched diagram");
        Ok(&self.diagrams[index])
    }

    /// Apply a sparse update to the current diagram and bump its
    /// `last_modified`. Returns false for an empty patch.
    pub fn update_current(&mut self, patch: &DiagramPatch, now: OffsetDateTime) -> bool {
        if patch.is_empty() {
            return false;
        }
        let index = self.index_of(&self.current).unwrap_or(0);
        let diagram = &mut self.diagrams[index];
        diagram.apply_patch(patch);
        diagram.last_modified = now;
        true
    }

    /// Replace every diagram, e.g. after loading from the store. The current
    /// diagram is kept when it is still present; otherwise the first one
    /// becomes current. An empty list yields one fresh default diagram.
    pub fn replace_all(&mut self, diagrams: Vec<Diagram>, now: OffsetDateTime) {
        self.diagrams = diagrams;
        if self.diagrams.is_empty() {
            self.diagrams.push(Diagram::new(DEFAULT_DIAGRAM_NAME, now));
        }
        if self.index_of(&self.current).is_none() {
            self.current.clone_from(&self.diagrams[0].id);
        }
    }

    /// Take a diagram pushed by the store. Last write wins: an incoming copy
    /// that is not newer than the local one is ignored.
    ///
    /// Returns true when the workspace changed.
    pub fn merge_remote(&mut self, incoming: Diagram) -> bool {
        match self.index_of(&incoming.id) {
            Some(index) if incoming.last_modified <= self.diagrams[index].last_modified => false,
            Some(index) => {
                self.diagrams[index] = incoming;
                true
            }
            None => {
                self.diagrams.push(incoming);
                true
            }
        }
    }

    /// Drop a diagram deleted elsewhere. The last diagram is kept.
    pub fn remove_remote(&mut self, id: &str) -> bool {
        self.delete(id).is_ok()
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Diagram> {
        self.diagrams.iter_mut().find(|d| d.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.diagrams.iter().position(|d| d.id == id)
    }
}
