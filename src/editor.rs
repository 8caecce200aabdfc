//! Editor: binds the engine to the workspace and the sync queue.
//!
//! DESIGN
//! ======
//! The engine owns the live copy of the current diagram and reports what the
//! user did as [`Action`]s. [`Editor::dispatch`] takes those actions and, when
//! any of them is a committed document or camera change, copies the engine's
//! document into the workspace (bumping `last_modified`) and schedules a
//! write. Transient values (a node mid-drag, a pan in progress) are never
//! reported as actions, so they never reach the queue.
//!
//! Workspace-level commands (switching, creating, templates, categories,
//! import) also go through here so the engine, the workspace and the store
//! agree on what the current diagram is.
//!
//! ERROR HANDLING
//! ==============
//! Local edits never fail on persistence: sync errors surface through
//! [`SyncStatus`]. Commands that need the store up front (creating or
//! deleting a diagram while signed in) return [`EditorError`] and leave the
//! workspace untouched.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use canvas::doc::{Diagram, DiagramPatch, ObjectId, new_id};
use canvas::engine::{Action, EngineCore};

use crate::auth::{AuthProvider, PersistenceMode, User};
use crate::categories::{self, CategoryError};
use crate::config::SyncConfig;
use crate::export::{self, CODE_EXTENSION, ExportError, ImportReport, JSON_EXTENSION};
use crate::store::{DocumentStore, StoreError, StoreEvent, Subscription};
use crate::sync::{SyncHandle, SyncQueue, SyncStatus};
use crate::templates::{self, TemplateError};
use crate::workspace::{COPY_SUFFIX, Workspace, WorkspaceError};

#[cfg(test)]
#[path = "editor_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Persistence {
    store: Arc<dyn DocumentStore>,
    user: User,
    sync: SyncHandle,
}

/// A file produced by an export command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub content: String,
}

pub struct Editor {
    workspace: Workspace,
    engine: EngineCore,
    persistence: Option<Persistence>,
}

impl Editor {
    /// Editor without persistence: edits live in memory only.
    #[must_use]
    pub fn local(workspace: Workspace) -> Self {
        let engine = EngineCore::new(workspace.current().clone());
        Self { workspace, engine, persistence: None }
    }

    /// Load `user`'s diagrams from `store` and start a sync worker for them.
    /// An empty store gets one default diagram created in it.
    ///
    /// # Errors
    ///
    /// [`EditorError::Store`] if listing or creating fails.
    pub async fn with_store(
        store: Arc<dyn DocumentStore>,
        user: User,
        config: SyncConfig,
    ) -> Result<Self, EditorError> {
        let mut diagrams = store.list(&user.id).await?;
        if diagrams.is_empty() {
            let fresh = Workspace::new(now()).current().clone();
            diagrams.push(store.create(&user.id, fresh).await?);
        }
        info!(user = %user.id, diagrams = diagrams.len(), "workspace loaded");

        let workspace = Workspace::from_diagrams(diagrams, now());
        let engine = EngineCore::new(workspace.current().clone());
        let sync = SyncQueue::spawn(store.clone(), config);
        Ok(Self { workspace, engine, persistence: Some(Persistence { store, user, sync }) })
    }

    /// Pick the persistence path from the auth state: signed-in users get
    /// the store, everyone else a local in-memory workspace.
    ///
    /// # Errors
    ///
    /// See [`Editor::with_store`].
    pub async fn open(
        auth: &dyn AuthProvider,
        store: Arc<dyn DocumentStore>,
        config: SyncConfig,
    ) -> Result<Self, EditorError> {
        match auth.persistence_mode() {
            PersistenceMode::Remote(user) => Self::with_store(store, user, config).await,
            PersistenceMode::LocalOnly => Ok(Self::local(Workspace::new(now()))),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[must_use]
    pub fn engine(&self) -> &EngineCore {
        &self.engine
    }

    /// Mutable engine access for input handlers. Pass what they return to
    /// [`Editor::dispatch`].
    pub fn engine_mut(&mut self) -> &mut EngineCore {
        &mut self.engine
    }

    #[must_use]
    pub fn mode(&self) -> PersistenceMode {
        PersistenceMode::from_user(self.persistence.as_ref().map(|p| p.user.clone()))
    }

    #[must_use]
    pub fn sync_status(&self) -> Option<watch::Receiver<SyncStatus>> {
        self.persistence.as_ref().map(|p| p.sync.status())
    }

    /// Change feed for the signed-in user, when the store has one.
    #[must_use]
    pub fn subscribe(&self) -> Option<Subscription> {
        self.persistence.as_ref().and_then(|p| p.store.subscribe(&p.user.id))
    }

    // =========================================================================
    // Engine actions
    // =========================================================================

    /// Commit the engine's document when `actions` contain a committed
    /// change. Returns true when something was committed.
    pub fn dispatch(&mut self, actions: &[Action]) -> bool {
        if !actions.iter().any(is_commit) {
            return false;
        }
        let at = now();
        self.workspace.update_current(&DiagramPatch::full(&self.engine.doc), at);
        self.engine.doc.last_modified = at;
        self.schedule_current();
        true
    }

    /// Delete a connection the user clicked and then confirmed.
    pub fn confirm_delete_connection(&mut self, id: &str) -> bool {
        let actions = self.engine.delete_connection(id);
        self.dispatch(&actions)
    }

    // =========================================================================
    // Diagram commands
    // =========================================================================

    /// # Errors
    ///
    /// [`WorkspaceError::NotFound`].
    pub fn switch_diagram(&mut self, id: &str) -> Result<(), EditorError> {
        let diagram = self.workspace.switch_to(id)?.clone();
        self.engine.load_diagram(diagram);
        Ok(())
    }

    /// Create a diagram and make it current. Signed in, the store assigns
    /// its id.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::BlankName`] or a store failure.
    pub async fn create_diagram(&mut self, name: &str) -> Result<ObjectId, EditorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::BlankName.into());
        }
        let id = match &self.persistence {
            Some(p) => {
                let stored = p.store.create(&p.user.id, Diagram::new(name, now())).await?;
                self.workspace.insert(stored).id.clone()
            }
            None => self.workspace.create(name, now())?.id.clone(),
        };
        self.reload_engine();
        Ok(id)
    }

    /// # Errors
    ///
    /// [`WorkspaceError::LastDiagram`], [`WorkspaceError::NotFound`], or a
    /// store failure.
    pub async fn delete_diagram(&mut self, id: &str) -> Result<(), EditorError> {
        if self.workspace.get(id).is_none() {
            return Err(WorkspaceError::NotFound(id.to_string()).into());
        }
        if self.workspace.len() <= 1 {
            return Err(WorkspaceError::LastDiagram.into());
        }
        if let Some(p) = &self.persistence {
            p.sync.cancel(id);
            match p.store.delete(id).await {
                Ok(()) => {}
                Err(StoreError::NotFound(_)) => warn!(diagram_id = %id, "diagram already gone from store"),
                Err(e) => return Err(e.into()),
            }
        }
        let was_current = self.workspace.current_id() == id;
        self.workspace.delete(id)?;
        if was_current {
            self.reload_engine();
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`WorkspaceError::NotFound`] or a store failure.
    pub async fn duplicate_diagram(&mut self, id: &str) -> Result<ObjectId, EditorError> {
        match &self.persistence {
            Some(p) => {
                let source = self.workspace.get(id).ok_or_else(|| WorkspaceError::NotFound(id.to_string()))?;
                let copy = Diagram { name: format!("{}{COPY_SUFFIX}", source.name), ..source.clone() };
                let stored = p.store.create(&p.user.id, copy).await?;
                let new_id = stored.id.clone();
                self.workspace.merge_remote(stored);
                Ok(new_id)
            }
            None => Ok(self.workspace.duplicate(id, now())?.id.clone()),
        }
    }

    /// # Errors
    ///
    /// [`WorkspaceError::BlankName`] or [`WorkspaceError::NotFound`].
    pub fn rename_diagram(&mut self, id: &str, name: &str) -> Result<(), EditorError> {
        self.workspace.rename(id, name, now())?;
        if self.workspace.current_id() == id {
            self.engine.doc.name = self.workspace.current().name.clone();
        }
        self.schedule(id);
        Ok(())
    }

    // =========================================================================
    // Content commands on the current diagram
    // =========================================================================

    /// # Errors
    ///
    /// [`TemplateError::Unknown`] or [`TemplateError::Malformed`].
    pub fn apply_template(&mut self, key: &str) -> Result<(), EditorError> {
        let template = templates::find(key)?;
        let patch = templates::apply_template(self.workspace.current(), &template);
        self.commit_patch(&patch);
        Ok(())
    }

    /// # Errors
    ///
    /// [`CategoryError::Blank`] or [`CategoryError::Duplicate`].
    pub fn add_category(&mut self, name: &str) -> Result<(), EditorError> {
        let patch = categories::add_category(self.workspace.current(), name)?;
        self.commit_patch(&patch);
        Ok(())
    }

    /// # Errors
    ///
    /// [`CategoryError::LastCategory`] or [`CategoryError::NotFound`].
    pub fn remove_category(&mut self, name: &str) -> Result<(), EditorError> {
        let patch = categories::remove_category(self.workspace.current(), name)?;
        self.commit_patch(&patch);
        Ok(())
    }

    /// Import diagram JSON as a new diagram and make it current. The
    /// imported document always gets a fresh id.
    ///
    /// # Errors
    ///
    /// [`ExportError::Json`] or a store failure.
    pub async fn import_json(&mut self, json: &str) -> Result<ImportReport, EditorError> {
        let (mut diagram, report) = export::from_json(json)?;
        let stored = match &self.persistence {
            Some(p) => p.store.create(&p.user.id, diagram).await?,
            None => {
                let at = now();
                diagram.id = new_id();
                diagram.created_at = at;
                diagram.last_modified = at;
                diagram
            }
        };
        info!(diagram_id = %stored.id, "diagram imported");
        self.workspace.insert(stored);
        self.reload_engine();
        Ok(report)
    }

    /// # Errors
    ///
    /// [`ExportError::Json`].
    pub fn export_json(&self) -> Result<ExportedFile, EditorError> {
        let diagram = self.workspace.current();
        Ok(ExportedFile {
            file_name: export::export_file_name(&diagram.name, JSON_EXTENSION),
            content: export::to_json(diagram)?,
        })
    }

    /// # Errors
    ///
    /// [`ExportError::Date`].
    pub fn export_code(&self) -> Result<ExportedFile, EditorError> {
        let diagram = self.workspace.current();
        Ok(ExportedFile {
            file_name: export::export_file_name(&diagram.name, CODE_EXTENSION),
            content: export::stub_code(diagram)?,
        })
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Write everything pending now. Without persistence there is nothing to
    /// write and the status is [`SyncStatus::Idle`].
    pub async fn flush(&self) -> SyncStatus {
        match &self.persistence {
            Some(p) => p.sync.flush().await,
            None => SyncStatus::Idle,
        }
    }

    pub fn clear_sync_error(&self) {
        if let Some(p) = &self.persistence {
            p.sync.clear_error();
        }
    }

    /// Fold a change from the store's feed into the workspace. The engine
    /// picks it up when it concerns the current diagram.
    pub fn apply_store_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Upserted { diagram, .. } => {
                let id = diagram.id.clone();
                if !self.workspace.merge_remote(diagram) {
                    return;
                }
                if self.workspace.current_id() == id {
                    let current = self.workspace.current();
                    let patch = DiagramPatch::full(current);
                    let last_modified = current.last_modified;
                    self.engine.apply_remote(&patch);
                    self.engine.doc.last_modified = last_modified;
                }
                debug!(diagram_id = %id, "remote change merged");
            }
            StoreEvent::Deleted { id, .. } => {
                let was_current = self.workspace.current_id() == id;
                if self.workspace.remove_remote(&id) && was_current {
                    self.reload_engine();
                }
            }
        }
    }

    fn commit_patch(&mut self, patch: &DiagramPatch) {
        if self.workspace.update_current(patch, now()) {
            self.engine.apply_remote(patch);
            self.engine.doc.last_modified = self.workspace.current().last_modified;
            self.schedule_current();
        }
    }

    fn reload_engine(&mut self) {
        self.engine.load_diagram(self.workspace.current().clone());
    }

    fn schedule_current(&self) {
        let id = self.workspace.current_id().to_string();
        self.schedule(&id);
    }

    fn schedule(&self, id: &str) {
        if let (Some(p), Some(diagram)) = (&self.persistence, self.workspace.get(id)) {
            p.sync.schedule(diagram);
        }
    }
}

/// Actions that change the persisted document or camera.
fn is_commit(action: &Action) -> bool {
    matches!(
        action,
        Action::NodeCreated(_)
            | Action::NodeMoved { .. }
            | Action::NodesMoved(_)
            | Action::NodeUpdated(_)
            | Action::NodeDeleted { .. }
            | Action::ConnectionCreated(_)
            | Action::ConnectionDeleted { .. }
            | Action::CameraChanged(_)
    )
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
