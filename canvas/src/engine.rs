use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{Camera, Point, clamp_zoom};
use crate::clipboard::{Clipboard, spawn_point};
use crate::consts::{WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT};
use crate::doc::{ClassNode, Connection, ConnectionKind, Diagram, DiagramPatch, ObjectId};
use crate::hit::{self, Rect};
use crate::input::{Button, ConnectState, Gesture, Key, Modifiers, UiState, WheelDelta};
use crate::render;
use crate::route::{self, exit_point};
use crate::size::NodeSizes;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers and commands for the host to process.
///
/// Document and camera actions are committed changes: the host persists them.
/// Values that change mid-gesture (drag positions, pan offsets) are only
/// reported once the gesture ends.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    NodeCreated(ClassNode),
    NodeMoved { id: ObjectId, position: Point },
    NodesMoved(Vec<(ObjectId, Point)>),
    NodeUpdated(ClassNode),
    NodeDeleted { id: ObjectId, removed_connections: Vec<ObjectId> },
    ConnectionCreated(Connection),
    ConnectionDeleted { id: ObjectId },
    /// The user clicked a connection; the host confirms before deleting.
    ConnectionDeleteRequested { id: ObjectId },
    CameraChanged(Camera),
    SelectionChanged(Vec<ObjectId>),
    ActiveChanged(Option<ObjectId>),
    ConnectModeChanged(bool),
    SetCursor(String),
    RenderNeeded,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub doc: Diagram,
    /// Live camera. Diverges from `doc.camera` during a pan until committed.
    pub camera: Camera,
    pub ui: UiState,
    pub gesture: Gesture,
    pub sizes: NodeSizes,
    pub clipboard: Clipboard,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
}

impl EngineCore {
    #[must_use]
    pub fn new(doc: Diagram) -> Self {
        let camera = doc.camera.sanitized();
        Self {
            doc,
            camera,
            ui: UiState::default(),
            gesture: Gesture::Idle,
            sizes: NodeSizes::default(),
            clipboard: Clipboard::default(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
        }
    }

    // --- Data inputs ---

    /// Replace the document, e.g. when switching diagrams. Resets every
    /// transient interaction but keeps the clipboard.
    pub fn load_diagram(&mut self, doc: Diagram) {
        self.camera = doc.camera.sanitized();
        self.doc = doc;
        self.ui = UiState { connection_kind: self.ui.connection_kind, ..UiState::default() };
        self.gesture = Gesture::Idle;
        self.sizes.measured.clear();
    }

    /// Apply a change that arrived from outside (another tab, the store).
    ///
    /// The camera is only taken over when no gesture is moving it.
    pub fn apply_remote(&mut self, patch: &DiagramPatch) {
        if !self.doc.apply_patch(patch) {
            return;
        }
        self.doc.prune_connections();
        if patch.camera.is_some() && !self.gesture.is_pointer_gesture() {
            self.camera = self.doc.camera;
        }
        self.drop_stale_references();
    }

    /// Update viewport dimensions (CSS pixels) and device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.viewport_width = width_css.max(0.0);
        self.viewport_height = height_css.max(0.0);
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    }

    /// Record a class box size measured by the host on screen.
    pub fn record_node_size(&mut self, id: &str, width_px: f64, height_px: f64) {
        self.sizes.measured.record_screen(id, width_px, height_px, self.camera.zoom);
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if self.gesture.is_pointer_gesture() {
            return Vec::new();
        }
        let world = self.camera.screen_to_world(screen_pt);

        match button {
            Button::Middle => {
                let resume = match std::mem::take(&mut self.gesture) {
                    Gesture::Connecting(state) => Some(state),
                    _ => None,
                };
                self.gesture = Gesture::Panning { last_screen: screen_pt, resume };
                vec![Action::SetCursor("grabbing".into())]
            }
            Button::Secondary => Vec::new(),
            Button::Primary => match &self.gesture {
                Gesture::Connecting(state) => {
                    let state = state.clone();
                    self.connect_click(state, world)
                }
                _ => self.primary_down(screen_pt, world, modifiers),
            },
        }
    }

    fn primary_down(&mut self, screen_pt: Point, world: Point, modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();

        if let Some(node) = hit::node_at(&self.doc, &self.sizes, world) {
            let id = node.id.clone();
            let position = node.position;
            self.set_active(Some(id.clone()), &mut actions);

            if self.ui.in_group(&id) {
                let snapshot = self
                    .doc
                    .classes
                    .iter()
                    .filter(|n| self.ui.selected_ids.contains(&n.id))
                    .map(|n| (n.id.clone(), n.position))
                    .collect();
                self.gesture = Gesture::DraggingSelection { initial_pointer: screen_pt, snapshot };
            } else {
                self.set_selection(Vec::new(), &mut actions);
                let grab_offset = screen_pt - self.camera.world_to_screen(position);
                self.gesture = Gesture::DraggingNode { id, grab_offset, origin: position };
            }
            actions.push(Action::SetCursor("grabbing".into()));
            actions.push(Action::RenderNeeded);
            return actions;
        }

        if self.ui.selection_mode || modifiers.command() {
            self.gesture = Gesture::BoxSelecting { start: screen_pt, current: screen_pt };
            actions.push(Action::SetCursor("crosshair".into()));
            return actions;
        }

        if let Some(id) = hit::connection_at(&self.doc, &self.sizes, &self.camera, screen_pt) {
            actions.push(Action::ConnectionDeleteRequested { id });
            return actions;
        }

        self.set_active(None, &mut actions);
        self.set_selection(Vec::new(), &mut actions);
        self.gesture = Gesture::Panning { last_screen: screen_pt, resume: None };
        actions.push(Action::SetCursor("grabbing".into()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Pointer-down while connect mode is on.
    fn connect_click(&mut self, state: ConnectState, world: Point) -> Vec<Action> {
        let target = hit::node_at(&self.doc, &self.sizes, world).map(|n| (n.id.clone(), self.sizes.bounds(n)));

        match (state, target) {
            (ConnectState::Armed, Some((source, bounds))) => {
                let (exit, side) = exit_point(bounds, world);
                self.gesture = Gesture::Connecting(ConnectState::AwaitingTarget {
                    source,
                    exit_point: exit,
                    exit_side: side,
                    pointer: world,
                });
                vec![Action::RenderNeeded]
            }
            (ConnectState::Armed, None) => Vec::new(),
            (ConnectState::AwaitingTarget { source, .. }, Some((target, _))) => {
                match self.doc.add_connection(&source, &target, self.ui.connection_kind, "") {
                    Ok(conn) => {
                        self.gesture = Gesture::Idle;
                        vec![Action::ConnectionCreated(conn), Action::ConnectModeChanged(false), Action::RenderNeeded]
                    }
                    // Self loops and duplicates are dropped silently; the user picks a new source.
                    Err(_) => {
                        self.gesture = Gesture::Connecting(ConnectState::Armed);
                        vec![Action::RenderNeeded]
                    }
                }
            }
            (ConnectState::AwaitingTarget { .. }, None) => {
                self.gesture = Gesture::Connecting(ConnectState::Armed);
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        match &mut self.gesture {
            Gesture::Idle => {
                let hovered = hit::connection_at(&self.doc, &self.sizes, &self.camera, screen_pt);
                if hovered == self.ui.hovered_connection {
                    return Vec::new();
                }
                let cursor = if hovered.is_some() { "pointer" } else { "default" };
                self.ui.hovered_connection = hovered;
                vec![Action::SetCursor(cursor.into()), Action::RenderNeeded]
            }
            Gesture::Panning { last_screen, .. } => {
                let delta = screen_pt - *last_screen;
                *last_screen = screen_pt;
                self.camera.pan_by(delta.x, delta.y);
                vec![Action::RenderNeeded]
            }
            Gesture::DraggingNode { id, grab_offset, .. } => {
                let position = self.camera.screen_to_world(screen_pt - *grab_offset);
                if let Some(node) = self.doc.node_mut(id) {
                    node.position = position;
                }
                vec![Action::RenderNeeded]
            }
            Gesture::DraggingSelection { initial_pointer, snapshot } => {
                let zoom = clamp_zoom(self.camera.zoom);
                let delta = Point::new((screen_pt.x - initial_pointer.x) / zoom, (screen_pt.y - initial_pointer.y) / zoom);
                for (id, start) in snapshot.iter() {
                    if let Some(node) = self.doc.node_mut(id) {
                        node.position = *start + delta;
                    }
                }
                vec![Action::RenderNeeded]
            }
            Gesture::BoxSelecting { current, .. } => {
                *current = screen_pt;
                vec![Action::RenderNeeded]
            }
            Gesture::Connecting(ConnectState::AwaitingTarget { pointer, .. }) => {
                *pointer = self.camera.screen_to_world(screen_pt);
                vec![Action::RenderNeeded]
            }
            Gesture::Connecting(ConnectState::Armed) => Vec::new(),
        }
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let gesture = std::mem::take(&mut self.gesture);
        let mut actions = Vec::new();

        match gesture {
            Gesture::Idle => return actions,
            Gesture::Connecting(state) => {
                self.gesture = Gesture::Connecting(state);
                return actions;
            }
            Gesture::Panning { resume, .. } => {
                self.commit_camera(&mut actions);
                if let Some(state) = resume {
                    self.gesture = Gesture::Connecting(state);
                }
            }
            Gesture::DraggingNode { id, origin, .. } => {
                if let Some(node) = self.doc.node(&id) {
                    if node.position != origin {
                        actions.push(Action::NodeMoved { id, position: node.position });
                    }
                }
            }
            Gesture::DraggingSelection { snapshot, .. } => {
                let moved: Vec<(ObjectId, Point)> = snapshot
                    .iter()
                    .filter_map(|(id, start)| {
                        let node = self.doc.node(id)?;
                        (node.position != *start).then(|| (id.clone(), node.position))
                    })
                    .collect();
                if !moved.is_empty() {
                    actions.push(Action::NodesMoved(moved));
                }
            }
            Gesture::BoxSelecting { start, .. } => {
                let rect = Rect::from_corners(start, screen_pt);
                let selected = hit::select_in_rect(&self.doc, &self.sizes, &self.camera, rect);
                self.set_selection(selected.into_iter().collect(), &mut actions);
            }
        }

        actions.push(Action::SetCursor("default".into()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Scroll-wheel zoom about the pointer. Each step is committed. Ignored
    /// while a drag is in progress.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        if self.gesture.is_pointer_gesture() || !delta.dy.is_finite() || delta.dy.abs() < f64::EPSILON {
            return Vec::new();
        }
        let factor = if delta.dy > 0.0 { WHEEL_ZOOM_OUT } else { WHEEL_ZOOM_IN };
        let mut actions = Vec::new();
        if self.camera.zoom_at(screen_pt, factor) {
            self.commit_camera(&mut actions);
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    // --- Keyboard input ---

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if key.is_command() {
            self.ui.selection_mode = true;
            return Vec::new();
        }
        if key.is("Escape") {
            return if self.gesture.is_connecting() {
                self.set_connect_mode(false)
            } else {
                let mut actions = Vec::new();
                self.set_selection(Vec::new(), &mut actions);
                actions
            };
        }
        if key.is("Delete") || key.is("Backspace") {
            return match self.ui.active_id.clone() {
                Some(id) => self.delete_class(&id),
                None => Vec::new(),
            };
        }
        if modifiers.command() && key.is_letter('c') {
            self.copy_active();
            return Vec::new();
        }
        if modifiers.command() && key.is_letter('v') {
            return self.paste();
        }
        Vec::new()
    }

    pub fn on_key_up(&mut self, key: &Key, _modifiers: Modifiers) -> Vec<Action> {
        if key.is_command() {
            self.ui.selection_mode = false;
        }
        Vec::new()
    }

    // --- Commands ---

    pub fn toggle_connect_mode(&mut self) -> Vec<Action> {
        let on = !self.gesture.is_connecting();
        self.set_connect_mode(on)
    }

    /// Turn connect mode on or off. Turning it off discards any picked source.
    pub fn set_connect_mode(&mut self, on: bool) -> Vec<Action> {
        if on == self.gesture.is_connecting() {
            return Vec::new();
        }
        match &mut self.gesture {
            // Leaving mid-pan: the pan finishes, nothing is restored.
            Gesture::Panning { resume, .. } if !on => *resume = None,
            gesture if gesture.is_pointer_gesture() => return Vec::new(),
            gesture => *gesture = if on { Gesture::Connecting(ConnectState::Armed) } else { Gesture::Idle },
        }
        self.ui.hovered_connection = None;
        vec![Action::ConnectModeChanged(on), Action::RenderNeeded]
    }

    pub fn set_connection_kind(&mut self, kind: ConnectionKind) {
        self.ui.connection_kind = kind;
    }

    /// Create a class at the spawn point and make it active. Blank names are ignored.
    pub fn add_class(&mut self, name: &str, category: &str) -> Vec<Action> {
        let name = name.trim();
        if name.is_empty() {
            return Vec::new();
        }
        let category = if category.is_empty() {
            self.doc.categories.first().cloned().unwrap_or_default()
        } else {
            category.to_string()
        };
        let node = ClassNode::new(name, category, spawn_point(&self.camera));
        self.insert_node(node)
    }

    /// Replace a class wholesale, position included.
    pub fn update_class(&mut self, node: ClassNode) -> Vec<Action> {
        let Some(existing) = self.doc.node_mut(&node.id) else {
            return Vec::new();
        };
        *existing = node.clone();
        vec![Action::NodeUpdated(node), Action::RenderNeeded]
    }

    /// Delete a class and every connection referencing it.
    pub fn delete_class(&mut self, id: &str) -> Vec<Action> {
        let Some((node, removed_connections)) = self.doc.remove_class(id) else {
            return Vec::new();
        };
        let mut actions = vec![Action::NodeDeleted { id: node.id, removed_connections }];
        self.sizes.measured.forget(id);
        self.drop_stale_references_into(&mut actions);
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn delete_connection(&mut self, id: &str) -> Vec<Action> {
        match self.doc.remove_connection(id) {
            Some(conn) => {
                if self.ui.hovered_connection.as_deref() == Some(id) {
                    self.ui.hovered_connection = None;
                }
                vec![Action::ConnectionDeleted { id: conn.id }, Action::RenderNeeded]
            }
            None => Vec::new(),
        }
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        let center = self.viewport_center();
        self.camera_step(|camera| camera.zoom_in(center))
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        let center = self.viewport_center();
        self.camera_step(|camera| camera.zoom_out(center))
    }

    pub fn reset_camera(&mut self) -> Vec<Action> {
        self.camera_step(|camera| {
            let changed = *camera != Camera::default();
            camera.reset();
            changed
        })
    }

    /// Copy the active class. Returns false when nothing is active.
    pub fn copy_active(&mut self) -> bool {
        let Some(node) = self.ui.active_id.as_deref().and_then(|id| self.doc.node(id)) else {
            return false;
        };
        self.clipboard.copy(node);
        true
    }

    pub fn paste(&mut self) -> Vec<Action> {
        match self.clipboard.paste(&self.camera) {
            Some(node) => self.insert_node(node),
            None => Vec::new(),
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn active(&self) -> Option<&ClassNode> {
        self.ui.active_id.as_deref().and_then(|id| self.doc.node(id))
    }

    #[must_use]
    pub fn selection(&self) -> Vec<ObjectId> {
        self.ui.selected_ids.iter().cloned().collect()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ClassNode> {
        self.doc.node(id)
    }

    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.gesture.is_connecting()
    }

    /// The connect preview line in screen space, when a source is picked.
    #[must_use]
    pub fn preview_path(&self) -> Option<String> {
        match &self.gesture {
            Gesture::Connecting(ConnectState::AwaitingTarget { exit_point, pointer, .. }) => {
                Some(route::preview_path(*exit_point, *pointer, &self.camera))
            }
            _ => None,
        }
    }

    /// The selection rectangle in screen space while box selecting.
    #[must_use]
    pub fn selection_rect(&self) -> Option<Rect> {
        match &self.gesture {
            Gesture::BoxSelecting { start, current } => Some(Rect::from_corners(*start, *current)),
            _ => None,
        }
    }

    // --- Internals ---

    fn viewport_center(&self) -> Point {
        Point::new(self.viewport_width / 2.0, self.viewport_height / 2.0)
    }

    fn camera_step(&mut self, step: impl FnOnce(&mut Camera) -> bool) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.gesture.is_pointer_gesture() {
            return actions;
        }
        if step(&mut self.camera) {
            self.commit_camera(&mut actions);
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    fn commit_camera(&mut self, actions: &mut Vec<Action>) {
        if self.doc.camera != self.camera {
            self.doc.camera = self.camera;
            actions.push(Action::CameraChanged(self.camera));
        }
    }

    fn insert_node(&mut self, node: ClassNode) -> Vec<Action> {
        let id = node.id.clone();
        self.doc.add_class(node.clone());
        let mut actions = vec![Action::NodeCreated(node)];
        self.set_active(Some(id), &mut actions);
        actions.push(Action::RenderNeeded);
        actions
    }

    fn set_active(&mut self, id: Option<ObjectId>, actions: &mut Vec<Action>) {
        if self.ui.active_id != id {
            self.ui.active_id.clone_from(&id);
            actions.push(Action::ActiveChanged(id));
        }
    }

    fn set_selection(&mut self, ids: Vec<ObjectId>, actions: &mut Vec<Action>) {
        let next = ids.into_iter().collect();
        if self.ui.selected_ids != next {
            self.ui.selected_ids = next;
            actions.push(Action::SelectionChanged(self.selection()));
        }
    }

    fn drop_stale_references(&mut self) {
        let mut ignored = Vec::new();
        self.drop_stale_references_into(&mut ignored);
    }

    /// Forget ids that no longer exist in the document.
    fn drop_stale_references_into(&mut self, actions: &mut Vec<Action>) {
        if self.ui.active_id.as_deref().is_some_and(|id| self.doc.node(id).is_none()) {
            self.set_active(None, actions);
        }
        let kept: Vec<ObjectId> =
            self.ui.selected_ids.iter().filter(|id| self.doc.node(id).is_some()).cloned().collect();
        self.set_selection(kept, actions);
        if self.ui.hovered_connection.as_deref().is_some_and(|id| self.doc.connection(id).is_none()) {
            self.ui.hovered_connection = None;
        }
        if let Some(state) = self.gesture.connect_state_mut() {
            if let ConnectState::AwaitingTarget { source, .. } = state {
                if self.doc.node(source).is_none() {
                    *state = ConnectState::Armed;
                }
            }
        }
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, doc: Diagram) -> Self {
        Self { canvas, core: EngineCore::new(doc) }
    }

    pub fn load_diagram(&mut self, doc: Diagram) {
        self.core.load_diagram(doc);
    }

    pub fn apply_remote(&mut self, patch: &DiagramPatch) {
        self.core.apply_remote(patch);
    }

    /// Update viewport dimensions and resize the backing store to match.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css, dpr);
        self.canvas.set_width((self.core.viewport_width * self.core.dpr).round() as u32);
        self.canvas.set_height((self.core.viewport_height * self.core.dpr).round() as u32);
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button, modifiers)
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_wheel(screen_pt, delta, modifiers)
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    pub fn on_key_up(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_up(key, modifiers)
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the 2D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let Some(ctx) = self.canvas.get_context("2d")? else {
            return Err(JsValue::from_str("2d context unavailable"));
        };
        let ctx: CanvasRenderingContext2d = ctx.dyn_into().map_err(JsValue::from)?;
        render::draw(&ctx, &self.core)
    }
}
