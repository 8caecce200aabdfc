#![allow(clippy::float_cmp)]

use time::macros::datetime;

use super::*;

// =============================================================
// Helpers
// =============================================================

fn diagram() -> Diagram {
    Diagram::new("Engine", datetime!(2025-01-01 00:00:00 UTC))
}

/// Engine with empty (192x80) classes at the given world positions, ids as named.
fn core_with(nodes: &[(&str, f64, f64)]) -> EngineCore {
    let mut doc = diagram();
    for (id, x, y) in nodes {
        let mut node = ClassNode::new(id.to_uppercase(), "Gameplay", Point::new(*x, *y));
        node.id = (*id).to_string();
        doc.add_class(node);
    }
    let mut core = EngineCore::new(doc);
    core.set_viewport(800.0, 600.0, 1.0);
    core
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn no_mods() -> Modifiers {
    Modifiers::default()
}

fn ctrl() -> Modifiers {
    Modifiers { ctrl: true, ..Modifiers::default() }
}

fn key(name: &str) -> Key {
    Key(name.to_string())
}

fn click(core: &mut EngineCore, at: Point) -> Vec<Action> {
    let mut actions = core.on_pointer_down(at, Button::Primary, no_mods());
    actions.extend(core.on_pointer_up(at, Button::Primary, no_mods()));
    actions
}

fn drag(core: &mut EngineCore, from: Point, to: Point, mods: Modifiers) -> Vec<Action> {
    let mut actions = core.on_pointer_down(from, Button::Primary, mods);
    actions.extend(core.on_pointer_move(pt((from.x + to.x) / 2.0, (from.y + to.y) / 2.0), mods));
    actions.extend(core.on_pointer_move(to, mods));
    actions.extend(core.on_pointer_up(to, Button::Primary, mods));
    actions
}

fn position(core: &EngineCore, id: &str) -> Point {
    core.node(id).map(|n| n.position).unwrap_or_default()
}

fn has_camera_change(actions: &[Action]) -> bool {
    actions.iter().any(|a| matches!(a, Action::CameraChanged(_)))
}

// =============================================================
// Construction / viewport
// =============================================================

#[test]
fn new_core_takes_sanitized_camera() {
    let mut doc = diagram();
    doc.camera = Camera { zoom: 9.0, offset_x: 1.0, offset_y: 2.0 };
    let core = EngineCore::new(doc);
    assert_eq!(core.camera().zoom, 3.0);
    assert_eq!(core.gesture, Gesture::Idle);
}

#[test]
fn set_viewport_repairs_bad_dpr() {
    let mut core = core_with(&[]);
    core.set_viewport(-5.0, 300.0, 0.0);
    assert_eq!(core.viewport_width, 0.0);
    assert_eq!(core.viewport_height, 300.0);
    assert_eq!(core.dpr, 1.0);
}

// =============================================================
// Panning
// =============================================================

#[test]
fn pan_updates_camera_live_and_commits_once() {
    let mut core = core_with(&[]);
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_mods());
    let mid = core.on_pointer_move(pt(130.0, 90.0), no_mods());
    assert!(!has_camera_change(&mid));
    assert_eq!(core.camera().offset_x, 30.0);
    assert_eq!(core.camera().offset_y, -10.0);
    assert_eq!(core.doc.camera, Camera::default());

    core.on_pointer_move(pt(150.0, 95.0), no_mods());
    let up = core.on_pointer_up(pt(150.0, 95.0), Button::Primary, no_mods());
    let committed: Vec<_> = up.iter().filter(|a| matches!(a, Action::CameraChanged(_))).collect();
    assert_eq!(committed.len(), 1);
    assert_eq!(core.doc.camera, Camera { zoom: 1.0, offset_x: 50.0, offset_y: -5.0 });
    assert_eq!(core.gesture, Gesture::Idle);
}

#[test]
fn click_on_empty_canvas_commits_nothing() {
    let mut core = core_with(&[]);
    let actions = click(&mut core, pt(400.0, 400.0));
    assert!(!has_camera_change(&actions));
}

#[test]
fn middle_button_pans_even_over_a_class() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    core.on_pointer_down(pt(10.0, 10.0), Button::Middle, no_mods());
    core.on_pointer_move(pt(20.0, 10.0), no_mods());
    core.on_pointer_up(pt(20.0, 10.0), Button::Middle, no_mods());
    assert_eq!(position(&core, "a"), pt(0.0, 0.0));
    assert_eq!(core.camera().offset_x, 10.0);
}

#[test]
fn pointer_down_during_gesture_is_ignored() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    core.on_pointer_down(pt(500.0, 500.0), Button::Primary, no_mods());
    let actions = core.on_pointer_down(pt(10.0, 10.0), Button::Primary, no_mods());
    assert!(actions.is_empty());
    assert!(matches!(core.gesture, Gesture::Panning { .. }));
}

#[test]
fn wheel_during_pan_commits_once_on_release() {
    let mut core = core_with(&[]);
    core.on_pointer_down(pt(400.0, 300.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(450.0, 300.0), no_mods());
    let wheel = core.on_wheel(pt(450.0, 300.0), WheelDelta { dx: 0.0, dy: -120.0 }, no_mods());
    assert!(wheel.is_empty());
    assert_eq!(core.camera().zoom, 1.0);

    let up = core.on_pointer_up(pt(450.0, 300.0), Button::Primary, no_mods());
    let committed: Vec<_> = up.iter().filter(|a| matches!(a, Action::CameraChanged(_))).collect();
    assert_eq!(committed.len(), 1);
    assert_eq!(core.doc.camera, Camera { zoom: 1.0, offset_x: 50.0, offset_y: 0.0 });
}

// =============================================================
// Wheel zoom / buttons
// =============================================================

#[test]
fn wheel_up_zooms_in_about_pointer() {
    let mut core = core_with(&[]);
    let actions = core.on_wheel(pt(100.0, 100.0), WheelDelta { dx: 0.0, dy: -120.0 }, no_mods());
    assert!((core.camera().zoom - 1.1).abs() < 1e-12);
    let back = core.camera().world_to_screen(pt(100.0, 100.0));
    assert!((back.x - 100.0).abs() < 1e-9 && (back.y - 100.0).abs() < 1e-9);
    assert!(has_camera_change(&actions));
    assert_eq!(core.doc.camera, core.camera());
}

#[test]
fn wheel_down_zooms_out() {
    let mut core = core_with(&[]);
    core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: 3.0 }, no_mods());
    assert!((core.camera().zoom - 0.9).abs() < 1e-12);
}

#[test]
fn wheel_without_vertical_delta_is_ignored() {
    let mut core = core_with(&[]);
    assert!(core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 40.0, dy: 0.0 }, no_mods()).is_empty());
    assert_eq!(core.camera(), Camera::default());
}

#[test]
fn wheel_at_zoom_limit_commits_nothing() {
    let mut core = core_with(&[]);
    core.camera.zoom = 3.0;
    assert!(core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: -1.0 }, no_mods()).is_empty());
}

#[test]
fn zoom_buttons_use_viewport_center() {
    let mut core = core_with(&[]);
    let before = core.camera().screen_to_world(pt(400.0, 300.0));
    core.zoom_in();
    assert!((core.camera().zoom - 1.2).abs() < 1e-12);
    let after = core.camera().world_to_screen(before);
    assert!((after.x - 400.0).abs() < 1e-9 && (after.y - 300.0).abs() < 1e-9);
    core.zoom_out();
    assert!((core.camera().zoom - 0.96).abs() < 1e-9);
}

#[test]
fn reset_camera_commits_identity() {
    let mut core = core_with(&[]);
    core.zoom_in();
    let actions = core.reset_camera();
    assert!(has_camera_change(&actions));
    assert_eq!(core.doc.camera, Camera::default());
    assert!(core.reset_camera().is_empty());
}

// =============================================================
// Single-node drag
// =============================================================

#[test]
fn drag_moves_class_and_commits_on_release() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    let down = core.on_pointer_down(pt(20.0, 30.0), Button::Primary, no_mods());
    assert!(down.contains(&Action::ActiveChanged(Some("a".into()))));

    let mid = core.on_pointer_move(pt(70.0, 50.0), no_mods());
    assert!(!mid.iter().any(|a| matches!(a, Action::NodeMoved { .. })));
    assert_eq!(position(&core, "a"), pt(50.0, 20.0));

    let up = core.on_pointer_up(pt(70.0, 50.0), Button::Primary, no_mods());
    assert!(up.contains(&Action::NodeMoved { id: "a".into(), position: pt(50.0, 20.0) }));
}

#[test]
fn drag_respects_zoom_and_offset() {
    let mut core = core_with(&[("a", 100.0, 100.0)]);
    core.camera = Camera { zoom: 2.0, offset_x: 10.0, offset_y: 10.0 };
    // Class a is drawn at screen (210, 210).
    core.on_pointer_down(pt(220.0, 220.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(320.0, 260.0), no_mods());
    assert_eq!(position(&core, "a"), pt(150.0, 120.0));
}

#[test]
fn wheel_during_drag_keeps_class_under_pointer() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    core.on_pointer_down(pt(10.0, 10.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(11.0, 10.0), no_mods());
    assert_eq!(position(&core, "a"), pt(1.0, 0.0));

    assert!(core.on_wheel(pt(11.0, 10.0), WheelDelta { dx: 0.0, dy: -120.0 }, no_mods()).is_empty());
    assert!(core.zoom_in().is_empty());
    assert_eq!(position(&core, "a"), pt(1.0, 0.0));

    core.on_pointer_move(pt(21.0, 10.0), no_mods());
    assert_eq!(position(&core, "a"), pt(11.0, 0.0));
    let up = core.on_pointer_up(pt(21.0, 10.0), Button::Primary, no_mods());
    assert!(up.contains(&Action::NodeMoved { id: "a".into(), position: pt(11.0, 0.0) }));
    assert!(!has_camera_change(&up));
}

#[test]
fn clicking_a_class_without_moving_commits_nothing() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    let actions = click(&mut core, pt(10.0, 10.0));
    assert!(!actions.iter().any(|a| matches!(a, Action::NodeMoved { .. })));
    assert_eq!(core.active().map(|n| n.id.as_str()), Some("a"));
}

#[test]
fn click_on_empty_canvas_clears_active() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    click(&mut core, pt(10.0, 10.0));
    let actions = click(&mut core, pt(600.0, 500.0));
    assert!(actions.contains(&Action::ActiveChanged(None)));
    assert!(core.active().is_none());
}

// =============================================================
// Box selection
// =============================================================

fn three_in_a_row() -> EngineCore {
    core_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0), ("c", 600.0, 200.0)])
}

#[test]
fn box_select_with_held_ctrl_key() {
    let mut core = three_in_a_row();
    core.on_key_down(&key("Control"), no_mods());
    assert!(core.ui.selection_mode);
    let actions = drag(&mut core, pt(-10.0, -10.0), pt(350.0, 50.0), no_mods());
    assert!(actions.contains(&Action::SelectionChanged(vec!["a".into(), "b".into()])));
    core.on_key_up(&key("Control"), no_mods());
    assert!(!core.ui.selection_mode);
}

#[test]
fn box_select_with_modifier_on_event() {
    let mut core = three_in_a_row();
    drag(&mut core, pt(250.0, 10.0), pt(700.0, 250.0), ctrl());
    assert_eq!(core.selection(), vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn box_select_direction_does_not_matter() {
    let mut forward = three_in_a_row();
    let mut backward = three_in_a_row();
    drag(&mut forward, pt(-10.0, -10.0), pt(310.0, 90.0), ctrl());
    drag(&mut backward, pt(310.0, 90.0), pt(-10.0, -10.0), ctrl());
    assert_eq!(forward.selection(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(forward.selection(), backward.selection());
}

#[test]
fn box_select_twice_is_idempotent() {
    let mut core = three_in_a_row();
    drag(&mut core, pt(-10.0, -10.0), pt(350.0, 50.0), ctrl());
    let first = core.selection();
    let second = drag(&mut core, pt(-10.0, -10.0), pt(350.0, 50.0), ctrl());
    assert_eq!(core.selection(), first);
    assert!(!second.iter().any(|a| matches!(a, Action::SelectionChanged(_))));
}

#[test]
fn box_select_everything() {
    let mut core = three_in_a_row();
    drag(&mut core, pt(-50.0, -50.0), pt(1000.0, 1000.0), ctrl());
    assert_eq!(core.selection().len(), 3);
}

#[test]
fn zero_area_box_select_clears_selection() {
    let mut core = three_in_a_row();
    drag(&mut core, pt(-50.0, -50.0), pt(1000.0, 1000.0), ctrl());
    core.on_pointer_down(pt(500.0, 500.0), Button::Primary, ctrl());
    core.on_pointer_up(pt(500.0, 500.0), Button::Primary, ctrl());
    assert!(core.selection().is_empty());
}

#[test]
fn selection_rect_tracks_pointer() {
    let mut core = three_in_a_row();
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, ctrl());
    core.on_pointer_move(pt(40.0, 160.0), ctrl());
    assert_eq!(core.selection_rect(), Some(Rect::new(40.0, 100.0, 60.0, 60.0)));
    core.on_pointer_up(pt(40.0, 160.0), Button::Primary, ctrl());
    assert!(core.selection_rect().is_none());
}

// =============================================================
// Group drag
// =============================================================

#[test]
fn group_drag_preserves_relative_offsets() {
    let mut core = three_in_a_row();
    core.camera = Camera { zoom: 0.5, offset_x: 0.0, offset_y: 0.0 };
    drag(&mut core, pt(-50.0, -50.0), pt(1000.0, 1000.0), ctrl());

    let before_ab = position(&core, "a") - position(&core, "b");
    let before_ac = position(&core, "a") - position(&core, "c");
    let close = |p: Point, q: Point| (p.x - q.x).abs() < 1e-9 && (p.y - q.y).abs() < 1e-9;

    // Class b sits at screen (150, 0) at zoom 0.5.
    core.on_pointer_down(pt(160.0, 10.0), Button::Primary, no_mods());
    assert!(matches!(core.gesture, Gesture::DraggingSelection { .. }));
    for step in 1..=7 {
        let s = f64::from(step);
        core.on_pointer_move(pt(160.0 + s * 13.7, 10.0 - s * 4.1), no_mods());
        assert!(close(position(&core, "a") - position(&core, "b"), before_ab));
        assert!(close(position(&core, "a") - position(&core, "c"), before_ac));
    }
    core.on_pointer_move(pt(260.0, 30.0), no_mods());
    let up = core.on_pointer_up(pt(260.0, 30.0), Button::Primary, no_mods());

    // Final delta is (100, 20) screen = (200, 40) world.
    assert_eq!(position(&core, "a"), pt(200.0, 40.0));
    assert_eq!(position(&core, "b"), pt(500.0, 40.0));
    assert_eq!(position(&core, "c"), pt(800.0, 240.0));
    let moved = up.iter().find_map(|a| match a {
        Action::NodesMoved(m) => Some(m.len()),
        _ => None,
    });
    assert_eq!(moved, Some(3));
}

#[test]
fn pressing_unselected_class_falls_back_to_single_drag() {
    let mut core = three_in_a_row();
    drag(&mut core, pt(-10.0, -10.0), pt(350.0, 50.0), ctrl());
    assert_eq!(core.selection().len(), 2);

    let down = core.on_pointer_down(pt(610.0, 210.0), Button::Primary, no_mods());
    assert!(matches!(core.gesture, Gesture::DraggingNode { .. }));
    assert!(down.contains(&Action::SelectionChanged(Vec::new())));
    core.on_pointer_move(pt(620.0, 210.0), no_mods());
    core.on_pointer_up(pt(620.0, 210.0), Button::Primary, no_mods());
    assert_eq!(position(&core, "a"), pt(0.0, 0.0));
    assert_eq!(position(&core, "c"), pt(610.0, 200.0));
}

#[test]
fn single_selected_class_drags_alone() {
    let mut core = three_in_a_row();
    drag(&mut core, pt(-10.0, -10.0), pt(50.0, 50.0), ctrl());
    assert_eq!(core.selection(), vec!["a".to_string()]);
    core.on_pointer_down(pt(10.0, 10.0), Button::Primary, no_mods());
    assert!(matches!(core.gesture, Gesture::DraggingNode { .. }));
}

// =============================================================
// Connect mode
// =============================================================

#[test]
fn connect_two_classes_then_exit_mode() {
    let mut core = three_in_a_row();
    core.set_connection_kind(ConnectionKind::Extends);
    assert_eq!(core.toggle_connect_mode(), vec![Action::ConnectModeChanged(true), Action::RenderNeeded]);

    core.on_pointer_down(pt(150.0, 40.0), Button::Primary, no_mods());
    assert!(matches!(
        &core.gesture,
        Gesture::Connecting(ConnectState::AwaitingTarget { source, .. }) if source == "a"
    ));

    let actions = core.on_pointer_down(pt(350.0, 40.0), Button::Primary, no_mods());
    let created = actions.iter().find_map(|a| match a {
        Action::ConnectionCreated(c) => Some(c.clone()),
        _ => None,
    });
    let created = created.expect("connection created");
    assert_eq!((created.from.as_str(), created.to.as_str()), ("a", "b"));
    assert_eq!(created.kind, ConnectionKind::Extends);
    assert!(actions.contains(&Action::ConnectModeChanged(false)));
    assert!(!core.is_connecting());
    assert_eq!(core.doc.connections.len(), 1);
}

#[test]
fn exit_point_follows_pointer_side() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    // Right half of a, near its vertical centre: exits the right border.
    core.on_pointer_down(pt(180.0, 40.0), Button::Primary, no_mods());
    match &core.gesture {
        Gesture::Connecting(ConnectState::AwaitingTarget { exit_point, .. }) => {
            assert_eq!(*exit_point, pt(192.0, 40.0));
        }
        other => panic!("unexpected gesture {other:?}"),
    }
}

#[test]
fn preview_follows_pointer() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    assert!(core.preview_path().is_none());
    core.on_pointer_down(pt(180.0, 40.0), Button::Primary, no_mods());
    core.on_pointer_up(pt(180.0, 40.0), Button::Primary, no_mods());
    assert!(core.is_connecting());
    core.on_pointer_move(pt(250.0, 90.0), no_mods());
    assert_eq!(core.preview_path().as_deref(), Some("M 192 40 L 250 90"));
}

#[test]
fn self_connection_cancels_to_armed() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    click(&mut core, pt(10.0, 10.0));
    click(&mut core, pt(20.0, 20.0));
    assert_eq!(core.gesture, Gesture::Connecting(ConnectState::Armed));
    assert!(core.doc.connections.is_empty());
}

#[test]
fn duplicate_connection_rejected_in_either_direction() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    click(&mut core, pt(10.0, 10.0));
    click(&mut core, pt(310.0, 10.0));
    assert_eq!(core.doc.connections.len(), 1);

    core.toggle_connect_mode();
    click(&mut core, pt(310.0, 10.0));
    let actions = click(&mut core, pt(10.0, 10.0));
    assert!(!actions.iter().any(|a| matches!(a, Action::ConnectionCreated(_))));
    assert_eq!(core.doc.connections.len(), 1);
    assert_eq!(core.gesture, Gesture::Connecting(ConnectState::Armed));
}

#[test]
fn empty_click_while_awaiting_target_rearms() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    click(&mut core, pt(10.0, 10.0));
    click(&mut core, pt(500.0, 500.0));
    assert_eq!(core.gesture, Gesture::Connecting(ConnectState::Armed));
    assert!(core.preview_path().is_none());
}

#[test]
fn empty_click_while_armed_does_nothing() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    assert!(click(&mut core, pt(500.0, 500.0)).is_empty());
    assert!(core.is_connecting());
    assert_eq!(core.camera(), Camera::default());
}

#[test]
fn toggling_off_discards_source() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    click(&mut core, pt(10.0, 10.0));
    assert_eq!(core.toggle_connect_mode(), vec![Action::ConnectModeChanged(false), Action::RenderNeeded]);
    assert_eq!(core.gesture, Gesture::Idle);
    assert!(core.preview_path().is_none());
}

#[test]
fn escape_leaves_connect_mode() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    let actions = core.on_key_down(&key("Escape"), no_mods());
    assert!(actions.contains(&Action::ConnectModeChanged(false)));
    assert!(!core.is_connecting());
}

#[test]
fn middle_button_pans_in_connect_mode() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    core.on_pointer_down(pt(10.0, 10.0), Button::Middle, no_mods());
    assert_eq!(core.gesture, Gesture::Panning { last_screen: pt(10.0, 10.0), resume: Some(ConnectState::Armed) });
    assert!(core.is_connecting());

    core.on_pointer_move(pt(30.0, 10.0), no_mods());
    let up = core.on_pointer_up(pt(30.0, 10.0), Button::Middle, no_mods());
    assert!(has_camera_change(&up));
    assert_eq!(core.doc.camera.offset_x, 20.0);
    assert_eq!(core.gesture, Gesture::Connecting(ConnectState::Armed));
}

#[test]
fn pan_keeps_picked_source() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    click(&mut core, pt(10.0, 10.0));
    core.on_pointer_down(pt(500.0, 500.0), Button::Middle, no_mods());
    core.on_pointer_move(pt(520.0, 500.0), no_mods());
    core.on_pointer_up(pt(520.0, 500.0), Button::Middle, no_mods());

    // Class b now sits 20px further right on screen.
    let actions = click(&mut core, pt(330.0, 10.0));
    assert!(actions.iter().any(|a| matches!(a, Action::ConnectionCreated(c) if c.from == "a" && c.to == "b")));
    assert!(!core.is_connecting());
}

#[test]
fn secondary_button_is_ignored_in_connect_mode() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    assert!(core.on_pointer_down(pt(10.0, 10.0), Button::Secondary, no_mods()).is_empty());
    assert_eq!(core.gesture, Gesture::Connecting(ConnectState::Armed));
}

#[test]
fn escape_mid_pan_leaves_connect_mode_after_release() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    core.on_pointer_down(pt(500.0, 500.0), Button::Middle, no_mods());
    let actions = core.on_key_down(&key("Escape"), no_mods());
    assert!(actions.contains(&Action::ConnectModeChanged(false)));
    core.on_pointer_up(pt(500.0, 500.0), Button::Middle, no_mods());
    assert_eq!(core.gesture, Gesture::Idle);
}

#[test]
fn connect_mode_cannot_start_mid_drag() {
    let mut core = three_in_a_row();
    core.on_pointer_down(pt(10.0, 10.0), Button::Primary, no_mods());
    assert!(core.set_connect_mode(true).is_empty());
    assert!(matches!(core.gesture, Gesture::DraggingNode { .. }));
}

// =============================================================
// Connections on the canvas
// =============================================================

#[test]
fn clicking_a_connection_requests_delete() {
    let mut core = three_in_a_row();
    let conn = core.doc.add_connection("a", "b", ConnectionKind::Uses, "").unwrap();
    // Straight segment from (192, 40) to (300, 40).
    let actions = click(&mut core, pt(246.0, 43.0));
    assert!(actions.contains(&Action::ConnectionDeleteRequested { id: conn.id.clone() }));
    assert!(!matches!(core.gesture, Gesture::Panning { .. }));

    let deleted = core.delete_connection(&conn.id);
    assert!(deleted.contains(&Action::ConnectionDeleted { id: conn.id }));
    assert!(core.doc.connections.is_empty());
}

#[test]
fn hover_highlights_connection() {
    let mut core = three_in_a_row();
    let conn = core.doc.add_connection("a", "b", ConnectionKind::Uses, "").unwrap();
    let actions = core.on_pointer_move(pt(246.0, 40.0), no_mods());
    assert!(actions.contains(&Action::SetCursor("pointer".into())));
    assert_eq!(core.ui.hovered_connection, Some(conn.id));
    assert!(core.on_pointer_move(pt(247.0, 40.0), no_mods()).is_empty());
    core.on_pointer_move(pt(246.0, 300.0), no_mods());
    assert!(core.ui.hovered_connection.is_none());
}

// =============================================================
// Class commands
// =============================================================

#[test]
fn add_class_spawns_under_fixed_screen_point() {
    let mut core = core_with(&[]);
    core.camera = Camera { zoom: 2.0, offset_x: -100.0, offset_y: 0.0 };
    let actions = core.add_class("  Player ", "UI");
    let node = core.doc.classes.first().cloned().expect("class added");
    assert_eq!(node.name, "Player");
    assert_eq!(node.category, "UI");
    assert_eq!(node.position, pt(100.0, 50.0));
    assert!(actions.contains(&Action::NodeCreated(node.clone())));
    assert!(actions.contains(&Action::ActiveChanged(Some(node.id))));
}

#[test]
fn add_class_rejects_blank_name_and_defaults_category() {
    let mut core = core_with(&[]);
    assert!(core.add_class("   ", "UI").is_empty());
    core.add_class("Enemy", "");
    assert_eq!(core.doc.classes[0].category, "Gameplay");
}

#[test]
fn update_class_replaces_content() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    let mut edited = core.node("a").cloned().expect("class a");
    edited.name = "Renamed".into();
    edited.add_property();
    edited.position = pt(40.0, 50.0);
    let actions = core.update_class(edited.clone());
    assert_eq!(actions[0], Action::NodeUpdated(edited));
    assert_eq!(core.node("a").map(|n| n.properties.len()), Some(1));
    assert_eq!(position(&core, "a"), pt(40.0, 50.0));

    let mut ghost = ClassNode::new("Ghost", "UI", pt(0.0, 0.0));
    ghost.id = "ghost".into();
    assert!(core.update_class(ghost).is_empty());
}

#[test]
fn delete_class_cascades_connections() {
    let mut core = core_with(&[("hub", 0.0, 0.0), ("a", 300.0, 0.0), ("b", 0.0, 300.0), ("c", 300.0, 300.0)]);
    for other in ["a", "b", "c"] {
        core.doc.add_connection("hub", other, ConnectionKind::Uses, "").unwrap();
    }
    let survivor = core.doc.add_connection("a", "c", ConnectionKind::Related, "").unwrap();

    let actions = core.delete_class("hub");
    let removed = actions.iter().find_map(|a| match a {
        Action::NodeDeleted { removed_connections, .. } => Some(removed_connections.len()),
        _ => None,
    });
    assert_eq!(removed, Some(3));
    assert_eq!(core.doc.connections, vec![survivor]);
}

#[test]
fn delete_key_removes_active_class() {
    let mut core = core_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)]);
    click(&mut core, pt(10.0, 10.0));
    let actions = core.on_key_down(&key("Delete"), no_mods());
    assert!(actions.contains(&Action::ActiveChanged(None)));
    assert!(core.node("a").is_none());
    assert!(core.on_key_down(&key("Backspace"), no_mods()).is_empty());
}

#[test]
fn deleting_connect_source_rearms() {
    let mut core = three_in_a_row();
    core.toggle_connect_mode();
    click(&mut core, pt(10.0, 10.0));
    core.delete_class("a");
    assert_eq!(core.gesture, Gesture::Connecting(ConnectState::Armed));
}

#[test]
fn deleting_selected_class_shrinks_selection() {
    let mut core = three_in_a_row();
    drag(&mut core, pt(-10.0, -10.0), pt(350.0, 50.0), ctrl());
    let actions = core.delete_class("a");
    assert!(actions.contains(&Action::SelectionChanged(vec!["b".into()])));
}

// =============================================================
// Clipboard shortcuts
// =============================================================

#[test]
fn copy_paste_shortcuts() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    assert!(core.on_key_down(&key("v"), ctrl()).is_empty());
    click(&mut core, pt(10.0, 10.0));
    core.on_key_down(&key("c"), ctrl());
    let actions = core.on_key_down(&key("V"), Modifiers { meta: true, ..Modifiers::default() });
    let pasted = actions.iter().find_map(|a| match a {
        Action::NodeCreated(n) => Some(n.clone()),
        _ => None,
    });
    let pasted = pasted.expect("pasted class");
    assert_eq!(pasted.name, "A_copy");
    assert_ne!(pasted.id, "a");
    assert_eq!(core.doc.classes.len(), 2);
    assert_eq!(core.active().map(|n| n.id.clone()), Some(pasted.id));
}

#[test]
fn copy_without_active_class_is_noop() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    assert!(!core.copy_active());
    assert!(core.paste().is_empty());
}

// =============================================================
// Loading and remote changes
// =============================================================

#[test]
fn load_diagram_resets_interaction_state() {
    let mut core = three_in_a_row();
    core.set_connection_kind(ConnectionKind::Contains);
    core.toggle_connect_mode();
    click(&mut core, pt(10.0, 10.0));
    core.record_node_size("a", 300.0, 300.0);

    let mut other = diagram();
    other.camera = Camera { zoom: 2.0, offset_x: 5.0, offset_y: 5.0 };
    core.load_diagram(other);
    assert_eq!(core.gesture, Gesture::Idle);
    assert!(core.ui.active_id.is_none());
    assert!(core.sizes.measured.is_empty());
    assert_eq!(core.camera().zoom, 2.0);
    assert_eq!(core.ui.connection_kind, ConnectionKind::Contains);
}

#[test]
fn remote_patch_drops_stale_active_class() {
    let mut core = three_in_a_row();
    click(&mut core, pt(10.0, 10.0));
    let remaining: Vec<ClassNode> = core.doc.classes.iter().filter(|n| n.id != "a").cloned().collect();
    core.apply_remote(&DiagramPatch { classes: Some(remaining), ..DiagramPatch::default() });
    assert!(core.active().is_none());
    assert_eq!(core.doc.classes.len(), 2);
}

#[test]
fn remote_camera_waits_for_pan_to_finish() {
    let mut core = core_with(&[]);
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(10.0, 0.0), no_mods());
    core.apply_remote(&DiagramPatch::camera(Camera { zoom: 2.0, offset_x: 0.0, offset_y: 0.0 }));
    assert_eq!(core.camera().zoom, 1.0);
    assert_eq!(core.doc.camera.zoom, 2.0);
}

#[test]
fn measured_size_changes_hit_area() {
    let mut core = core_with(&[("a", 0.0, 0.0)]);
    click(&mut core, pt(10.0, 150.0));
    assert!(core.active().is_none());
    core.record_node_size("a", 192.0, 200.0);
    click(&mut core, pt(10.0, 150.0));
    assert_eq!(core.active().map(|n| n.id.as_str()), Some("a"));
}
