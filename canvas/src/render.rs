//! Rendering: draws the diagram scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It reads engine state and produces pixels; it never mutates application
//! state.
//!
//! Class boxes are drawn in world space under the camera transform.
//! Connections, the connect preview and the selection rectangle are drawn in
//! screen space because their geometry already comes out of the router and
//! gesture state in screen pixels.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::camera::{Camera, Point};
use crate::consts::{GRID_SPACING, NODE_HEADER_HEIGHT, NODE_LINE_HEIGHT, NODE_SECTION_HEADER_HEIGHT, NODE_VISIBLE_MEMBERS};
use crate::doc::{Access, ClassNode};
use crate::engine::EngineCore;
use crate::hit::{self, Rect};
use crate::input::{ConnectState, Gesture};
use crate::route::edge_style;

/// Selection / preview dash segment length in screen pixels.
const DASH_PX: f64 = 5.0;

/// Grid dots are skipped when they would sit closer than this on screen.
const MIN_GRID_SCREEN_PX: f64 = 8.0;

const SELECTION_COLOR: &str = "#1E90FF";

/// Draw the full scene.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(ctx: &CanvasRenderingContext2d, core: &EngineCore) -> Result<(), JsValue> {
    let camera = &core.camera;

    // Layer 1: clear in CSS pixels.
    ctx.set_transform(core.dpr, 0.0, 0.0, core.dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, core.viewport_width, core.viewport_height);
    draw_grid(ctx, camera, core.viewport_width, core.viewport_height);

    // Layer 2: connections, under the boxes.
    for (conn, route) in hit::routes(&core.doc, &core.sizes, camera) {
        let style = edge_style(conn.kind);
        let hovered = core.ui.hovered_connection.as_deref() == Some(conn.id.as_str());
        ctx.save();
        ctx.set_stroke_style_str(style.color);
        ctx.set_line_width(if hovered { style.width + 2.0 } else { style.width });
        ctx.set_line_dash(&dash(style.dash))?;
        ctx.begin_path();
        ctx.move_to(route.start.x, route.start.y);
        ctx.bezier_curve_to(route.c1.x, route.c1.y, route.c2.x, route.c2.y, route.end.x, route.end.y);
        ctx.stroke();
        draw_arrowhead(ctx, route.c2, route.end, style.color)?;
        ctx.restore();
    }

    // Layer 3: class boxes in world space, bottom first.
    ctx.save();
    ctx.translate(camera.offset_x, camera.offset_y)?;
    ctx.scale(camera.zoom, camera.zoom)?;
    for node in &core.doc.classes {
        let bounds = core.sizes.bounds(node);
        draw_class(ctx, node, bounds)?;
        let active = core.ui.active_id.as_deref() == Some(node.id.as_str());
        if active || core.ui.selected_ids.contains(&node.id) {
            draw_selection(ctx, bounds, camera.zoom, active)?;
        }
    }
    ctx.restore();

    // Layer 4: gesture overlays in screen space.
    match &core.gesture {
        Gesture::Connecting(ConnectState::AwaitingTarget { exit_point, pointer, .. }) => {
            draw_preview(ctx, camera.world_to_screen(*exit_point), camera.world_to_screen(*pointer))?;
        }
        Gesture::BoxSelecting { start, current } => {
            draw_selection_rect(ctx, Rect::from_corners(*start, *current))?;
        }
        _ => {}
    }

    Ok(())
}

// =============================================================
// Background
// =============================================================

fn draw_grid(ctx: &CanvasRenderingContext2d, camera: &Camera, width: f64, height: f64) {
    let step = GRID_SPACING * camera.zoom;
    if step < MIN_GRID_SCREEN_PX {
        return;
    }
    ctx.set_fill_style_str("#d1d5db");
    let mut x = camera.offset_x.rem_euclid(step);
    while x < width {
        let mut y = camera.offset_y.rem_euclid(step);
        while y < height {
            ctx.fill_rect(x - 0.5, y - 0.5, 1.0, 1.0);
            y += step;
        }
        x += step;
    }
}

// =============================================================
// Class boxes
// =============================================================

fn draw_class(ctx: &CanvasRenderingContext2d, node: &ClassNode, bounds: Rect) -> Result<(), JsValue> {
    let (fill, border) = category_colors(&node.category);
    ctx.save();

    ctx.set_fill_style_str(fill);
    ctx.fill_rect(bounds.x, bounds.y, bounds.width, bounds.height);
    ctx.set_stroke_style_str(border);
    ctx.set_line_width(2.0);
    ctx.stroke_rect(bounds.x, bounds.y, bounds.width, bounds.height);

    let left = bounds.x + 10.0;
    ctx.set_text_baseline("middle");
    ctx.set_text_align("left");

    ctx.set_fill_style_str("#111827");
    ctx.set_font("bold 14px sans-serif");
    ctx.fill_text(&node.name, left, bounds.y + 18.0)?;
    ctx.set_fill_style_str("#6b7280");
    ctx.set_font("11px sans-serif");
    ctx.fill_text(&node.category, left, bounds.y + 36.0)?;

    let mut y = bounds.y + NODE_HEADER_HEIGHT;
    if !node.properties.is_empty() {
        let lines: Vec<String> =
            node.properties.iter().map(|p| format!("{} {}: {}", access_glyph(p.access), p.name, p.ty)).collect();
        y = draw_section(ctx, "Properties", &lines, left, y)?;
    }
    if !node.methods.is_empty() {
        let lines: Vec<String> = node
            .methods
            .iter()
            .map(|m| format!("{} {}({}): {}", access_glyph(m.access), m.name, m.params, m.return_type))
            .collect();
        draw_section(ctx, "Methods", &lines, left, y)?;
    }

    ctx.restore();
    Ok(())
}

/// Draw a section title and up to the visible number of member lines.
/// Returns the y coordinate after the section.
fn draw_section(ctx: &CanvasRenderingContext2d, title: &str, lines: &[String], left: f64, top: f64) -> Result<f64, JsValue> {
    ctx.set_fill_style_str("#374151");
    ctx.set_font("bold 11px sans-serif");
    ctx.fill_text(title, left, top + NODE_SECTION_HEADER_HEIGHT / 2.0)?;

    ctx.set_font("11px monospace");
    let mut y = top + NODE_SECTION_HEADER_HEIGHT;
    for line in lines.iter().take(NODE_VISIBLE_MEMBERS) {
        ctx.fill_text(line, left, y + NODE_LINE_HEIGHT / 2.0)?;
        y += NODE_LINE_HEIGHT;
    }
    if let Some(more) = overflow_label(lines.len()) {
        ctx.set_fill_style_str("#9ca3af");
        ctx.fill_text(&more, left, y + NODE_LINE_HEIGHT / 2.0)?;
        y += NODE_LINE_HEIGHT;
    }
    Ok(y)
}

fn draw_selection(ctx: &CanvasRenderingContext2d, bounds: Rect, zoom: f64, active: bool) -> Result<(), JsValue> {
    let pad = 3.0 / zoom;
    ctx.save();
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(2.0 / zoom);
    if !active {
        ctx.set_line_dash(&dash(&[DASH_PX / zoom, DASH_PX / zoom]))?;
    }
    ctx.stroke_rect(bounds.x - pad, bounds.y - pad, bounds.width + pad * 2.0, bounds.height + pad * 2.0);
    ctx.restore();
    Ok(())
}

// =============================================================
// Overlays
// =============================================================

fn draw_preview(ctx: &CanvasRenderingContext2d, from: Point, to: Point) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(2.0);
    ctx.set_line_dash(&dash(&[DASH_PX, DASH_PX]))?;
    ctx.begin_path();
    ctx.move_to(from.x, from.y);
    ctx.line_to(to.x, to.y);
    ctx.stroke();

    // Source marker.
    ctx.set_line_dash(&js_sys::Array::new())?;
    ctx.set_fill_style_str(SELECTION_COLOR);
    ctx.begin_path();
    ctx.arc(from.x, from.y, 4.0, 0.0, 2.0 * PI)?;
    ctx.fill();
    ctx.restore();
    Ok(())
}

fn draw_selection_rect(ctx: &CanvasRenderingContext2d, rect: Rect) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_line_dash(&dash(&[DASH_PX, DASH_PX]))?;
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_fill_style_str("rgba(30, 144, 255, 0.12)");
    ctx.set_line_width(1.0);
    ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
    ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
    ctx.restore();
    Ok(())
}

fn draw_arrowhead(ctx: &CanvasRenderingContext2d, from: Point, tip: Point, color: &str) -> Result<(), JsValue> {
    const SIZE: f64 = 10.0;
    const HALF_ANGLE: f64 = PI / 6.0;
    let angle = (tip.y - from.y).atan2(tip.x - from.x);
    ctx.set_line_dash(&js_sys::Array::new())?;
    ctx.set_fill_style_str(color);
    ctx.begin_path();
    ctx.move_to(tip.x, tip.y);
    ctx.line_to(tip.x - SIZE * (angle - HALF_ANGLE).cos(), tip.y - SIZE * (angle - HALF_ANGLE).sin());
    ctx.line_to(tip.x - SIZE * (angle + HALF_ANGLE).cos(), tip.y - SIZE * (angle + HALF_ANGLE).sin());
    ctx.close_path();
    ctx.fill();
    Ok(())
}

// =============================================================
// Helpers
// =============================================================

fn dash(segments: &[f64]) -> js_sys::Array {
    let array = js_sys::Array::new();
    for segment in segments {
        array.push(&JsValue::from_f64(*segment));
    }
    array
}

fn access_glyph(access: Access) -> char {
    match access {
        Access::Public => '+',
        Access::Private => '-',
        Access::Protected => '#',
    }
}

/// "...and N more" line for sections longer than the visible limit.
fn overflow_label(count: usize) -> Option<String> {
    (count > NODE_VISIBLE_MEMBERS).then(|| format!("...and {} more", count - NODE_VISIBLE_MEMBERS))
}

/// Fill and border colour for a category. Unknown categories get a stable
/// colour picked from a hash of the name.
fn category_colors(category: &str) -> (&'static str, &'static str) {
    const FALLBACK: [(&str, &str); 6] = [
        ("#fce7f3", "#f472b6"),
        ("#e0e7ff", "#818cf8"),
        ("#ccfbf1", "#2dd4bf"),
        ("#ffedd5", "#fb923c"),
        ("#cffafe", "#22d3ee"),
        ("#ecfccb", "#a3e635"),
    ];
    match category {
        "Gameplay" => ("#dbeafe", "#60a5fa"),
        "System" => ("#dcfce7", "#4ade80"),
        "UI" => ("#f3e8ff", "#c084fc"),
        "Data" => ("#fef9c3", "#facc15"),
        "Network" => ("#fee2e2", "#f87171"),
        "" => ("#f3f4f6", "#9ca3af"),
        other => {
            let hash = other
                .encode_utf16()
                .fold(0_i32, |hash, unit| i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash)));
            FALLBACK[hash.unsigned_abs() as usize % FALLBACK.len()]
        }
    }
}
