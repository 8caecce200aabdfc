use super::*;
use time::macros::datetime;

fn diagram() -> Diagram {
    Diagram::new("Test", datetime!(2024-01-01 0:00 UTC))
}

// =============================================================================
// built-in assets
// =============================================================================

#[test]
fn all_builtin_templates_parse() {
    let templates = builtin().unwrap();
    assert_eq!(templates.len(), 6);
    for template in &templates {
        assert!(!template.classes.is_empty(), "{} has no classes", template.key);
        for link in &template.connections {
            assert!(template.classes.iter().any(|c| c.id == link.from), "{}: dangling {}", template.key, link.from);
            assert!(template.classes.iter().any(|c| c.id == link.to), "{}: dangling {}", template.key, link.to);
        }
    }
}

#[test]
fn keys_match_embedded_documents() {
    for key in builtin_keys() {
        assert_eq!(find(key).unwrap().key, key);
    }
}

#[test]
fn unknown_key_is_an_error() {
    assert!(matches!(find("mvp"), Err(TemplateError::Unknown(k)) if k == "mvp"));
}

#[test]
fn malformed_json_is_an_error() {
    assert!(matches!(parse("broken", "{"), Err(TemplateError::Malformed { .. })));
}

// =============================================================================
// placement
// =============================================================================

#[test]
fn placement_wraps_every_three() {
    assert_eq!(placement_offset(0), Point::new(0.0, 0.0));
    assert_eq!(placement_offset(2), Point::new(600.0, 0.0));
    assert_eq!(placement_offset(4), Point::new(300.0, 200.0));
    assert_eq!(placement_offset(6), Point::new(0.0, 400.0));
}

// =============================================================================
// apply_template
// =============================================================================

#[test]
fn apply_to_empty_diagram_copies_classes_and_connections() {
    let mut d = diagram();
    let template = find("mvc").unwrap();
    d.apply_patch(&apply_template(&d, &template));

    assert_eq!(d.classes.len(), 4);
    assert_eq!(d.connections.len(), 4);
    let model = d.classes.iter().find(|c| c.name == "GameModel").unwrap();
    assert_eq!(model.position, Point::new(100.0, 100.0));
    assert_eq!(model.category, "Gameplay");
    assert_eq!(model.properties.len(), 4);
    assert!(template.classes.iter().all(|t| d.node(&t.id).is_none()), "ids are fresh");
    assert_eq!(d.prune_connections(), 0, "every connection points at a new class");
}

#[test]
fn apply_offsets_by_existing_class_count() {
    let mut d = diagram();
    let template = find("mvc").unwrap();
    d.apply_patch(&apply_template(&d, &template));
    d.apply_patch(&apply_template(&d, &template));

    // Second application sees 4 existing classes: offset (300, 200).
    let second_model = d.classes.iter().filter(|c| c.name == "GameModel").nth(1).unwrap();
    assert_eq!(second_model.position, Point::new(400.0, 300.0));
    assert_eq!(d.classes.len(), 8);
    assert_eq!(d.connections.len(), 8);
}

#[test]
fn apply_merges_new_categories_once() {
    let mut d = diagram();
    d.categories = vec!["Gameplay".into()];
    d.apply_patch(&apply_template(&d, &find("ecs").unwrap()));
    assert_eq!(d.categories, vec!["Gameplay", "System"]);
}

#[test]
fn apply_skips_dangling_self_and_duplicate_links() {
    let json = r#"{
        "key": "tiny",
        "name": "Tiny",
        "classes": [
            { "id": "a", "name": "A", "position": { "x": 0, "y": 0 } },
            { "id": "b", "name": "B", "category": "Audio", "position": { "x": 200, "y": 0 } }
        ],
        "connections": [
            { "from": "a", "to": "b", "type": "uses" },
            { "from": "b", "to": "a", "type": "creates" },
            { "from": "a", "to": "a" },
            { "from": "a", "to": "ghost" }
        ]
    }"#;
    let template = parse("tiny", json).unwrap();
    let mut d = diagram();
    d.apply_patch(&apply_template(&d, &template));

    assert_eq!(d.connections.len(), 1);
    assert_eq!(d.connections[0].kind, ConnectionKind::Uses);
    assert_eq!(d.classes[0].category, "Gameplay", "missing category falls back");
    assert!(d.categories.contains(&"Audio".to_string()));
}
