use super::*;

#[test]
fn persistable_id_accepts_store_uuid() {
    assert!(is_persistable_id("5f0c7a52-3d1e-4b8e-9a43-0c2b7f1d9e61"));
}

#[test]
fn persistable_id_rejects_placeholders() {
    assert!(!is_persistable_id("quick-preview-123"));
    assert!(!is_persistable_id("temp-1700000000"));
    assert!(!is_persistable_id(""));
    assert!(!is_persistable_id("00000000-0000-0000-0000-000000000000"));
}

#[test]
fn id_kind_classifies_documents() {
    let mut doc = CanonicalDocument::draft("Spring promo", "wheel");
    assert_eq!(doc.id_kind(), IdKind::Missing);

    doc.id = Some("quick-preview-123".into());
    assert_eq!(doc.id_kind(), IdKind::Placeholder);

    doc.id = Some(Uuid::new_v4().to_string());
    assert_eq!(doc.id_kind(), IdKind::Persisted);
}

#[test]
fn draft_parses_campaign_kind() {
    let doc = CanonicalDocument::draft("Quiz night", "quiz");
    assert_eq!(doc.kind(), CampaignType::Quiz);
    assert_eq!(doc.status.as_deref(), Some("draft"));
}

#[test]
fn default_screens_are_three_empty_lists() {
    let page = ModularPage::with_default_screens();
    assert_eq!(page.screens.len(), 3);
    assert!(page.screens.values().all(Vec::is_empty));
    assert!(page.screens.contains_key("screen1"));
}

#[test]
fn background_image_url_only_for_non_empty_images() {
    assert_eq!(Background::image("https://cdn.test/bg.png").image_url(), Some("https://cdn.test/bg.png"));
    assert_eq!(Background::image("").image_url(), None);
    assert_eq!(Background::color("#fff").image_url(), None);
}

#[test]
fn unknown_fields_survive_round_trip() {
    let json = serde_json::json!({
        "id": "5f0c7a52-3d1e-4b8e-9a43-0c2b7f1d9e61",
        "name": "Legacy",
        "type": "wheel",
        "owner_id": "u-1",
        "config": {
            "canvasConfig": {
                "elements": [{ "id": "e1", "type": "text", "x": 10, "y": 20, "fontFamily": "Inter" }],
                "gridSize": 8
            },
            "legacyFlag": true
        },
        "design": { "primaryColor": "#123456" },
        "game_config": { "wheel": { "segments": [] } },
        "form_fields": [{ "id": "email", "label": "Email", "type": "email", "required": true, "hint": "work" }]
    });

    let doc: CanonicalDocument = serde_json::from_value(json).unwrap();
    assert_eq!(doc.extra["owner_id"], "u-1");
    assert_eq!(doc.config.extra["legacyFlag"], true);
    let canvas = doc.config.canvas_config.as_ref().unwrap();
    assert_eq!(canvas.extra["gridSize"], 8);
    assert_eq!(canvas.elements[0].extra["fontFamily"], "Inter");
    assert_eq!(doc.design.extra["primaryColor"], "#123456");
    assert_eq!(doc.form_fields[0].extra["hint"], "work");

    let back = serde_json::to_value(&doc).unwrap();
    assert_eq!(back["owner_id"], "u-1");
    assert_eq!(back["config"]["canvasConfig"]["gridSize"], 8);
    assert_eq!(back["config"]["legacyFlag"], true);
    assert_eq!(back["design"]["primaryColor"], "#123456");
}

#[test]
fn form_field_kind_defaults_to_text() {
    let field: FormField = serde_json::from_value(serde_json::json!({ "id": "name" })).unwrap();
    assert_eq!(field.kind, "text");
    assert!(!field.required);
}
