//! Integration tests for the settings normalization rules.
//!
//! These tests exercise `normalize`, the serde representation, and the push
//! frames together through the public API, the way the server and the feed
//! client use them.

use board_core::{decode_frame, encode_frame, normalize, ServerFrame, Settings, Slide};
use serde_json::{json, Value};

/// A spread of candidates covering missing, partial, malformed, and
/// well-formed inputs.
fn candidates() -> Vec<Value> {
    vec![
        json!(null),
        json!(true),
        json!("not json-parseable"),
        json!([]),
        json!({}),
        json!({ "goalAmount": 5000, "raisedAmount": 1200 }),
        json!({ "goalAmount": -1, "raisedAmount": f64::MAX }),
        json!({ "currency": "USD", "locale": "en-US", "donationUrl": "https://example.org" }),
        json!({ "bullets": [], "slides": [] }),
        json!({ "bullets": ["x", null], "slides": [{}] }),
        json!({ "bullets": ["één", "twee"], "slides": [{ "src": "a", "title": "b", "sub": "c" }] }),
        json!({ "slideSeconds": 0.1, "nested": { "keep": [1, 2, 3] } }),
    ]
}

#[test]
fn test_normalize_is_idempotent_for_all_candidates() {
    for candidate in candidates() {
        // Act
        let once = normalize(&candidate);
        let reencoded = serde_json::to_value(&once).expect("serialize");
        let twice = normalize(&reencoded);

        // Assert
        assert_eq!(once, twice, "normalize(normalize(x)) != normalize(x) for {candidate}");
    }
}

#[test]
fn test_missing_or_malformed_sequences_use_defaults() {
    let defaults = Settings::default();
    let inputs = [
        json!({}),
        json!({ "bullets": null, "slides": null }),
        json!({ "bullets": [], "slides": [] }),
        json!({ "bullets": {}, "slides": "slide" }),
        json!({ "bullets": [1, 2], "slides": [{ "src": "", "title": "" }] }),
    ];

    for input in inputs {
        let settings = normalize(&input);
        assert_eq!(settings.bullets, defaults.bullets, "bullets for {input}");
        assert_eq!(settings.slides, defaults.slides, "slides for {input}");
    }
}

#[test]
fn test_partial_replace_scenario_overlays_defaults() {
    // Arrange: the admin only changes the two amounts
    let candidate = json!({ "goalAmount": 5000, "raisedAmount": 1200 });

    // Act
    let settings = normalize(&candidate);

    // Assert: {..defaults.., goalAmount: 5000, raisedAmount: 1200}
    let expected = Settings {
        goal_amount: 5000.0,
        raised_amount: 1200.0,
        ..Settings::default()
    };
    assert_eq!(settings, expected);
}

#[test]
fn test_well_formed_slides_are_never_merged_with_defaults() {
    let candidate = json!({ "slides": [{ "src": "/x.png", "title": "Only", "sub": "slide" }] });
    let settings = normalize(&candidate);
    assert_eq!(
        settings.slides,
        vec![Slide {
            src: "/x.png".to_string(),
            title: "Only".to_string(),
            sub: "slide".to_string(),
        }]
    );
}

#[test]
fn test_settings_frame_survives_the_wire() {
    // Arrange
    let settings = normalize(&json!({ "goalAmount": 750, "theme": "night" }));
    let frame = ServerFrame::Settings {
        revision: 12,
        settings: settings.clone(),
    };

    // Act
    let text = encode_frame(&frame).expect("encode");
    let decoded: ServerFrame = decode_frame(&text).expect("decode");

    // Assert
    assert_eq!(decoded, ServerFrame::Settings { revision: 12, settings });
}
