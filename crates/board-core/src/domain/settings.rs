//! The settings document and its normalization rules.
//!
//! The status board has exactly one configuration document.  It arrives from
//! many places (the bundled default file, the persisted file, an admin's POST
//! body, a frame on the push feed) and every one of those sources may be
//! partial or malformed.  [`normalize`] is the single gate through which all of
//! them pass: whatever goes in, a fully-populated [`Settings`] comes out.
//!
//! # Normalization rules
//!
//! ```text
//! normalize(candidate) = defaults
//!                        overlaid by every well-typed key of the candidate
//!                        except bullets/slides, which replace the default
//!                        wholesale only when non-empty and well-formed
//! ```
//!
//! A malformed `bullets` or `slides` value degrades to the *default* sequence,
//! never to an empty one and never to an element-wise merge.  Keys the board
//! does not know about are carried through untouched in [`Settings::extra`].
//!
//! # Serde representation
//!
//! Field names are camelCase on the wire (`goalAmount`, `donationUrl`, ...).
//! Deserializing a `Settings` from any JSON value runs [`normalize`], so a
//! decode can never produce a partial document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON keys owned by [`Settings`]; everything else lands in `extra`.
const KNOWN_KEYS: [&str; 8] = [
    "goalAmount",
    "raisedAmount",
    "currency",
    "locale",
    "donationUrl",
    "bullets",
    "slides",
    "slideSeconds",
];

/// One slide of the rotating slideshow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// Image URL.  An empty string means "use the gradient background".
    pub src: String,
    /// Headline shown over the slide.
    pub title: String,
    /// Sub-headline shown under the title.
    pub sub: String,
}

impl Slide {
    fn new(src: &str, title: &str, sub: &str) -> Self {
        Self {
            src: src.to_string(),
            title: title.to_string(),
            sub: sub.to_string(),
        }
    }
}

/// The single configuration document shown by every display.
///
/// A `Settings` value is always fully populated.  Build one from untrusted
/// JSON with [`normalize`] (or by deserializing, which calls it for you).
///
/// # Example
///
/// ```rust
/// use board_core::{normalize, Settings};
/// use serde_json::json;
///
/// let settings = normalize(&json!({ "goalAmount": 5000, "raisedAmount": 1200 }));
/// assert_eq!(settings.goal_amount, 5000.0);
/// assert_eq!(settings.currency, Settings::default().currency);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct Settings {
    /// Fundraising target.  Never negative.
    pub goal_amount: f64,
    /// Amount raised so far.  Never negative; may exceed the goal.
    pub raised_amount: f64,
    /// ISO 4217 currency code used by displays for formatting.
    pub currency: String,
    /// BCP 47 locale used by displays for number formatting.
    pub locale: String,
    /// Donation page, rendered as a QR code by displays.
    pub donation_url: String,
    /// Short call-to-action lines.
    pub bullets: Vec<String>,
    /// Slideshow contents, shown in order.
    pub slides: Vec<Slide>,
    /// Seconds per slide as entered by the admin.  See
    /// [`Settings::slide_interval`] for the value displays should use.
    pub slide_seconds: f64,
    /// Keys supplied by an editor that the board does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            goal_amount: 0.0,
            raised_amount: 0.0,
            currency: "EUR".to_string(),
            locale: "nl-NL".to_string(),
            donation_url: "https://voorbeeld.nl/doneren".to_string(),
            bullets: vec![
                "Elke bijdrage telt".to_string(),
                "Scan de QR-code om te doneren".to_string(),
                "Hartelijk dank voor uw steun".to_string(),
            ],
            slides: vec![
                Slide::new("", "Welkom", "Samen bouwen we verder"),
                Slide::new("", "Steun ons project", "Iedere gift brengt ons dichter bij het doel"),
            ],
            slide_seconds: 8.0,
            extra: Map::new(),
        }
    }
}

impl From<Value> for Settings {
    fn from(value: Value) -> Self {
        normalize(&value)
    }
}

/// Turns any JSON value into a fully-populated [`Settings`].
///
/// This function is total and idempotent: `normalize(to_json(normalize(x)))`
/// equals `normalize(x)` for every `x`.  A candidate that is not a JSON object
/// yields the default document.
pub fn normalize(candidate: &Value) -> Settings {
    let defaults = Settings::default();
    let Some(fields) = candidate.as_object() else {
        return defaults;
    };

    let extra: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Settings {
        goal_amount: amount(fields.get("goalAmount")).unwrap_or(defaults.goal_amount),
        raised_amount: amount(fields.get("raisedAmount")).unwrap_or(defaults.raised_amount),
        currency: text(fields.get("currency")).unwrap_or(defaults.currency),
        locale: text(fields.get("locale")).unwrap_or(defaults.locale),
        donation_url: text(fields.get("donationUrl")).unwrap_or(defaults.donation_url),
        bullets: bullets(fields.get("bullets")).unwrap_or(defaults.bullets),
        slides: slides(fields.get("slides")).unwrap_or(defaults.slides),
        slide_seconds: seconds(fields.get("slideSeconds")).unwrap_or(defaults.slide_seconds),
        extra,
    }
}

// ── Field readers ─────────────────────────────────────────────────────────────
//
// Each reader returns `None` when the candidate's value is missing or has the
// wrong shape; the caller then substitutes the default.

fn amount(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n >= 0.0)
}

fn seconds(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n > 0.0)
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn bullets(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array().filter(|items| !items.is_empty())?;
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn slides(value: Option<&Value>) -> Option<Vec<Slide>> {
    let items = value?.as_array().filter(|items| !items.is_empty())?;
    items.iter().map(slide).collect()
}

fn slide(value: &Value) -> Option<Slide> {
    let fields = value.as_object()?;
    Some(Slide {
        src: text(fields.get("src"))?,
        title: text(fields.get("title"))?,
        sub: text(fields.get("sub"))?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn custom_slides() -> Value {
        json!([
            { "src": "/img/a.jpg", "title": "A", "sub": "first" },
            { "src": "", "title": "B", "sub": "second" }
        ])
    }

    // ── Scalars ───────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_empty_object_yields_defaults() {
        // Arrange / Act
        let settings = normalize(&json!({}));

        // Assert
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_normalize_non_object_yields_defaults() {
        assert_eq!(normalize(&json!("not an object")), Settings::default());
        assert_eq!(normalize(&json!(42)), Settings::default());
        assert_eq!(normalize(&json!([1, 2, 3])), Settings::default());
        assert_eq!(normalize(&Value::Null), Settings::default());
    }

    #[test]
    fn test_normalize_overlays_supplied_amounts() {
        // Arrange
        let candidate = json!({ "goalAmount": 5000, "raisedAmount": 1200 });

        // Act
        let settings = normalize(&candidate);

        // Assert
        assert_eq!(settings.goal_amount, 5000.0);
        assert_eq!(settings.raised_amount, 1200.0);
        assert_eq!(settings.locale, "nl-NL");
        assert_eq!(settings.slides, Settings::default().slides);
    }

    #[test]
    fn test_normalize_negative_amount_falls_back_to_default() {
        let settings = normalize(&json!({ "goalAmount": -10, "raisedAmount": 3 }));
        assert_eq!(settings.goal_amount, 0.0);
        assert_eq!(settings.raised_amount, 3.0);
    }

    #[test]
    fn test_normalize_mistyped_scalar_falls_back_to_default() {
        // A numeric string is not a number; the default wins.
        let settings = normalize(&json!({ "goalAmount": "5000", "currency": 978 }));
        assert_eq!(settings.goal_amount, 0.0);
        assert_eq!(settings.currency, "EUR");
    }

    #[test]
    fn test_normalize_zero_slide_seconds_falls_back_to_default() {
        let settings = normalize(&json!({ "slideSeconds": 0 }));
        assert_eq!(settings.slide_seconds, 8.0);
    }

    #[test]
    fn test_normalize_keeps_short_slide_seconds_for_consumers_to_clamp() {
        let settings = normalize(&json!({ "slideSeconds": 1 }));
        assert_eq!(settings.slide_seconds, 1.0);
    }

    // ── Bullets ───────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_replaces_bullets_wholesale() {
        let settings = normalize(&json!({ "bullets": ["only one"] }));
        assert_eq!(settings.bullets, vec!["only one".to_string()]);
    }

    #[test]
    fn test_normalize_empty_bullets_fall_back_to_default() {
        let settings = normalize(&json!({ "bullets": [] }));
        assert_eq!(settings.bullets, Settings::default().bullets);
    }

    #[test]
    fn test_normalize_non_array_bullets_fall_back_to_default() {
        let settings = normalize(&json!({ "bullets": "a, b, c" }));
        assert_eq!(settings.bullets, Settings::default().bullets);
    }

    #[test]
    fn test_normalize_bullets_with_one_bad_element_fall_back_to_default() {
        // Partial sequences are never merged element by element.
        let settings = normalize(&json!({ "bullets": ["fine", 7, "also fine"] }));
        assert_eq!(settings.bullets, Settings::default().bullets);
    }

    // ── Slides ────────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_passes_well_formed_slides_through_exactly() {
        // Arrange
        let candidate = json!({ "slides": custom_slides() });

        // Act
        let settings = normalize(&candidate);

        // Assert
        assert_eq!(settings.slides.len(), 2);
        assert_eq!(settings.slides[0], Slide::new("/img/a.jpg", "A", "first"));
        assert_eq!(settings.slides[1], Slide::new("", "B", "second"));
    }

    #[test]
    fn test_normalize_empty_slides_fall_back_to_default() {
        let settings = normalize(&json!({ "slides": [] }));
        assert_eq!(settings.slides, Settings::default().slides);
        assert!(!settings.slides.is_empty());
    }

    #[test]
    fn test_normalize_slide_missing_field_falls_back_to_default() {
        let settings = normalize(&json!({ "slides": [{ "src": "", "title": "no sub" }] }));
        assert_eq!(settings.slides, Settings::default().slides);
    }

    #[test]
    fn test_normalize_slide_with_non_string_field_falls_back_to_default() {
        let settings = normalize(&json!({ "slides": [{ "src": "", "title": 1, "sub": "" }] }));
        assert_eq!(settings.slides, Settings::default().slides);
    }

    #[test]
    fn test_normalize_object_slides_fall_back_to_default() {
        let settings = normalize(&json!({ "slides": { "0": { "src": "", "title": "", "sub": "" } } }));
        assert_eq!(settings.slides, Settings::default().slides);
    }

    // ── Unknown keys ──────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_preserves_unknown_keys() {
        let settings = normalize(&json!({ "theme": "dark", "goalAmount": 10 }));
        assert_eq!(settings.extra.get("theme"), Some(&json!("dark")));
        assert!(!settings.extra.contains_key("goalAmount"));
    }

    // ── Serde ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_serialize_uses_camel_case_keys() {
        let value = serde_json::to_value(Settings::default()).expect("serialize");
        let fields = value.as_object().expect("object");
        for key in KNOWN_KEYS {
            assert!(fields.contains_key(key), "missing key {key}");
        }
        assert!(!fields.contains_key("goal_amount"));
        assert!(!fields.contains_key("extra"), "extra must be flattened");
    }

    #[test]
    fn test_serialize_flattens_unknown_keys_to_top_level() {
        let settings = normalize(&json!({ "theme": "dark" }));
        let value = serde_json::to_value(&settings).expect("serialize");
        assert_eq!(value["theme"], json!("dark"));
    }

    #[test]
    fn test_deserialize_partial_document_is_normalized() {
        // Arrange: a frame carrying only two fields
        let text = r#"{"goalAmount": 250, "slides": []}"#;

        // Act
        let settings: Settings = serde_json::from_str(text).expect("deserialize");

        // Assert
        assert_eq!(settings.goal_amount, 250.0);
        assert_eq!(settings.slides, Settings::default().slides);
        assert_eq!(settings.bullets, Settings::default().bullets);
    }

    #[test]
    fn test_normalize_is_idempotent_through_json() {
        let candidates = [
            json!({}),
            json!(null),
            json!({ "goalAmount": 1.5, "raisedAmount": 0.25, "theme": { "dark": true } }),
            json!({ "slides": custom_slides(), "bullets": ["x"] }),
            json!({ "slides": [], "bullets": [1], "slideSeconds": -3 }),
        ];

        for candidate in candidates {
            let once = normalize(&candidate);
            let twice = normalize(&serde_json::to_value(&once).expect("serialize"));
            assert_eq!(once, twice, "normalize must be idempotent for {candidate}");
        }
    }
}
