//! Change fingerprint — cheap digest of the save-worthy part of a document.
//!
//! DESIGN
//! ======
//! Only a fixed whitelist is digested: `id`, `name`, `config`, the canvas
//! element count, the modular screen count, the screen background keys, and
//! the design color / custom image counts. Everything is projected into a
//! small JSON value with sorted keys and hashed with SHA-256, so the same
//! logical content always yields the same fingerprint regardless of the
//! order fields were inserted upstream.
//!
//! Fields outside the whitelist do not move the fingerprint: `game_config`,
//! `form_fields`, the design background images, and the individual color and
//! custom image values (only their counts are digested). An edit that
//! touches only those fields is skipped as unchanged until a whitelisted
//! field changes too. Hosts that let users edit them should call
//! `AutosaveScheduler::mark_dirty` with such an edit so the next save
//! writes; the teardown flush writes regardless.
//!
//! ERROR HANDLING
//! ==============
//! Serialization failures never propagate. They produce the sentinel
//! fingerprint, which matches nothing, so the caller saves instead of
//! skipping.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The "unknown" fingerprint. Never matches, not even itself.
    #[must_use]
    pub fn sentinel() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether two fingerprints prove the content is unchanged.
    #[must_use]
    pub fn matches(&self, other: &Fingerprint) -> bool {
        !self.is_sentinel() && !other.is_sentinel() && self.0 == other.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            f.write_str("<sentinel>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Fingerprint any document-shaped value (full, partial, or raw JSON).
pub fn fingerprint<T: Serialize + ?Sized>(document: &T) -> Fingerprint {
    let value = match serde_json::to_value(document) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "fingerprint serialization failed; forcing save");
            return Fingerprint::sentinel();
        }
    };

    let projected = sorted(project(&value));
    match serde_json::to_vec(&projected) {
        Ok(bytes) => Fingerprint(hex_digest(&bytes)),
        Err(e) => {
            warn!(error = %e, "fingerprint encoding failed; forcing save");
            Fingerprint::sentinel()
        }
    }
}

fn project(doc: &Value) -> Value {
    let config = doc.get("config").cloned().unwrap_or(Value::Null);
    let canvas = config.get("canvasConfig");
    let design = doc.get("design");

    let canvas_element_count = canvas
        .and_then(|c| c.get("elements"))
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let modular_screen_count = config
        .get("modularPage")
        .and_then(|p| p.get("screens"))
        .and_then(Value::as_object)
        .map_or(0, Map::len);

    let mut screen_background_keys = BTreeSet::new();
    for source in [canvas, design] {
        if let Some(map) = source
            .and_then(|s| s.get("screenBackgrounds"))
            .and_then(Value::as_object)
        {
            screen_background_keys.extend(map.keys().cloned());
        }
    }

    let design_count = |key: &str| {
        design
            .and_then(|d| d.get(key))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    };

    json!({
        "id": doc.get("id").cloned().unwrap_or(Value::Null),
        "name": doc.get("name").cloned().unwrap_or(Value::Null),
        "config": config,
        "canvas_element_count": canvas_element_count,
        "modular_screen_count": modular_screen_count,
        "screen_background_keys": screen_background_keys,
        "design_color_count": design_count("extractedColors"),
        "design_custom_image_count": design_count("customImages"),
    })
}

/// Rebuild every object with its keys in sorted order.
fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
#[path = "fingerprint_test.rs"]
mod tests;
