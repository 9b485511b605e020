//! Canonical campaign document — the single shape accepted by the store.
//!
//! DESIGN
//! ======
//! Every section the editor touches is typed, and every level carries a
//! flattened `extra` map. Keys written by other tools (or by newer editor
//! builds) therefore survive a load → merge → save cycle untouched, which
//! is what makes the merge additive rather than a replace.
//!
//! All maps are ordered (`BTreeMap`, `serde_json::Map` without
//! `preserve_order`), so serializing the same document twice always yields
//! the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::CampaignType;

/// Free-form JSON object. Alias to reduce noise in signatures.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// LEAF TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Tablet,
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Color,
    Image,
    Gradient,
}

/// Background descriptor for a canvas or a single screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    /// Color string, gradient CSS, or image URL depending on `kind`.
    pub value: String,
}

impl Background {
    #[must_use]
    pub fn color(value: impl Into<String>) -> Self {
        Self { kind: BackgroundKind::Color, value: value.into() }
    }

    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self { kind: BackgroundKind::Image, value: url.into() }
    }

    /// The image URL if this is a non-empty image background.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        (self.kind == BackgroundKind::Image && !self.value.is_empty()).then_some(self.value.as_str())
    }
}

/// A positioned visual element on the free-form canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasElement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_id: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl CanvasElement {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            x,
            y,
            width: None,
            height: None,
            rotation: None,
            screen_id: None,
            extra: JsonMap::new(),
        }
    }
}

/// One block of the modular (stacked) page layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Per-screen ordered module lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModularPage {
    #[serde(default)]
    pub screens: BTreeMap<String, Vec<Module>>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Screens every new campaign starts with.
pub const DEFAULT_SCREENS: [&str; 3] = ["screen1", "screen2", "screen3"];

impl ModularPage {
    /// Three empty screens: the layout of a campaign nobody has edited yet.
    #[must_use]
    pub fn with_default_screens() -> Self {
        let screens = DEFAULT_SCREENS
            .iter()
            .map(|name| ((*name).to_owned(), Vec::new()))
            .collect();
        Self { screens, extra: JsonMap::new() }
    }
}

/// A field of the lead-capture form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_field_kind")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

fn default_field_kind() -> String {
    "text".to_owned()
}

// =============================================================================
// SECTIONS
// =============================================================================

/// `config.canvasConfig`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasConfig {
    #[serde(default)]
    pub elements: Vec<CanvasElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_backgrounds: Option<BTreeMap<String, Background>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_background: Option<Background>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// `config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_config: Option<CanvasConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modular_page: Option<ModularPage>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// `design`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_backgrounds: Option<BTreeMap<String, Background>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_colors: Option<Vec<String>>,
    /// Every image referenced by the current canvas and modules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_images: Vec<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

// =============================================================================
// CANONICAL DOCUMENT
// =============================================================================

/// How a document's identifier should be treated by the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// No id yet: the store must `create` it.
    Missing,
    /// Locally generated (preview, temp): must never reach the store.
    Placeholder,
    /// Store-issued: written with `update`.
    Persisted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub campaign_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub config: CampaignConfig,
    #[serde(default)]
    pub game_config: JsonMap,
    #[serde(default)]
    pub design: DesignConfig,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
    /// Store-managed columns (owner, timestamps, ...) carried through verbatim.
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl CanonicalDocument {
    /// A fresh, unsaved draft.
    #[must_use]
    pub fn draft(name: impl Into<String>, campaign_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            campaign_type: campaign_type.into(),
            status: Some("draft".to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn kind(&self) -> CampaignType {
        CampaignType::parse(&self.campaign_type)
    }

    #[must_use]
    pub fn id_kind(&self) -> IdKind {
        match self.id.as_deref() {
            None => IdKind::Missing,
            Some(id) if is_persistable_id(id) => IdKind::Persisted,
            Some(_) => IdKind::Placeholder,
        }
    }
}

/// Whether `id` looks like a store-issued identifier (a non-nil UUID).
///
/// Preview and temp ids such as `quick-preview-123` are rejected.
#[must_use]
pub fn is_persistable_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok_and(|uuid| !uuid.is_nil())
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
