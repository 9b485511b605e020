//! Payload merger — folds editor slices into the canonical document.
//!
//! DESIGN
//! ======
//! The merge is additive and section by section. It starts from the previous
//! canonical document and overrides only what the session owns (a `Some`
//! slice). Everything else, including keys this crate does not model, is
//! carried through. The one exception is `design.customImages`, which is
//! recomputed from the merged canvas and modules every time so it always
//! lists exactly the images currently in use.
//!
//! Pure: no I/O, no clock, no randomness. Equal inputs give byte-identical
//! output.

use std::collections::HashSet;

use serde_json::Value;

use crate::document::{
    Background, CampaignConfig, CanonicalDocument, CanvasConfig, CanvasElement, DesignConfig, FormField, JsonMap,
    ModularPage,
};
use crate::game::{CampaignType, GameConfig};
use crate::state::EditorSlices;

/// Keys whose string values are image references.
pub const IMAGE_KEYS: [&str; 6] = ["src", "image", "imageUrl", "backgroundImage", "logoUrl", "thumbnailUrl"];

/// Render-time form field keys that must never be persisted.
pub const TRANSIENT_FIELD_KEYS: [&str; 4] = ["computedPlaceholder", "renderKey", "isEditing", "validationState"];

/// Build the canonical document for `slices` on top of `previous`.
#[must_use]
pub fn merge(previous: &CanonicalDocument, slices: &EditorSlices, campaign_type: CampaignType) -> CanonicalDocument {
    let canvas = merge_canvas(previous.config.canvas_config.as_ref(), slices);
    let modular_page = slices
        .modular_page
        .clone()
        .or_else(|| previous.config.modular_page.clone())
        .unwrap_or_else(ModularPage::with_default_screens);
    let design = merge_design(&previous.design, slices, &canvas, &modular_page);

    let form_fields = match &slices.form_fields {
        Some(fields) => normalize_form_fields(fields),
        None => normalize_form_fields(&previous.form_fields),
    };

    CanonicalDocument {
        id: previous.id.clone(),
        name: slices.name.clone().unwrap_or_else(|| previous.name.clone()),
        campaign_type: previous.campaign_type.clone(),
        status: previous.status.clone(),
        config: CampaignConfig {
            canvas_config: Some(canvas),
            modular_page: Some(modular_page),
            extra: previous.config.extra.clone(),
        },
        game_config: merge_game_config(&previous.game_config, slices.game_config.as_ref(), campaign_type),
        design,
        form_fields,
        start_date: previous.start_date.clone(),
        end_date: previous.end_date.clone(),
        thumbnail_url: previous.thumbnail_url.clone(),
        banner_url: previous.banner_url.clone(),
        extra: previous.extra.clone(),
    }
}

// =============================================================================
// CONFIG
// =============================================================================

fn merge_canvas(previous: Option<&CanvasConfig>, slices: &EditorSlices) -> CanvasConfig {
    let mut canvas = previous.cloned().unwrap_or_default();
    if let Some(elements) = &slices.canvas_elements {
        canvas.elements.clone_from(elements);
    }
    if let Some(backgrounds) = &slices.screen_backgrounds {
        canvas.screen_backgrounds = Some(backgrounds.clone());
    }
    if let Some(device) = slices.selected_device {
        canvas.device = Some(device);
    }
    if let Some(zoom) = slices.canvas_zoom {
        canvas.zoom = Some(zoom);
    }
    if let Some(background) = &slices.canvas_background {
        canvas.background = Some(background.clone());
    }
    if let Some(background) = &slices.mobile_background {
        canvas.mobile_background = Some(background.clone());
    }
    canvas
}

// =============================================================================
// DESIGN
// =============================================================================

fn merge_design(
    previous: &DesignConfig,
    slices: &EditorSlices,
    canvas: &CanvasConfig,
    modular_page: &ModularPage,
) -> DesignConfig {
    DesignConfig {
        background_image: pick_image(
            slices.background_image.as_deref(),
            canvas.background.as_ref(),
            previous.background_image.as_deref(),
        ),
        mobile_background_image: pick_image(
            slices.mobile_background_image.as_deref(),
            canvas.mobile_background.as_ref(),
            previous.mobile_background_image.as_deref(),
        ),
        screen_backgrounds: slices
            .screen_backgrounds
            .clone()
            .or_else(|| previous.screen_backgrounds.clone()),
        extracted_colors: slices
            .extracted_colors
            .clone()
            .or_else(|| previous.extracted_colors.clone()),
        custom_images: collect_custom_images(&canvas.elements, modular_page),
        extra: previous.extra.clone(),
    }
}

/// Explicit design value, else an image canvas background, else the previous value.
fn pick_image(explicit: Option<&str>, background: Option<&Background>, previous: Option<&str>) -> Option<String> {
    explicit
        .filter(|url| !url.is_empty())
        .or_else(|| background.and_then(Background::image_url))
        .or(previous)
        .map(str::to_owned)
}

/// Every image referenced by canvas elements, then modules (screens in key
/// order), deduplicated in first-seen order.
#[must_use]
pub fn collect_custom_images(elements: &[CanvasElement], modular_page: &ModularPage) -> Vec<String> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();
    for element in elements {
        collect_from_map(&element.extra, &mut images, &mut seen);
    }
    for module in modular_page.screens.values().flatten() {
        collect_from_map(&module.extra, &mut images, &mut seen);
    }
    images
}

fn collect_from_map(map: &JsonMap, images: &mut Vec<String>, seen: &mut HashSet<String>) {
    for (key, value) in map {
        match value {
            Value::String(url) if IMAGE_KEYS.contains(&key.as_str()) => {
                if !url.is_empty() && seen.insert(url.clone()) {
                    images.push(url.clone());
                }
            }
            Value::Object(inner) => collect_from_map(inner, images, seen),
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        collect_from_map(inner, images, seen);
                    }
                }
            }
            _ => {}
        }
    }
}

// =============================================================================
// GAME CONFIG
// =============================================================================

fn merge_game_config(previous: &JsonMap, session: Option<&GameConfig>, campaign_type: CampaignType) -> JsonMap {
    let mut merged = previous.clone();
    let Some(key) = campaign_type.game_key() else {
        return merged;
    };
    // EDGE: a variant for another game kind is not owned by this campaign.
    let Some(config) = session.filter(|c| c.campaign_type() == campaign_type) else {
        return merged;
    };
    let previous_body = match merged.get(key) {
        Some(Value::Object(existing)) => existing.clone(),
        _ => JsonMap::new(),
    };
    let Ok(body) = config.merge_over(&previous_body) else {
        return merged;
    };
    merged.insert(key.to_owned(), Value::Object(body));
    merged
}

// =============================================================================
// FORM FIELDS
// =============================================================================

fn is_transient_key(key: &str) -> bool {
    key.starts_with('_') || TRANSIENT_FIELD_KEYS.contains(&key)
}

/// Strip render-time sub-fields before persisting.
#[must_use]
pub fn normalize_form_fields(fields: &[FormField]) -> Vec<FormField> {
    fields
        .iter()
        .cloned()
        .map(|mut field| {
            field.extra.retain(|key, _| !is_transient_key(key));
            field
        })
        .collect()
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
