//! Editor state slices.
//!
//! DESIGN
//! ======
//! `EditorSlices` is one snapshot of every independently mutated fragment of
//! editor state. Panels mutate their own slice locally and the host hands the
//! whole snapshot to the scheduler via `notify`. A `None` slice means "this
//! session has not touched it", so the merge keeps the previous document's
//! value instead of clearing it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{Background, CanvasElement, Device, FormField, ModularPage};
use crate::game::GameConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSlices {
    pub canvas_elements: Option<Vec<CanvasElement>>,
    pub modular_page: Option<ModularPage>,
    pub screen_backgrounds: Option<BTreeMap<String, Background>>,
    pub extracted_colors: Option<Vec<String>>,
    pub selected_device: Option<Device>,
    pub canvas_zoom: Option<f64>,
    pub game_config: Option<GameConfig>,
    /// Campaign title from the editor header.
    pub name: Option<String>,
    pub canvas_background: Option<Background>,
    pub mobile_background: Option<Background>,
    /// Background image chosen explicitly in the design panel.
    pub background_image: Option<String>,
    pub mobile_background_image: Option<String>,
    pub form_fields: Option<Vec<FormField>>,
}

impl EditorSlices {
    /// True when the session has not touched any slice.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
