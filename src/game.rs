//! Game kinds — campaign type discriminant and per-game config union.
//!
//! DESIGN
//! ======
//! A campaign's `type` string selects which game builder owns the session.
//! The session's game settings are a tagged union so the merger can pattern
//! match on the variant instead of guessing from object shape. Each variant
//! keeps a flattened `extra` map so builder settings this crate does not
//! model still round-trip.

use serde::{Deserialize, Serialize};

use crate::document::JsonMap;

// =============================================================================
// CAMPAIGN TYPE
// =============================================================================

/// Campaign type discriminant parsed from the document's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CampaignType {
    Wheel,
    Quiz,
    Scratch,
    Jackpot,
    Form,
    /// Any type without a dedicated game builder (landing pages, etc.).
    Other,
}

impl CampaignType {
    /// Parse a raw `type` string. Unknown values map to [`CampaignType::Other`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wheel" | "spin_wheel" | "fortune_wheel" => Self::Wheel,
            "quiz" => Self::Quiz,
            "scratch" | "scratch_card" | "scratchcard" => Self::Scratch,
            "jackpot" | "slot" | "slot_machine" => Self::Jackpot,
            "form" => Self::Form,
            _ => Self::Other,
        }
    }

    /// Key under which this kind's settings nest inside `game_config`.
    #[must_use]
    pub fn game_key(self) -> Option<&'static str> {
        match self {
            Self::Wheel => Some("wheel"),
            Self::Quiz => Some("quiz"),
            Self::Scratch => Some("scratch"),
            Self::Jackpot => Some("jackpot"),
            Self::Form => Some("form"),
            Self::Other => None,
        }
    }
}

// =============================================================================
// GAME CONFIG
// =============================================================================

/// Session-owned settings for one game builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GameConfig {
    Wheel(WheelConfig),
    Quiz(QuizConfig),
    Scratch(ScratchConfig),
    Jackpot(JackpotConfig),
    Form(FormConfig),
}

impl GameConfig {
    /// The campaign type this variant belongs to.
    #[must_use]
    pub fn campaign_type(&self) -> CampaignType {
        match self {
            Self::Wheel(_) => CampaignType::Wheel,
            Self::Quiz(_) => CampaignType::Quiz,
            Self::Scratch(_) => CampaignType::Scratch,
            Self::Jackpot(_) => CampaignType::Jackpot,
            Self::Form(_) => CampaignType::Form,
        }
    }

    /// Serialize the variant body (without the `kind` tag) as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be represented as JSON.
    pub fn to_json_object(&self) -> Result<JsonMap, serde_json::Error> {
        let value = match self {
            Self::Wheel(c) => serde_json::to_value(c)?,
            Self::Quiz(c) => serde_json::to_value(c)?,
            Self::Scratch(c) => serde_json::to_value(c)?,
            Self::Jackpot(c) => serde_json::to_value(c)?,
            Self::Form(c) => serde_json::to_value(c)?,
        };
        match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Ok(JsonMap::from_iter([("value".to_owned(), other)])),
        }
    }

    /// Lay this variant over the previously stored body of the same game.
    ///
    /// Modeled fields come from `self` alone, so clearing an optional field
    /// removes it. Keys the variant does not model are carried forward from
    /// `previous` unless `self.extra` sets them. A `previous` body that does
    /// not parse as this variant is kept whole underneath.
    ///
    /// # Errors
    ///
    /// Returns an error if the variant body cannot be represented as JSON.
    pub fn merge_over(&self, previous: &JsonMap) -> Result<JsonMap, serde_json::Error> {
        let mut merged = self.unmodeled(previous).unwrap_or_else(|_| previous.clone());
        merged.extend(self.to_json_object()?);
        Ok(merged)
    }

    fn unmodeled(&self, previous: &JsonMap) -> Result<JsonMap, serde_json::Error> {
        let value = serde_json::Value::Object(previous.clone());
        Ok(match self {
            Self::Wheel(_) => serde_json::from_value::<WheelConfig>(value)?.extra,
            Self::Quiz(_) => serde_json::from_value::<QuizConfig>(value)?.extra,
            Self::Scratch(_) => serde_json::from_value::<ScratchConfig>(value)?.extra,
            Self::Jackpot(_) => serde_json::from_value::<JackpotConfig>(value)?.extra,
            Self::Form(_) => serde_json::from_value::<FormConfig>(value)?.extra,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelConfig {
    #[serde(default)]
    pub segments: Vec<WheelSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_color: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelSegment {
    pub label: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<u32>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub text: String,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScratchConfig {
    #[serde(default)]
    pub cards: Vec<ScratchCard>,
    /// Fraction of the cover that must be scratched before reveal (0..=1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_threshold: Option<f64>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScratchCard {
    pub prize: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_probability: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JackpotConfig {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reel_count: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_probability: Option<f64>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;
