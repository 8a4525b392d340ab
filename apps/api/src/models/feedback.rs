//! Structured analysis output produced by the AI feedback provider.
//!
//! Field names mirror the JSON the provider is instructed to return
//! (`overallScore`, `ATS`, `toneAndStyle`, ...), so the same shape is used for
//! parsing provider output and for the persisted record.

use serde::{Deserialize, Deserializer, Serialize};

/// Lowest and highest score a category or the overall result may carry.
pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    /// ATS tips are often returned without an explanation.
    #[serde(default)]
    pub explanation: String,
}

impl Tip {
    pub fn new(kind: TipKind, tip: &str, explanation: &str) -> Self {
        Self {
            kind,
            tip: tip.to_string(),
            explanation: explanation.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFeedback {
    #[serde(deserialize_with = "clamped_score")]
    pub score: u8,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResult {
    #[serde(rename = "overallScore", deserialize_with = "clamped_score")]
    pub overall_score: u8,
    #[serde(rename = "ATS")]
    pub ats: CategoryFeedback,
    #[serde(rename = "toneAndStyle")]
    pub tone_and_style: CategoryFeedback,
    pub content: CategoryFeedback,
    pub structure: CategoryFeedback,
    pub skills: CategoryFeedback,
}

impl FeedbackResult {
    /// The five categories in display order, paired with their wire names.
    pub fn categories(&self) -> [(&'static str, &CategoryFeedback); 5] {
        [
            ("ATS", &self.ats),
            ("toneAndStyle", &self.tone_and_style),
            ("content", &self.content),
            ("structure", &self.structure),
            ("skills", &self.skills),
        ]
    }
}

/// Accepts any JSON number, rounds it and clamps it into `[MIN_SCORE, MAX_SCORE]`.
/// Providers occasionally emit `87.5`, `105` or `-3`; none of these should sink an analysis.
fn clamped_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Err(serde::de::Error::custom("score must be a finite number"));
    }
    Ok(raw.round().clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8)
}
