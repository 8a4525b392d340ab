//! Feedback parsing — turns the provider's raw text into a `FeedbackResult`.
//!
//! Pure text-to-structure: the caller has already unwrapped the response
//! envelope. A malformed payload is rejected whole; nothing is partially applied.

use thiserror::Error;

use crate::models::feedback::{CategoryFeedback, FeedbackResult, Tip, TipKind};

/// How much of the offending payload is echoed in the error's Display output.
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Error)]
#[error("invalid analysis response ({source}): {}", preview(.text))]
pub struct FeedbackParseError {
    /// The payload as handed to the decoder, after fence stripping.
    pub text: String,
    #[source]
    pub source: serde_json::Error,
}

pub fn parse_feedback(raw: &str) -> Result<FeedbackResult, FeedbackParseError> {
    let text = strip_code_fence(raw);
    serde_json::from_str(text).map_err(|source| FeedbackParseError {
        text: text.to_string(),
        source,
    })
}

/// Strips a surrounding code fence such as ```` ```json ... ``` ```` or ```` ``` ... ``` ````.
/// Text without a leading fence is returned trimmed and otherwise untouched.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // optional language hint right after the opening fence
    let body = rest
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .trim_start();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Substituted when the provider cannot be reached or answers with nothing.
pub fn fallback_feedback() -> FeedbackResult {
    FeedbackResult {
        overall_score: 75,
        ats: CategoryFeedback {
            score: 70,
            tips: vec![Tip::new(
                TipKind::Improve,
                "Add more relevant keywords",
                "Include industry-specific terms from the job description",
            )],
        },
        tone_and_style: CategoryFeedback {
            score: 80,
            tips: vec![Tip::new(
                TipKind::Good,
                "Professional tone maintained",
                "The resume uses appropriate professional language",
            )],
        },
        content: CategoryFeedback {
            score: 75,
            tips: vec![Tip::new(
                TipKind::Improve,
                "Add quantifiable achievements",
                "Include specific metrics and results from your work experience",
            )],
        },
        structure: CategoryFeedback {
            score: 85,
            tips: vec![Tip::new(
                TipKind::Good,
                "Clear section organization",
                "Resume sections are well-organized and easy to read",
            )],
        },
        skills: CategoryFeedback {
            score: 70,
            tips: vec![Tip::new(
                TipKind::Improve,
                "Tailor skills to job",
                "Prioritize skills that match the job requirements",
            )],
        },
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}
