use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::feedback::FeedbackResult;

/// One resume submission and its eventual feedback.
///
/// Everything except `feedback` is fixed once the draft is written. `feedback`
/// is persisted as the empty string while the analysis is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: Uuid,
    pub resume_path: String,
    pub image_path: String,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    #[serde(with = "pending_feedback")]
    pub feedback: Option<FeedbackResult>,
}

impl ResumeRecord {
    /// A record whose artifacts are stored but whose feedback is still pending.
    pub fn draft(
        id: Uuid,
        resume_path: String,
        image_path: String,
        company_name: String,
        job_title: String,
        job_description: String,
    ) -> Self {
        Self {
            id,
            resume_path,
            image_path,
            company_name,
            job_title,
            job_description,
            feedback: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.feedback.is_none()
    }
}

/// `feedback` is either `""` (pending) or a full `FeedbackResult` object.
mod pending_feedback {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::models::feedback::FeedbackResult;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Ready(FeedbackResult),
        Text(String),
        Null(()),
    }

    pub fn serialize<S>(feedback: &Option<FeedbackResult>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match feedback {
            Some(result) => result.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<FeedbackResult>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Stored::deserialize(deserializer)? {
            Stored::Ready(result) => Ok(Some(result)),
            Stored::Text(text) if text.is_empty() => Ok(None),
            Stored::Text(_) => Err(serde::de::Error::custom(
                "feedback must be empty or a feedback object",
            )),
            Stored::Null(()) => Ok(None),
        }
    }
}
