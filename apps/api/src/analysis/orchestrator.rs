//! Analysis pipeline — drives one resume submission from raw document to stored feedback.
//!
//! Stages run strictly in order:
//! Idle → UploadingDocument → ConvertingDocument → UploadingImage → PersistingDraft →
//! RequestingFeedback → ParsingFeedback → PersistingFinal → Complete,
//! with `Failed` reachable from any non-terminal stage.
//!
//! The draft record (empty feedback) is written before the provider is asked,
//! so a run that fails afterwards still leaves a discoverable record. Nothing is
//! rolled back on failure and nothing is retried here; a retry is a new run
//! with a new id.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analysis::feedback::{fallback_feedback, parse_feedback, FeedbackParseError};
use crate::analysis::prompts::prepare_instructions;
use crate::analysis::provider::FeedbackProvider;
use crate::document::{ConversionError, DocumentConverter, UploadedDocument};
use crate::llm_client::LlmError;
use crate::models::resume::ResumeRecord;
use crate::storage::{StorageError, StorageGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    UploadingDocument,
    ConvertingDocument,
    UploadingImage,
    PersistingDraft,
    RequestingFeedback,
    ParsingFeedback,
    PersistingFinal,
    Complete,
    Failed,
}

impl PipelineStage {
    /// User-facing status text shown while the stage is in progress.
    pub fn status_text(self) -> &'static str {
        match self {
            PipelineStage::Idle => "Waiting for a resume...",
            PipelineStage::UploadingDocument => "Uploading the file...",
            PipelineStage::ConvertingDocument => "Converting to image...",
            PipelineStage::UploadingImage => "Uploading the image...",
            PipelineStage::PersistingDraft => "Preparing data...",
            PipelineStage::RequestingFeedback => "Analyzing...",
            PipelineStage::ParsingFeedback => "Reading the analysis...",
            PipelineStage::PersistingFinal => "Saving the analysis...",
            PipelineStage::Complete => "Analysis complete",
            PipelineStage::Failed => "Analysis failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Complete | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::UploadingDocument => "uploading the document",
            PipelineStage::ConvertingDocument => "converting the document",
            PipelineStage::UploadingImage => "uploading the preview image",
            PipelineStage::PersistingDraft => "persisting the draft record",
            PipelineStage::RequestingFeedback => "requesting feedback",
            PipelineStage::ParsingFeedback => "parsing feedback",
            PipelineStage::PersistingFinal => "persisting the final record",
            PipelineStage::Complete => "complete",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One transition of a run, as published on the status channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    pub record_id: Uuid,
    pub stage: PipelineStage,
    pub message: String,
}

pub type StatusSender = mpsc::UnboundedSender<PipelineStatus>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("document conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("no readable text could be extracted from the document")]
    EmptyText,

    /// Recovered inside the run by the fallback feedback; never carried by an `AnalysisFailure`.
    #[error("AI provider unavailable: {0}")]
    AiUnavailable(#[from] LlmError),

    #[error(transparent)]
    Parse(#[from] FeedbackParseError),

    #[error("record storage failed: {0}")]
    Storage(#[source] StorageError),
}

/// A failed run. `record_id` is stable even when nothing was persisted under it.
#[derive(Debug, Error)]
#[error("analysis {record_id} failed while {stage}: {error}")]
pub struct AnalysisFailure {
    pub record_id: Uuid,
    pub stage: PipelineStage,
    #[source]
    pub error: AnalysisError,
}

impl AnalysisFailure {
    /// Terminal, human-readable status for the failed run.
    pub fn status_message(&self) -> String {
        let message = match (&self.error, self.stage) {
            (AnalysisError::Upload(_), PipelineStage::UploadingImage) => "Failed to upload image",
            (AnalysisError::Upload(_), _) => "Failed to upload file",
            (AnalysisError::Conversion(_), _) => "Failed to convert PDF to image",
            (AnalysisError::EmptyText, _) => {
                "Could not extract text from PDF. Please ensure the PDF contains readable text."
            }
            // Only reachable if a caller builds the failure by hand.
            (AnalysisError::AiUnavailable(_), _) => "AI analysis is unavailable",
            (AnalysisError::Parse(_), _) => "Invalid analysis response from AI",
            (AnalysisError::Storage(_), PipelineStage::PersistingFinal) => {
                "Failed to save the analysis"
            }
            (AnalysisError::Storage(_), _) => "Failed to save the resume record",
        };
        format!("Error: {message}")
    }
}

/// Caller-supplied inputs of one analysis.
#[derive(Debug, Clone)]
pub struct Submission {
    pub document: UploadedDocument,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
}

pub struct AnalysisOrchestrator {
    storage: StorageGateway,
    converter: Arc<dyn DocumentConverter>,
    provider: Arc<dyn FeedbackProvider>,
}

impl AnalysisOrchestrator {
    pub fn new(
        storage: StorageGateway,
        converter: Arc<dyn DocumentConverter>,
        provider: Arc<dyn FeedbackProvider>,
    ) -> Self {
        Self {
            storage,
            converter,
            provider,
        }
    }

    /// Runs the full pipeline and returns the id of the completed record.
    ///
    /// Every transition is published on `status` (when given); the last message is
    /// either `Analysis complete: <id>` or an `Error: ...` description.
    pub async fn analyze(
        &self,
        submission: Submission,
        status: Option<StatusSender>,
    ) -> Result<Uuid, AnalysisFailure> {
        let mut run = PipelineRun::new(Uuid::new_v4(), status);

        match self.run_stages(&mut run, submission).await {
            Ok(()) => {
                run.complete();
                Ok(run.record_id)
            }
            Err(error) => {
                let failure = AnalysisFailure {
                    record_id: run.record_id,
                    stage: run.stage,
                    error,
                };
                run.fail(&failure);
                Err(failure)
            }
        }
    }

    async fn run_stages(
        &self,
        run: &mut PipelineRun,
        submission: Submission,
    ) -> Result<(), AnalysisError> {
        let Submission {
            document,
            company_name,
            job_title,
            job_description,
        } = submission;

        run.enter(PipelineStage::UploadingDocument);
        let resume_path = self
            .storage
            .put_blob(document.bytes.clone(), &document.file_name)
            .await
            .map_err(AnalysisError::Upload)?;

        run.enter(PipelineStage::ConvertingDocument);
        let converted = self.converter.convert(&document).await?;
        if converted.extracted_text.trim().is_empty() {
            return Err(AnalysisError::EmptyText);
        }

        run.enter(PipelineStage::UploadingImage);
        let image_path = self
            .storage
            .put_blob(converted.image_bytes, &converted.image_name)
            .await
            .map_err(AnalysisError::Upload)?;

        run.enter(PipelineStage::PersistingDraft);
        let mut record = ResumeRecord::draft(
            run.record_id,
            resume_path,
            image_path,
            company_name,
            job_title,
            job_description,
        );
        self.storage
            .put_record(&record)
            .await
            .map_err(AnalysisError::Storage)?;

        run.enter(PipelineStage::RequestingFeedback);
        let instructions = prepare_instructions(&record.job_title, &record.job_description);
        let response = self
            .provider
            .request_feedback(&converted.extracted_text, &instructions)
            .await
            .map_err(AnalysisError::from);

        let feedback = match response {
            Ok(raw) => {
                run.enter(PipelineStage::ParsingFeedback);
                parse_feedback(&raw)?
            }
            Err(unavailable) => {
                warn!(
                    "Record {}: {}; using fallback feedback",
                    run.record_id, unavailable
                );
                fallback_feedback()
            }
        };

        debug!(
            "Record {}: overall {} ({})",
            run.record_id,
            feedback.overall_score,
            feedback
                .categories()
                .iter()
                .map(|(name, category)| format!("{name}={}", category.score))
                .collect::<Vec<_>>()
                .join(", ")
        );

        run.enter(PipelineStage::PersistingFinal);
        debug_assert!(record.is_pending(), "feedback is set exactly once");
        record.feedback = Some(feedback);
        self.storage
            .put_record(&record)
            .await
            .map_err(AnalysisError::Storage)?;

        Ok(())
    }
}

/// Stage bookkeeping and status publishing for one run.
struct PipelineRun {
    record_id: Uuid,
    stage: PipelineStage,
    status: Option<StatusSender>,
}

impl PipelineRun {
    fn new(record_id: Uuid, status: Option<StatusSender>) -> Self {
        let run = Self {
            record_id,
            stage: PipelineStage::Idle,
            status,
        };
        run.publish(PipelineStage::Idle.status_text().to_string());
        run
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug_assert!(!self.stage.is_terminal(), "run already finished");
        self.stage = stage;
        info!("Record {}: {}", self.record_id, stage);
        self.publish(stage.status_text().to_string());
    }

    fn complete(&mut self) {
        self.stage = PipelineStage::Complete;
        info!("Record {}: analysis complete", self.record_id);
        self.publish(format!("Analysis complete: {}", self.record_id));
    }

    fn fail(&mut self, failure: &AnalysisFailure) {
        self.stage = PipelineStage::Failed;
        error!("{failure}");
        self.publish(failure.status_message());
    }

    fn publish(&self, message: String) {
        let Some(status) = &self.status else {
            return;
        };
        let update = PipelineStatus {
            record_id: self.record_id,
            stage: self.stage,
            message,
        };
        if status.send(update).is_err() {
            debug!("Record {}: status receiver dropped", self.record_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::provider::testing::ScriptedProvider;
    use crate::document::testing::StaticConverter;
    use crate::storage::memory::{InMemoryKvStore, InMemoryObjectStore};
    use crate::storage::KeyValueStore;
    use bytes::Bytes;

    const RESUME_TEXT: &str = "Senior Engineer, 5 years Go and distributed systems";
    const FENCED_FEEDBACK: &str = "```json\n{\"overallScore\":82,\"ATS\":{\"score\":78,\"tips\":[]},\"toneAndStyle\":{\"score\":85,\"tips\":[]},\"content\":{\"score\":80,\"tips\":[]},\"structure\":{\"score\":88,\"tips\":[]},\"skills\":{\"score\":79,\"tips\":[]}}\n```";

    struct Harness {
        orchestrator: AnalysisOrchestrator,
        storage: StorageGateway,
        objects: Arc<InMemoryObjectStore>,
        kv: Arc<InMemoryKvStore>,
        provider: Arc<ScriptedProvider>,
    }

    fn harness(converter: StaticConverter, provider: ScriptedProvider) -> Harness {
        let objects = Arc::new(InMemoryObjectStore::default());
        let kv = Arc::new(InMemoryKvStore::default());
        let storage = StorageGateway::new(objects.clone(), kv.clone());
        let provider = Arc::new(provider);
        let orchestrator =
            AnalysisOrchestrator::new(storage.clone(), Arc::new(converter), provider.clone());
        Harness {
            orchestrator,
            storage,
            objects,
            kv,
            provider,
        }
    }

    fn submission() -> Submission {
        Submission {
            document: UploadedDocument {
                file_name: "resume.pdf".to_string(),
                bytes: Bytes::from_static(b"%PDF-1.7 fake"),
            },
            company_name: "Acme".to_string(),
            job_title: "Distributed Systems Engineer".to_string(),
            job_description: "Go, Kafka, consensus".to_string(),
        }
    }

    async fn analyze_collecting(
        h: &Harness,
    ) -> (Result<Uuid, AnalysisFailure>, Vec<PipelineStatus>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = h.orchestrator.analyze(submission(), Some(tx)).await;
        let mut statuses = Vec::new();
        while let Ok(status) = rx.try_recv() {
            statuses.push(status);
        }
        (result, statuses)
    }

    async fn only_record(h: &Harness) -> ResumeRecord {
        let records = h.storage.list_records("resume:").await.unwrap();
        assert_eq!(records.len(), 1);
        records.into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn test_fenced_provider_response_is_stored() {
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        let id = h.orchestrator.analyze(submission(), None).await.unwrap();

        let record = h.storage.get_record(id).await.unwrap().unwrap();
        let feedback = record.feedback.as_ref().unwrap();
        assert_eq!(feedback.overall_score, 82);
        assert_eq!(feedback.structure.score, 88);
        assert_eq!(record.company_name, "Acme");
        assert_eq!(h.storage.read_blob(&record.resume_path).await.unwrap(), &b"%PDF-1.7 fake"[..]);
        assert!(record.image_path.ends_with("resume.png"));
    }

    #[tokio::test]
    async fn test_provider_receives_text_and_job_context() {
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        h.orchestrator.analyze(submission(), None).await.unwrap();

        let requests = h.provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, RESUME_TEXT);
        assert!(requests[0].1.contains("Distributed Systems Engineer"));
        assert!(requests[0].1.contains("Go, Kafka, consensus"));
    }

    #[tokio::test]
    async fn test_success_walks_every_stage_in_order() {
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        let (result, statuses) = analyze_collecting(&h).await;
        let id = result.unwrap();

        let stages: Vec<PipelineStage> = statuses.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                PipelineStage::Idle,
                PipelineStage::UploadingDocument,
                PipelineStage::ConvertingDocument,
                PipelineStage::UploadingImage,
                PipelineStage::PersistingDraft,
                PipelineStage::RequestingFeedback,
                PipelineStage::ParsingFeedback,
                PipelineStage::PersistingFinal,
                PipelineStage::Complete,
            ]
        );
        assert!(statuses.iter().all(|s| s.record_id == id));
        assert_eq!(statuses[1].message, "Uploading the file...");
        assert_eq!(statuses[5].message, "Analyzing...");
        assert_eq!(statuses.last().unwrap().message, format!("Analysis complete: {id}"));
    }

    #[tokio::test]
    async fn test_unavailable_provider_falls_back() {
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::unavailable(503),
        );
        let (result, statuses) = analyze_collecting(&h).await;
        let id = result.expect("fallback must not fail the run");

        let feedback = h.storage.get_record(id).await.unwrap().unwrap().feedback.unwrap();
        assert_eq!(feedback, fallback_feedback());
        assert_eq!(feedback.overall_score, 75);
        assert_eq!(feedback.ats.score, 70);
        assert_eq!(feedback.tone_and_style.score, 80);
        assert_eq!(feedback.content.score, 75);
        assert_eq!(feedback.structure.score, 85);
        assert_eq!(feedback.skills.score, 70);

        assert!(!statuses.iter().any(|s| s.stage == PipelineStage::ParsingFeedback));
        assert!(!statuses.iter().any(|s| s.message.starts_with("Error:")));
        assert_eq!(statuses.last().unwrap().stage, PipelineStage::Complete);
    }

    #[tokio::test]
    async fn test_truncated_response_fails_and_keeps_draft() {
        let truncated = &FENCED_FEEDBACK[..60];
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::answering(truncated),
        );
        let (result, statuses) = analyze_collecting(&h).await;
        let failure = result.unwrap_err();

        assert!(matches!(failure.error, AnalysisError::Parse(_)));
        assert_eq!(failure.stage, PipelineStage::ParsingFeedback);

        let record = h.storage.get_record(failure.record_id).await.unwrap().unwrap();
        assert!(record.is_pending(), "draft must not be overwritten");
        assert_eq!(h.objects.len(), 2, "uploaded artifacts are kept");

        let last = statuses.last().unwrap();
        assert_eq!(last.stage, PipelineStage::Failed);
        assert_eq!(last.message, "Error: Invalid analysis response from AI");
    }

    #[tokio::test]
    async fn test_whitespace_text_is_empty_text_before_any_ai_call() {
        let h = harness(
            StaticConverter::with_text(" \n\t  "),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        let (result, statuses) = analyze_collecting(&h).await;
        let failure = result.unwrap_err();

        assert!(matches!(failure.error, AnalysisError::EmptyText));
        assert_eq!(failure.stage, PipelineStage::ConvertingDocument);
        assert_eq!(h.provider.request_count(), 0);
        assert!(h.storage.get_record(failure.record_id).await.unwrap().is_none());
        assert!(statuses
            .last()
            .unwrap()
            .message
            .starts_with("Error: Could not extract text from PDF"));
    }

    #[tokio::test]
    async fn test_single_character_text_is_not_empty() {
        let h = harness(
            StaticConverter::with_text("  x  "),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        assert!(h.orchestrator.analyze(submission(), None).await.is_ok());
        assert_eq!(h.provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_conversion_failure_aborts() {
        let h = harness(
            StaticConverter::failing(),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        let (result, statuses) = analyze_collecting(&h).await;
        let failure = result.unwrap_err();

        assert!(matches!(failure.error, AnalysisError::Conversion(_)));
        assert_eq!(failure.stage, PipelineStage::ConvertingDocument);
        assert_eq!(
            statuses.last().unwrap().message,
            "Error: Failed to convert PDF to image"
        );
        assert_eq!(h.provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_document_upload() {
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        h.objects.reject_uploads();
        let (result, statuses) = analyze_collecting(&h).await;
        let failure = result.unwrap_err();

        assert!(matches!(failure.error, AnalysisError::Upload(StorageError::Upload(_))));
        assert_eq!(failure.stage, PipelineStage::UploadingDocument);
        assert_eq!(statuses.last().unwrap().message, "Error: Failed to upload file");
    }

    #[tokio::test]
    async fn test_image_upload_transport_error() {
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        h.objects.fail_after(1);
        let (result, statuses) = analyze_collecting(&h).await;
        let failure = result.unwrap_err();

        assert!(matches!(
            failure.error,
            AnalysisError::Upload(StorageError::ObjectStore(_))
        ));
        assert_eq!(failure.stage, PipelineStage::UploadingImage);
        assert_eq!(statuses.last().unwrap().message, "Error: Failed to upload image");
        assert!(h.kv.list("*", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_final_write_failure_leaves_draft() {
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::answering(FENCED_FEEDBACK),
        );
        h.kv.fail_writes_after(1);
        let failure = h.orchestrator.analyze(submission(), None).await.unwrap_err();

        assert!(matches!(failure.error, AnalysisError::Storage(_)));
        assert_eq!(failure.stage, PipelineStage::PersistingFinal);
        assert_eq!(failure.status_message(), "Error: Failed to save the analysis");
        let record = only_record(&h).await;
        assert_eq!(record.id, failure.record_id);
        assert!(record.is_pending());
    }

    #[tokio::test]
    async fn test_each_run_gets_its_own_record() {
        let h = harness(
            StaticConverter::with_text(RESUME_TEXT),
            ScriptedProvider::unavailable(500),
        );
        let first = h.orchestrator.analyze(submission(), None).await.unwrap();
        let second = h.orchestrator.analyze(submission(), None).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(h.storage.list_records("resume:").await.unwrap().len(), 2);
    }

    #[test]
    fn test_failure_display_names_stage_and_record() {
        let id = Uuid::new_v4();
        let failure = AnalysisFailure {
            record_id: id,
            stage: PipelineStage::ConvertingDocument,
            error: AnalysisError::EmptyText,
        };
        assert_eq!(
            failure.to_string(),
            format!("analysis {id} failed while converting the document: no readable text could be extracted from the document")
        );
    }
}
