// Resume analysis: submission → stored artifacts → AI feedback → versioned record.
// All provider calls go through the FeedbackProvider seam; all persistence through StorageGateway.

pub mod feedback;
pub mod handlers;
pub mod job_search;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
