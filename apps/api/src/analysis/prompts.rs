// Resume feedback prompt templates.
// All prompts for the analysis module are defined here.

pub const FEEDBACK_SYSTEM: &str = "\
You are an expert in ATS (Applicant Tracking System) and resume analysis. \
You MUST respond with valid JSON only — no markdown fences, no explanations. \
Be thorough and honest: a low score is more useful than a flattering one.";

/// Exact shape the provider must return. Mirrors `FeedbackResult`.
pub const RESPONSE_FORMAT: &str = r#"{
  "overallScore": number,            // 0-100
  "ATS": {
    "score": number,                 // 0-100, how well the resume would pass an ATS scan
    "tips": [{"type": "good" | "improve", "tip": "string"}]
  },
  "toneAndStyle": {
    "score": number,
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "detailed explanation"}]
  },
  "content": {
    "score": number,
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "detailed explanation"}]
  },
  "structure": {
    "score": number,
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "detailed explanation"}]
  },
  "skills": {
    "score": number,
    "tips": [{"type": "good" | "improve", "tip": "short title", "explanation": "detailed explanation"}]
  }
}"#;

pub const INSTRUCTIONS_TEMPLATE: &str = r#"Analyze and rate this resume and suggest how to improve it.
The rating can be low if the resume is bad.
If provided, take the job description into consideration.

JOB TITLE: {job_title}
JOB DESCRIPTION: {job_description}

Provide 3-4 tips per category. Scores are integers from 0 to 100.

OUTPUT SCHEMA (return exactly this structure):
{response_format}

Return ONLY the JSON object — nothing else, no code fences."#;

pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"{instructions}

RESUME TEXT:
{resume_text}"#;

/// Instructions for one analysis, built from the caller's job context.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    INSTRUCTIONS_TEMPLATE
        .replace("{job_title}", or_not_provided(job_title))
        .replace("{job_description}", or_not_provided(job_description))
        .replace("{response_format}", RESPONSE_FORMAT)
}

/// Full user prompt: instructions followed by the extracted resume text.
pub fn build_feedback_prompt(instructions: &str, resume_text: &str) -> String {
    FEEDBACK_PROMPT_TEMPLATE
        .replace("{instructions}", instructions)
        .replace("{resume_text}", resume_text.trim())
}

fn or_not_provided(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() {
        "(not provided)"
    } else {
        value
    }
}
