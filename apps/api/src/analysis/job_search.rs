//! Job-search link shown next to a finished review.

const JOB_SEARCH_BASE_URL: &str = "https://www.naukri.com";
const DEFAULT_ROLE: &str = "software developer";
const DEFAULT_LOCATION: &str = "india";
const MAX_KEYWORDS: usize = 6;

const STOP_WORDS: &[&str] = &[
    "and", "or", "the", "a", "an", "to", "with", "for", "of", "in", "on", "at", "by", "is", "are",
    "will", "be", "as", "this", "that", "you", "we", "our",
];

/// Up to six search keywords: lower-cased, punctuation dropped, short and stop words skipped.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| word.len() > 2 && !STOP_WORDS.contains(word))
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

/// Search URL for roles matching `job_title`, e.g. `.../senior-rust-engineer-jobs-in-india`.
pub fn job_search_url(job_title: &str) -> String {
    let keywords = extract_keywords(job_title);
    let keywords = if keywords.is_empty() {
        slug(DEFAULT_ROLE)
    } else {
        keywords.join("-")
    };
    format!(
        "{JOB_SEARCH_BASE_URL}/{keywords}-jobs-in-{}",
        slug(DEFAULT_LOCATION)
    )
}

fn slug(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
