//! Submission URL validation

use once_cell::sync::Lazy;
use regex::Regex;

use crate::progression::{ProgressionError, Result};

/// `http(s)://[www.]github.com/<owner>/<repo>[/...]`
static GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(www\.)?github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+(/.*)?$")
        .expect("GitHub URL pattern is valid")
});

/// Trimmed URL if it points at a GitHub repository
pub fn validate_submission_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ProgressionError::rule("Submission URL is required"));
    }
    if !GITHUB_URL.is_match(url) {
        return Err(ProgressionError::rule(
            "Submission URL must be a GitHub repository URL",
        ));
    }
    Ok(url)
}
