//! JSON parsing helpers for advisor responses
//!
//! Models often wrap the JSON payload in extra prose; these helpers pull the
//! array out of the surrounding text before deserializing.

use crate::error::{Error, Result};

use super::CandidateRecommendation;

// Cut on a char boundary; responses are arbitrary model text, not ASCII.
fn truncate(s: &str) -> String {
    match s.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Parse a recommendation array from an advisor response
pub fn parse_recommendations(response: &str) -> Result<Vec<CandidateRecommendation>> {
    let response = response.trim();

    let start = response.find('[');
    let end = response.rfind(']');

    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::InvalidData(format!(
                    "Invalid JSON from advisor: {} | Raw: {}",
                    e,
                    truncate(json_str)
                ))
            })
        }
        _ => Err(Error::InvalidData(format!(
            "No JSON array found in advisor response | Raw: {}",
            truncate(response)
        ))),
    }
}
