use crate::candidates::models::ExtractedCandidate;

/// The extractor's own verdict when it gave one; otherwise eligible.
pub fn evaluate(extracted: &ExtractedCandidate) -> bool {
    extracted.eligible.unwrap_or(true)
}
