use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::candidate::CandidateRow;
use crate::notify::DispatchOutcome;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ALLOWED_CONTENT_TYPES: [&str; 2] = [PDF_CONTENT_TYPE, DOCX_CONTENT_TYPE];

/// Uploads below this size are rejected before extraction.
pub const MIN_RESUME_BYTES: usize = 500;

/// A resume file as received in one request. Never outlives the request.
#[derive(Debug, Clone)]
pub struct UploadedResume {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Structured fields pulled out of a resume by the extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCandidate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub eligible: Option<bool>,
    #[serde(default)]
    pub target_role: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtractedCandidate {
    pub fn with_target_role(self, target_role: impl Into<String>) -> Self {
        Self {
            target_role: target_role.into(),
            ..self
        }
    }
}

/// Input to the intake pipeline, independent of the HTTP form that produced it.
#[derive(Debug, Clone, Default)]
pub struct ApplicationRequest {
    pub target_role: String,
    /// Applicant-supplied identity. Takes precedence over extracted values.
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub resume: Option<UploadedResume>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationData {
    #[serde(flatten)]
    pub candidate: CandidateRow,
    pub target_role: String,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<DispatchOutcome>,
    pub extracted: ExtractedCandidate,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationResponse {
    pub status: &'static str,
    pub message: String,
    pub data: ApplicationData,
}
