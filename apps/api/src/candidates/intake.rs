//! Intake pipeline: validate -> extract -> persist -> evaluate -> compose -> dispatch.
//!
//! Steps run sequentially inside the request. The candidate row is written
//! before any mail is attempted, so a delivery problem never loses the record.

use std::sync::Arc;

use tracing::{info, warn};

use crate::candidates::eligibility;
use crate::candidates::extraction::ResumeExtractor;
use crate::candidates::models::{
    ApplicationData, ApplicationRequest, ApplicationResponse, ExtractedCandidate, UploadedResume,
    ALLOWED_CONTENT_TYPES, MIN_RESUME_BYTES,
};
use crate::candidates::repository::CandidateRepository;
use crate::candidates::storage::ResumeStore;
use crate::config::DeliveryPolicy;
use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, NewCandidate};
use crate::notify::composer::DEFAULT_CANDIDATE_NAME;
use crate::notify::{ComposeParams, Composer, DispatchOutcome, Mailer};

pub const NO_EMAIL_NOTE: &str = "no email address found";

/// Checks the declared content type, then the size. Runs before extraction.
pub fn validate_upload(resume: &UploadedResume) -> Result<(), AppError> {
    let declared = resume
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !ALLOWED_CONTENT_TYPES.contains(&declared.as_str()) {
        return Err(AppError::InvalidFileType(resume.content_type.clone()));
    }
    if resume.bytes.len() < MIN_RESUME_BYTES {
        return Err(AppError::FileTooSmall(resume.bytes.len()));
    }
    Ok(())
}

pub struct IntakeService {
    repository: Arc<dyn CandidateRepository>,
    extractor: Arc<dyn ResumeExtractor>,
    resume_store: Option<Arc<dyn ResumeStore>>,
    composer: Composer,
    mailer: Arc<Mailer>,
    delivery_policy: DeliveryPolicy,
}

impl IntakeService {
    pub fn new(
        repository: Arc<dyn CandidateRepository>,
        extractor: Arc<dyn ResumeExtractor>,
        composer: Composer,
        mailer: Arc<Mailer>,
        delivery_policy: DeliveryPolicy,
    ) -> Self {
        Self {
            repository,
            extractor,
            resume_store: None,
            composer,
            mailer,
            delivery_policy,
        }
    }

    pub fn with_resume_store(mut self, store: Arc<dyn ResumeStore>) -> Self {
        self.resume_store = Some(store);
        self
    }

    pub async fn submit(
        &self,
        request: ApplicationRequest,
    ) -> Result<ApplicationResponse, AppError> {
        let target_role = request.target_role.trim().to_string();
        if target_role.is_empty() {
            return Err(AppError::Validation("Target role is required".to_string()));
        }

        if let Some(resume) = &request.resume {
            validate_upload(resume)?;
        }

        let extracted = match &request.resume {
            Some(resume) => {
                info!(
                    "Extracting resume {} ({} bytes)",
                    resume.filename,
                    resume.bytes.len()
                );
                self.extractor
                    .extract(&resume.filename, resume.bytes.clone())
                    .await?
            }
            None => ExtractedCandidate::default(),
        }
        .with_target_role(target_role.clone());

        let full_name = non_blank(request.full_name)
            .or_else(|| non_blank(extracted.name.clone()))
            .unwrap_or_else(|| DEFAULT_CANDIDATE_NAME.to_string());
        let email = non_blank(request.email).or_else(|| non_blank(extracted.email.clone()));

        let resume_path = match (&self.resume_store, &request.resume) {
            (Some(store), Some(resume)) => Some(store.put(resume).await?),
            _ => None,
        };

        let saved = self
            .repository
            .upsert(NewCandidate {
                full_name: full_name.clone(),
                email: email.clone(),
                position: target_role.clone(),
                resume_path: resume_path.clone(),
                notification_note: email.is_none().then(|| NO_EMAIL_NOTE.to_string()),
            })
            .await;
        let candidate = match saved {
            Ok(candidate) => candidate,
            Err(e) => {
                if let (Some(store), Some(path)) = (&self.resume_store, &resume_path) {
                    discard_resume(store.as_ref(), path).await;
                }
                return Err(e.into());
            }
        };

        let eligible = eligibility::evaluate(&extracted);

        let Some(email) = email else {
            info!("Candidate {} has no email address; skipping notification", candidate.id);
            return Ok(ApplicationResponse {
                status: "success",
                message: "No email found in resume; application saved without notification"
                    .to_string(),
                data: ApplicationData {
                    candidate,
                    target_role,
                    eligible,
                    notification: None,
                    extracted,
                },
            });
        };

        let message = self.composer.compose(ComposeParams {
            recipient: &email,
            candidate_name: &full_name,
            target_role: &target_role,
            eligible,
            candidate_id: candidate.id,
        });
        let outcome = self.mailer.dispatch(&message).await;

        if outcome.is_failure() && self.delivery_policy == DeliveryPolicy::Fail {
            return Err(AppError::Notification(outcome.detail));
        }
        if outcome.is_failure() {
            warn!(
                "Candidate {} saved but email to {email} failed: {}",
                candidate.id, outcome.detail
            );
        }

        Ok(ApplicationResponse {
            status: "success",
            message: outcome_message(&email, eligible, &outcome),
            data: ApplicationData {
                candidate,
                target_role,
                eligible,
                notification: Some(outcome),
                extracted,
            },
        })
    }

    pub async fn find(&self, id: i64) -> Result<CandidateRow, AppError> {
        self.repository
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate {id} not found")))
    }
}

/// Best effort: a stored resume without a candidate row is unreachable.
async fn discard_resume(store: &dyn ResumeStore, path: &str) {
    match store.remove(path).await {
        Ok(()) => info!("Removed resume {path} after the candidate could not be saved"),
        Err(e) => warn!("Resume {path} is orphaned; cleanup failed: {e}"),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn outcome_message(email: &str, eligible: bool, outcome: &DispatchOutcome) -> String {
    let verdict = if eligible { "Eligible" } else { "Not Eligible" };
    if outcome.delivered {
        format!("Email sent to {email} ({verdict})")
    } else if outcome.is_failure() {
        format!(
            "Application saved but email not sent to {email}: {}",
            outcome.detail
        )
    } else {
        format!("Application saved for {email}; email not sent (dry run)")
    }
}
