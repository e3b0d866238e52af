//! Axum route handlers for candidate intake.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::candidates::models::{ApplicationRequest, ApplicationResponse, UploadedResume};
use crate::errors::AppError;
use crate::models::candidate::CandidateRow;
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";

/// Text fields plus the optional resume part of a multipart form.
#[derive(Debug, Default)]
struct IntakeForm {
    fields: HashMap<String, String>,
    resume: Option<UploadedResume>,
}

impl IntakeForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = IntakeForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == RESUME_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid file: {e}")))?;

                // Browsers send an empty, unnamed part when no file was chosen.
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.resume = Some(UploadedResume {
                    filename: if filename.is_empty() {
                        RESUME_FIELD.to_string()
                    } else {
                        filename
                    },
                    content_type,
                    bytes,
                });
            } else if !name.is_empty() {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid field '{name}': {e}")))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    fn required(&mut self, field: &str) -> Result<String, AppError> {
        self.fields
            .remove(field)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::MissingField(field.to_string()))
    }
}

/// POST /candidates/apply
///
/// Applicant-supplied identity plus an optional resume. Responds 201 once the
/// candidate is saved; the delivery result is reported in `message`.
pub async fn handle_apply(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApplicationResponse>), AppError> {
    let mut form = IntakeForm::read(multipart).await?;
    let request = ApplicationRequest {
        full_name: Some(form.required("full_name")?),
        email: Some(form.required("email")?),
        target_role: form.required("position")?,
        resume: form.resume,
    };

    let response = state.intake.submit(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /candidates/upload
///
/// Resume-only intake: identity comes entirely from extraction.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApplicationResponse>, AppError> {
    let mut form = IntakeForm::read(multipart).await?;
    let target_role = form.required("target_role")?;
    let resume = form
        .resume
        .ok_or_else(|| AppError::MissingField(RESUME_FIELD.to_string()))?;

    let response = state
        .intake
        .submit(ApplicationRequest {
            target_role,
            resume: Some(resume),
            ..Default::default()
        })
        .await?;
    Ok(Json(response))
}

/// GET /candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CandidateRow>, AppError> {
    Ok(Json(state.intake.find(id).await?))
}
