use std::sync::Arc;

use crate::candidates::intake::IntakeService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeService>,
    /// Multipart body limit for the upload routes.
    pub max_upload_bytes: usize,
}
