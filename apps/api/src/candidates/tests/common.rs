use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use lettre::transport::smtp::authentication::Credentials;
use lettre::Message;
use serde_json::Value;

use crate::candidates::extraction::{ExtractionError, ResumeExtractor};
use crate::candidates::intake::IntakeService;
use crate::candidates::models::{
    ExtractedCandidate, UploadedResume, DOCX_CONTENT_TYPE, PDF_CONTENT_TYPE,
};
use crate::candidates::repository::{CandidateRepository, RepositoryError};
use crate::candidates::storage::{ResumeStore, StorageError};
use crate::config::DeliveryPolicy;
use crate::models::candidate::{CandidateRow, NewCandidate};
use crate::notify::mailer::{MailTransport, TransportError};
use crate::notify::{
    Composer, DispatchAttempt, DispatchFailure, DispatchStage, Mailer, MailerConfig, TlsMode,
};
use crate::routes::build_router;
use crate::state::AppState;

pub(super) const EXAM_LINK_BASE: &str = "https://jobs.example.com/exam";

#[derive(Default)]
pub(super) struct MemoryRepository {
    rows: Mutex<Vec<CandidateRow>>,
}

impl MemoryRepository {
    pub(super) fn rows(&self) -> Vec<CandidateRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandidateRepository for MemoryRepository {
    async fn upsert(&self, candidate: NewCandidate) -> Result<CandidateRow, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows
            .iter_mut()
            .find(|row| candidate.email.is_some() && row.email == candidate.email)
        {
            existing.full_name = candidate.full_name;
            existing.position = candidate.position;
            if candidate.resume_path.is_some() {
                existing.resume_path = candidate.resume_path;
            }
            existing.notification_note = candidate.notification_note;
            return Ok(existing.clone());
        }

        let row = CandidateRow {
            id: rows.len() as i64 + 1,
            full_name: candidate.full_name,
            email: candidate.email,
            position: candidate.position,
            resume_path: candidate.resume_path,
            exam_date: None,
            exam_time: None,
            notification_note: candidate.notification_note,
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn find(&self, id: i64) -> Result<Option<CandidateRow>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl CandidateRepository for UnavailableRepository {
    async fn upsert(&self, _candidate: NewCandidate) -> Result<CandidateRow, RepositoryError> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn find(&self, _id: i64) -> Result<Option<CandidateRow>, RepositoryError> {
        Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
    }
}

#[derive(Clone)]
pub(super) enum StubOutcome {
    Fields(ExtractedCandidate),
    InvalidContent,
    Internal,
}

/// Extractor returning a fixed result and counting calls.
pub(super) struct StubExtractor {
    outcome: StubOutcome,
    calls: AtomicUsize,
}

impl StubExtractor {
    pub(super) fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResumeExtractor for StubExtractor {
    async fn extract(
        &self,
        _filename: &str,
        _bytes: Bytes,
    ) -> Result<ExtractedCandidate, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            StubOutcome::Fields(fields) => Ok(fields.clone()),
            StubOutcome::InvalidContent => Err(ExtractionError::InvalidContent(
                "Invalid PDF: no pages".to_string(),
            )),
            StubOutcome::Internal => Err(ExtractionError::Internal("worker crashed".to_string())),
        }
    }
}

/// Mail transport that records messages instead of connecting anywhere.
#[derive(Default)]
pub(super) struct RecordingTransport {
    sent: Mutex<Vec<Message>>,
    fail_with: Option<DispatchFailure>,
}

impl RecordingTransport {
    pub(super) fn failing(kind: DispatchFailure) -> Self {
        Self {
            sent: Mutex::default(),
            fail_with: Some(kind),
        }
    }

    pub(super) fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Raw RFC 5322 text of every accepted message.
    pub(super) fn sent_raw(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| String::from_utf8_lossy(&m.formatted()).into_owned())
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(
        &self,
        _config: &MailerConfig,
        _credentials: Credentials,
        message: Message,
        attempt: &mut DispatchAttempt,
    ) -> Result<(), TransportError> {
        attempt.advance(DispatchStage::Connecting);
        if let Some(kind) = self.fail_with {
            return Err(TransportError::new(kind, "connection reset by peer"));
        }
        attempt.advance(DispatchStage::Authenticating);
        attempt.advance(DispatchStage::Sending);
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    puts: AtomicUsize,
    removed: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub(super) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(super) fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResumeStore for MemoryStore {
    async fn put(&self, resume: &UploadedResume) -> Result<String, StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(format!("memory://resumes/{}", resume.filename))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.removed.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

pub(super) struct FailingStore;

#[async_trait]
impl ResumeStore for FailingStore {
    async fn put(&self, _resume: &UploadedResume) -> Result<String, StorageError> {
        Err(StorageError("bucket does not exist".to_string()))
    }

    async fn remove(&self, _path: &str) -> Result<(), StorageError> {
        Err(StorageError("bucket does not exist".to_string()))
    }
}

pub(super) fn mailer_config(dry_run: bool) -> MailerConfig {
    MailerConfig {
        host: "smtp.example.com".to_string(),
        port: 587,
        username: Some("hr@example.com".to_string()),
        password: Some("secret".to_string()),
        from_address: Some("jobs@example.com".to_string()),
        dry_run,
        tls: TlsMode::StartTls,
        timeout: Duration::from_secs(5),
    }
}

pub(super) fn extracted(name: &str, email: Option<&str>, eligible: Option<bool>) -> ExtractedCandidate {
    ExtractedCandidate {
        name: Some(name.to_string()),
        email: email.map(str::to_string),
        eligible,
        ..Default::default()
    }
}

pub(super) fn pdf_resume(len: usize) -> UploadedResume {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(len.max(bytes.len()), b' ');
    bytes.truncate(len);
    UploadedResume {
        filename: "cv.pdf".to_string(),
        content_type: PDF_CONTENT_TYPE.to_string(),
        bytes: Bytes::from(bytes),
    }
}

pub(super) fn docx_resume() -> UploadedResume {
    UploadedResume {
        filename: "cv.docx".to_string(),
        content_type: DOCX_CONTENT_TYPE.to_string(),
        bytes: Bytes::from(vec![b'x'; 800]),
    }
}

/// Wires an [`IntakeService`] out of fakes and keeps handles for assertions.
pub(super) struct Harness {
    pub service: Arc<IntakeService>,
    pub repository: Arc<MemoryRepository>,
    pub extractor: Arc<StubExtractor>,
    pub transport: Arc<RecordingTransport>,
}

pub(super) struct HarnessBuilder {
    outcome: StubOutcome,
    dry_run: bool,
    transport: RecordingTransport,
    policy: DeliveryPolicy,
    store: Option<Arc<dyn ResumeStore>>,
}

impl HarnessBuilder {
    pub(super) fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            dry_run: true,
            transport: RecordingTransport::default(),
            policy: DeliveryPolicy::Warn,
            store: None,
        }
    }

    pub(super) fn live(mut self) -> Self {
        self.dry_run = false;
        self
    }

    pub(super) fn transport(mut self, transport: RecordingTransport) -> Self {
        self.transport = transport;
        self
    }

    pub(super) fn policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub(super) fn store(mut self, store: Arc<dyn ResumeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub(super) fn build(self) -> Harness {
        let repository = Arc::new(MemoryRepository::default());
        self.build_with(repository.clone(), repository)
    }

    pub(super) fn build_with(
        self,
        repository: Arc<dyn CandidateRepository>,
        memory: Arc<MemoryRepository>,
    ) -> Harness {
        let extractor = Arc::new(StubExtractor::new(self.outcome));
        let transport = Arc::new(self.transport);
        let mailer = Arc::new(Mailer::new(mailer_config(self.dry_run), transport.clone()));

        let mut service = IntakeService::new(
            repository,
            extractor.clone(),
            Composer::new(EXAM_LINK_BASE, "Acme"),
            mailer,
            self.policy,
        );
        if let Some(store) = self.store {
            service = service.with_resume_store(store);
        }

        Harness {
            service: Arc::new(service),
            repository: memory,
            extractor,
            transport,
        }
    }
}

pub(super) fn router(harness: &Harness) -> Router {
    build_router(AppState {
        intake: harness.service.clone(),
        max_upload_bytes: 1024 * 1024,
    })
}

pub(super) const BOUNDARY: &str = "tailent-test-boundary";

/// A file part for [`multipart_request`]: (filename, content type, bytes).
pub(super) type FilePart<'a> = (&'a str, &'a str, Vec<u8>);

pub(super) fn multipart_request(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<FilePart<'_>>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
