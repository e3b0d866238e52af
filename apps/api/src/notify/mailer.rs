use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::{Credentials, DEFAULT_MECHANISMS};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::extension::ClientId;
use lettre::Message;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::notify::{
    DispatchAttempt, DispatchFailure, DispatchOutcome, DispatchStage, MailerConfig,
    NotificationMessage, TlsMode,
};

/// Failure raised by a transport. Only `kind` crosses the mailer boundary.
#[derive(Debug, Error)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: DispatchFailure,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: DispatchFailure, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// One connect -> authenticate -> send -> close cycle for a single message.
///
/// Implementations advance `attempt` as each phase starts and leave it in
/// `Sending` on success. On error it stays in the phase that failed. The
/// connection must be released before returning, on every path.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(
        &self,
        config: &MailerConfig,
        credentials: Credentials,
        message: Message,
        attempt: &mut DispatchAttempt,
    ) -> Result<(), TransportError>;
}

/// Live SMTP transport. Opens a fresh, unpooled session per message and
/// drives it phase by phase.
pub struct SmtpTransport;

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(
        &self,
        config: &MailerConfig,
        credentials: Credentials,
        message: Message,
        attempt: &mut DispatchAttempt,
    ) -> Result<(), TransportError> {
        let hello = ClientId::default();
        let wrapper = match config.tls {
            TlsMode::Implicit => Some(tls_parameters(&config.host)?),
            TlsMode::StartTls | TlsMode::Disabled => None,
        };

        attempt.advance(DispatchStage::Connecting);
        let mut conn = AsyncSmtpConnection::connect_tokio1(
            (config.host.as_str(), config.port),
            Some(config.timeout),
            &hello,
            wrapper,
            None,
        )
        .await
        .map_err(|e| smtp_failure(&e, attempt.stage()))?;

        let session = run_session(&mut conn, config, &hello, &credentials, &message, attempt);
        let result = match tokio::time::timeout(config.timeout, session).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::new(
                DispatchFailure::ConnectionFailed,
                format!("SMTP session timed out after {:?}", config.timeout),
            )),
        };

        if result.is_ok() {
            if let Err(e) = conn.quit().await {
                debug!("SMTP QUIT failed after delivery: {e}");
            }
        } else {
            conn.abort().await;
        }
        result
    }
}

async fn run_session(
    conn: &mut AsyncSmtpConnection,
    config: &MailerConfig,
    hello: &ClientId,
    credentials: &Credentials,
    message: &Message,
    attempt: &mut DispatchAttempt,
) -> Result<(), TransportError> {
    if config.tls == TlsMode::StartTls {
        conn.starttls(tls_parameters(&config.host)?, hello)
            .await
            .map_err(|e| smtp_failure(&e, attempt.stage()))?;
    }

    attempt.advance(DispatchStage::Authenticating);
    conn.auth(DEFAULT_MECHANISMS, credentials)
        .await
        .map_err(|e| smtp_failure(&e, attempt.stage()))?;

    attempt.advance(DispatchStage::Sending);
    conn.send(message.envelope(), &message.formatted())
        .await
        .map_err(|e| smtp_failure(&e, attempt.stage()))?;
    Ok(())
}

fn tls_parameters(host: &str) -> Result<TlsParameters, TransportError> {
    TlsParameters::new(host.to_string())
        .map_err(|e| TransportError::new(DispatchFailure::ConnectionFailed, e.to_string()))
}

fn smtp_failure(err: &lettre::transport::smtp::Error, stage: DispatchStage) -> TransportError {
    TransportError::new(classify_smtp_error(err, stage), err.to_string())
}

/// Maps a lettre SMTP error, and the phase it happened in, onto the dispatch
/// failure taxonomy.
fn classify_smtp_error(
    err: &lettre::transport::smtp::Error,
    stage: DispatchStage,
) -> DispatchFailure {
    let authenticating = stage == DispatchStage::Authenticating;
    if let Some(code) = err.status() {
        return match code.to_string().as_str() {
            "530" | "534" | "535" | "538" => DispatchFailure::AuthenticationFailed,
            _ if authenticating => DispatchFailure::AuthenticationFailed,
            _ => DispatchFailure::ProtocolError,
        };
    }
    if err.is_timeout() || err.is_tls() {
        return DispatchFailure::ConnectionFailed;
    }
    if err.is_response() || err.is_client() {
        return if authenticating {
            DispatchFailure::AuthenticationFailed
        } else {
            DispatchFailure::ProtocolError
        };
    }
    if has_io_source(err) {
        return DispatchFailure::ConnectionFailed;
    }
    DispatchFailure::UnknownError
}

fn has_io_source(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if inner.is::<std::io::Error>() {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Delivers composed notifications, or only logs them in dry-run mode.
pub struct Mailer {
    config: MailerConfig,
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    pub fn new(config: MailerConfig, transport: Arc<dyn MailTransport>) -> Self {
        if !config.has_credentials() {
            warn!("SMTP credentials are missing; set SMTP_USERNAME and SMTP_PASSWORD to send email");
        }
        Self { config, transport }
    }

    pub fn smtp(config: MailerConfig) -> Self {
        Self::new(config, Arc::new(SmtpTransport))
    }

    /// Single best-effort attempt. No retry, no deduplication.
    pub async fn dispatch(&self, message: &NotificationMessage) -> DispatchOutcome {
        info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "Sending email"
        );

        if self.config.dry_run {
            info!(
                recipient = %message.recipient,
                subject = %message.subject,
                body = %message.plain_body,
                "[dry run] email content recorded, not delivered"
            );
            return DispatchOutcome::dry_run();
        }

        let mut attempt = DispatchAttempt::new();

        let (Some(username), Some(password)) = (&self.config.username, &self.config.password)
        else {
            return self.fail(
                &mut attempt,
                DispatchFailure::MissingCredentials,
                "no SMTP credentials",
            );
        };

        let from = self.config.from_address.as_deref().unwrap_or(username);
        let email = match build_email(from, message) {
            Ok(email) => email,
            Err(e) => return self.fail(&mut attempt, e.kind, &e.detail),
        };

        let credentials = Credentials::new(username.clone(), password.clone());
        match self
            .transport
            .deliver(&self.config, credentials, email, &mut attempt)
            .await
        {
            Ok(()) => {
                attempt.advance(DispatchStage::Delivered);
                info!(recipient = %message.recipient, "Email sent successfully");
                DispatchOutcome::delivered(&message.recipient)
            }
            Err(e) => self.fail(&mut attempt, e.kind, &e.detail),
        }
    }

    fn fail(
        &self,
        attempt: &mut DispatchAttempt,
        kind: DispatchFailure,
        detail: &str,
    ) -> DispatchOutcome {
        let stopped_at = attempt.fail();
        error!(
            failure = ?kind,
            stage = ?stopped_at,
            host = %self.config.host,
            port = self.config.port,
            "Email send failed: {detail}"
        );
        DispatchOutcome::failed(kind, stopped_at)
    }
}

/// Builds the MIME message: multipart/alternative when there is an HTML body.
fn build_email(from: &str, message: &NotificationMessage) -> Result<Message, TransportError> {
    let from: Mailbox = from.parse().map_err(|e| {
        TransportError::new(
            DispatchFailure::InvalidAddress,
            format!("sender address: {e}"),
        )
    })?;
    let to: Mailbox = message.recipient.parse().map_err(|e| {
        TransportError::new(
            DispatchFailure::InvalidAddress,
            format!("recipient address: {e}"),
        )
    })?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone());

    let built = match &message.html_body {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            message.plain_body.clone(),
            html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.plain_body.clone()),
    };

    built.map_err(|e| TransportError::new(DispatchFailure::ProtocolError, e.to_string()))
}
