//! Candidate notifications: template rendering and outbound mail delivery.
//!
//! The mailer never returns an error. Every attempt ends in a
//! [`DispatchOutcome`], and failures carry a [`DispatchFailure`] kind so
//! callers can branch without string matching.

pub mod composer;
pub mod mailer;

use std::fmt;
use std::time::Duration;

use serde::Serialize;

pub use composer::{ComposeParams, Composer};
pub use mailer::Mailer;

/// A rendered email for exactly one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub recipient: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: Option<String>,
}

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Plain connect, then upgrade with STARTTLS.
    StartTls,
    /// TLS from the first byte (SMTPS).
    Implicit,
    /// No encryption. Local mail catchers only.
    Disabled,
}

impl TlsMode {
    pub fn for_port(port: u16) -> Self {
        if port == 465 {
            TlsMode::Implicit
        } else {
            TlsMode::StartTls
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "starttls" => Some(TlsMode::StartTls),
            "implicit" | "tls" => Some(TlsMode::Implicit),
            "none" | "disabled" => Some(TlsMode::Disabled),
            _ => None,
        }
    }
}

/// Outbound mail settings, passed to the [`Mailer`] at construction.
#[derive(Clone)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub dry_run: bool,
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl MailerConfig {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

// Password stays out of logs and panics.
impl fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from_address", &self.from_address)
            .field("dry_run", &self.dry_run)
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Why a dispatch did not deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchFailure {
    MissingCredentials,
    InvalidAddress,
    AuthenticationFailed,
    ConnectionFailed,
    ProtocolError,
    UnknownError,
}

impl DispatchFailure {
    /// Client-safe reason. Never includes server responses or credentials.
    pub fn reason(self) -> &'static str {
        match self {
            DispatchFailure::MissingCredentials => "SMTP credentials are not configured",
            DispatchFailure::InvalidAddress => "sender or recipient address is invalid",
            DispatchFailure::AuthenticationFailed => "SMTP authentication failed",
            DispatchFailure::ConnectionFailed => "could not connect to the mail server",
            DispatchFailure::ProtocolError => "the mail server rejected the message",
            DispatchFailure::UnknownError => "unexpected mail delivery error",
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Lifecycle of a single dispatch call.
///
/// `Idle -> Connecting -> Authenticating -> Sending -> {Delivered | Failed}`.
/// Any non-terminal stage may also fail directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStage {
    Idle,
    Connecting,
    Authenticating,
    Sending,
    Delivered,
    Failed,
}

impl DispatchStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, DispatchStage::Delivered | DispatchStage::Failed)
    }

    pub fn can_transition_to(self, next: DispatchStage) -> bool {
        use DispatchStage::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed) => true,
            (Idle, Connecting)
            | (Connecting, Authenticating)
            | (Authenticating, Sending)
            | (Sending, Delivered) => true,
            _ => false,
        }
    }
}

/// The stage of one in-flight dispatch. Only moves forward.
#[derive(Debug)]
pub struct DispatchAttempt {
    stage: DispatchStage,
}

impl DispatchAttempt {
    pub fn new() -> Self {
        Self {
            stage: DispatchStage::Idle,
        }
    }

    pub fn stage(&self) -> DispatchStage {
        self.stage
    }

    pub fn advance(&mut self, next: DispatchStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "invalid dispatch transition {:?} -> {next:?}",
            self.stage
        );
        self.stage = next;
    }

    /// Moves to `Failed` and returns the stage the attempt stopped in.
    pub fn fail(&mut self) -> DispatchStage {
        let stopped_at = self.stage;
        self.advance(DispatchStage::Failed);
        stopped_at
    }
}

impl Default for DispatchAttempt {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform result of every send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub delivered: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DispatchFailure>,
    /// Stage a failed attempt stopped in. `Idle` means no connection was opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DispatchStage>,
}

impl DispatchOutcome {
    pub fn delivered(recipient: &str) -> Self {
        Self {
            delivered: true,
            detail: format!("email sent to {recipient}"),
            failure: None,
            failed_at: None,
        }
    }

    pub fn dry_run() -> Self {
        Self {
            delivered: false,
            detail: "dry run: email not sent".to_string(),
            failure: None,
            failed_at: None,
        }
    }

    pub fn failed(failure: DispatchFailure, stopped_at: DispatchStage) -> Self {
        Self {
            delivered: false,
            detail: failure.reason().to_string(),
            failure: Some(failure),
            failed_at: Some(stopped_at),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}
