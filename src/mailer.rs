//! Outbound mail: the `Notifier` capability, its SMTP implementation, and the
//! texts of every message the service sends.

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, warn};

use crate::config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Sends plain-text mail through an authenticated STARTTLS relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, NotifyError> {
        let from = cfg
            .from
            .parse::<Mailbox>()
            .map_err(|_| NotifyError::InvalidAddress(cfg.from.clone()))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .timeout(Some(Duration::from_secs(10)))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let to_box = to
            .parse::<Mailbox>()
            .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to_box)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.transport.send(message).await?;
        debug!(%to, subject, "mail sent");
        Ok(())
    }
}

/// Send and swallow failures; for informational notices only.
pub async fn send_best_effort(notifier: &dyn Notifier, to: &str, mail: &Mail) {
    if let Err(e) = notifier.send(to, &mail.subject, &mail.body).await {
        warn!(error = %e, %to, subject = %mail.subject, "best-effort mail not delivered");
    }
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub subject: String,
    pub body: String,
}

fn link(base_url: &str, path: &str, token: &str) -> String {
    format!("{}/{}?token={}", base_url.trim_end_matches('/'), path, token)
}

pub fn verification_mail(base_url: &str, token: &str) -> Mail {
    Mail {
        subject: "Verify your email address".into(),
        body: format!(
            "Click the following link to verify your email: {}",
            link(base_url, "verify", token)
        ),
    }
}

pub fn already_verified_mail() -> Mail {
    Mail {
        subject: "You are already verified".into(),
        body: "Hello,\n\n\
               Your email is already verified. You do not need to verify again.\n\n\
               Thank you!"
            .into(),
    }
}

pub fn reset_mail(base_url: &str, token: &str, valid_minutes: i64) -> Mail {
    Mail {
        subject: "Password Reset Request".into(),
        body: format!(
            "Click the following link to reset your password (valid for {} minutes): {}",
            valid_minutes,
            link(base_url, "reset-password", token)
        ),
    }
}

pub fn reset_done_mail() -> Mail {
    Mail {
        subject: "Password Reset Successful".into(),
        body: "Hello,\n\n\
               Your password has been reset successfully. If you did not perform this action, \
               please contact support immediately.\n\n\
               Thank you!"
            .into(),
    }
}
