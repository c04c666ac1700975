//! Email delivery via the Resend HTTP API.
//!
//! Configuration is loaded from environment variables; if `RESEND_API_KEY`
//! is not set, [`MailerConfig::from_env`] returns `None` and no mailer
//! should be constructed — notifications are then composed and audited but
//! not delivered.

use std::time::Duration;

use serde::Serialize;

/// Resend send-email endpoint.
const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// HTTP request timeout for a single send.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default sender when `EMAIL_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "eggboard <noreply@eggboard.local>";

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The mail API returned a non-2xx status code.
    #[error("Mail API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
}

/// Configuration for the mail delivery service.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Resend API key.
    pub api_key: String,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Operator recipient address.
    pub recipient: String,
}

impl MailerConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `RESEND_API_KEY` or `NOTIFICATION_EMAIL` is not
    /// set, signalling that email delivery is not configured and should be
    /// skipped.
    ///
    /// | Env Var              | Required | Default                          |
    /// |----------------------|----------|----------------------------------|
    /// | `RESEND_API_KEY`     | **yes**  | --                               |
    /// | `NOTIFICATION_EMAIL` | **yes**  | --                               |
    /// | `EMAIL_FROM`         | no       | `eggboard <noreply@eggboard.local>` |
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("RESEND_API_KEY").ok()?;
        let recipient = std::env::var("NOTIFICATION_EMAIL").ok()?;
        let from_address =
            std::env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.into());

        Some(Self {
            api_key,
            from_address,
            recipient,
        })
    }
}

/// Request body for the Resend send-email endpoint.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// HTTP mail sender.
pub struct Mailer {
    client: reqwest::Client,
    config: MailerConfig,
}

impl Mailer {
    /// Create a sender with a pre-configured HTTP client.
    pub fn new(config: MailerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    /// The configured operator recipient.
    pub fn recipient(&self) -> &str {
        &self.config.recipient
    }

    /// Send one email, returning the provider's response body.
    pub async fn send(
        &self,
        subject: &str,
        html: &str,
        text: &str,
    ) -> Result<serde_json::Value, MailerError> {
        let body = SendRequest {
            from: &self.config.from_address,
            to: [self.config.recipient.as_str()],
            subject,
            html,
            text,
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .json()
            .await
            .unwrap_or(serde_json::Value::Null))
    }
}
