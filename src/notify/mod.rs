//! Outbound guest notifications

pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SmsConfig;

pub use templates::{render, Language, MessageKind};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("SMS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMS provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Outcome of a send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub message_sid: Option<String>,
    /// True when nothing left the process
    pub mock: bool,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<Delivery, NotifyError>;

    fn is_live(&self) -> bool;
}

/// Pick the provider from configuration
pub fn from_config(config: &SmsConfig) -> Arc<dyn Notifier> {
    if config.is_configured() {
        tracing::info!("SMS delivery enabled via Twilio");
        Arc::new(TwilioNotifier::new(config))
    } else {
        tracing::info!("SMS provider not configured, messages will only be logged");
        Arc::new(LogNotifier)
    }
}

pub struct TwilioNotifier {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from: String,
    api_base: String,
}

#[derive(Deserialize)]
struct TwilioMessage {
    sid: Option<String>,
}

#[derive(Deserialize)]
struct TwilioFailure {
    message: Option<String>,
}

impl TwilioNotifier {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from: config.phone_number.clone(),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| TWILIO_API_BASE.to_string()),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, to: &str, body: &str) -> Result<Delivery, NotifyError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<TwilioFailure>()
                .await
                .ok()
                .and_then(|f| f.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let message: TwilioMessage = response.json().await?;
        tracing::info!("SMS sent to {}", to);
        Ok(Delivery {
            message_sid: message.sid,
            mock: false,
        })
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// Logs the message instead of sending it
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, body: &str) -> Result<Delivery, NotifyError> {
        tracing::info!(to = %to, "Mock SMS: {}", body);
        Ok(Delivery {
            message_sid: None,
            mock: true,
        })
    }

    fn is_live(&self) -> bool {
        false
    }
}
