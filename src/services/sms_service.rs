use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::{SmsConfig, SmsProvider};
use crate::errors::{AppError, Result};

const AFRICAS_TALKING_URL: &str = "https://api.africastalking.com/version1/messaging";

/// Outbound SMS gateway.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<()>;
}

/// Simulated gateway: messages only go to the log.
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        info!("📱 [simulated SMS] to {}: {}", phone, message);
        Ok(())
    }
}

#[derive(Clone)]
pub struct AfricasTalkingSms {
    api_key: String,
    username: String,
    from: String,
    client: Client,
}

impl AfricasTalkingSms {
    pub fn new(api_key: String, username: String, from: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            username,
            from,
            client,
        })
    }
}

#[async_trait]
impl SmsSender for AfricasTalkingSms {
    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .post(AFRICAS_TALKING_URL)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&[
                ("username", self.username.as_str()),
                ("to", phone),
                ("message", message),
                ("from", self.from.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::external_api(format!("SMS API error: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::external_api(format!(
                "SMS sending failed with status: {}",
                response.status()
            )))
        }
    }
}

pub fn sms_sender_from_config(config: &SmsConfig) -> Result<Arc<dyn SmsSender>> {
    match config.provider {
        SmsProvider::Log => Ok(Arc::new(LogSmsSender)),
        SmsProvider::AfricasTalking => Ok(Arc::new(AfricasTalkingSms::new(
            config.api_key.clone(),
            config.username.clone(),
            config.from.clone(),
        )?)),
    }
}

/// Best-effort delivery: a failed send is logged and dropped. No retry, no
/// queue, and never an error for the caller.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn SmsSender>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn SmsSender>) -> Self {
        Notifier { sender }
    }

    pub async fn notify(&self, phone: &str, message: &str) {
        if phone.trim().is_empty() {
            warn!("Skipping SMS with no destination: {}", message);
            return;
        }
        if let Err(e) = self.sender.send(phone, message).await {
            warn!("SMS to {} failed: {}", phone, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Failing;

    #[async_trait]
    impl SmsSender for Failing {
        async fn send(&self, _phone: &str, _message: &str) -> Result<()> {
            Err(AppError::external_api("gateway down"))
        }
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl SmsSender for Recording {
        async fn send(&self, phone: &str, _message: &str) -> Result<()> {
            self.0.lock().unwrap().push(phone.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn gateway_failures_are_swallowed() {
        let notifier = Notifier::new(Arc::new(Failing));
        notifier.notify("0712345678", "hello").await;
    }

    #[tokio::test]
    async fn blank_destinations_are_skipped() {
        let recording = Arc::new(Recording::default());
        let notifier = Notifier::new(recording.clone());
        notifier.notify("  ", "hello").await;
        notifier.notify("0712345678", "hello").await;
        assert_eq!(*recording.0.lock().unwrap(), vec!["0712345678".to_string()]);
    }
}
