//! HTTP webhook [`Notifier`].
//!
//! POSTs `{"title", "body", "description"}` as JSON to the configured
//! endpoint. `description` carries the event kind (`success`, `failure`,
//! `warning`). Any 2xx response counts as delivered.

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use yawe_core::exec::{Notifier, NotifyError};
use yawe_types::config::NotifierConfig;
use yawe_types::workflow::NotifyEvent;

/// Response bytes kept in a `NotifyError::Status` message.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Serialize)]
struct Payload<'a> {
    title: &'a str,
    body: &'a str,
    description: String,
}

pub struct HttpNotifier {
    client: reqwest::Client,
    api_url: String,
}

impl HttpNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .user_agent(concat!("workflow-run/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl Notifier for HttpNotifier {
    fn notify<'a>(
        &'a self,
        event: NotifyEvent,
        title: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        async move {
            let payload = Payload {
                title,
                body: message,
                description: event.to_string(),
            };
            tracing::info!(%event, title, "sending notification");

            let response = self
                .client
                .post(&self.api_url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| NotifyError::Request(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                tracing::debug!(status = status.as_u16(), "notification delivered");
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            })
        }
        .boxed()
    }
}
