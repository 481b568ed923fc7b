use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use tokio::time::Duration;
use url::Url;

pub const DEFAULT_NOTIFY_URL: &str = "https://notify-api.line.me/api/notify";

const STICKER_PACKAGE_ID: &str = "446";
const STICKER_ID: &str = "2006";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct NotifyResponse {
    message: Option<String>,
}

async fn assert_ok_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<NotifyResponse>(&text)
        .ok()
        .and_then(|payload| payload.message)
        .unwrap_or(text);
    Err(anyhow!("LINE Notify request failed: {status} {detail}"))
}

/// Relays text messages to LINE Notify. One attempt per message, no retry.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl Notifier {
    pub fn new(endpoint: Url, token: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub async fn send_message(&self, message: &str) -> Result<()> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("LINE Notify token is not configured"))?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .form(&[
                ("message", message),
                ("stickerPackageId", STICKER_PACKAGE_ID),
                ("stickerId", STICKER_ID),
            ])
            .send()
            .await?;
        assert_ok_response(response).await?;
        tracing::info!(chars = message.chars().count(), "notification sent");
        Ok(())
    }
}
