//! LINE Messaging API reply client.
//!
//! Sends one reply request per call. No retries: a reply token is single-use
//! and the platform rejects a second attempt anyway.

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::LineConfig;
use crate::error::ReplyError;
use crate::telemetry::TraceContext;
use crate::webhook::executor::ReplySender;
use crate::webhook::types::ReplyAction;

/// Outbound message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReplyMessage {
    /// Audio attachment referenced by URL; `duration` is in milliseconds.
    #[serde(rename_all = "camelCase")]
    Audio {
        original_content_url: String,
        duration: u32,
    },
    Text { text: String },
}

impl ReplyMessage {
    pub fn audio(url: &Url, duration_ms: u32) -> Self {
        ReplyMessage::Audio {
            original_content_url: url.to_string(),
            duration: duration_ms,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ReplyMessage::Text { text: text.into() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [ReplyMessage],
}

/// Client for `POST /v2/bot/message/reply`.
pub struct LineMessagingClient {
    client: reqwest::Client,
    api_base: Url,
    access_token: SecretString,
}

impl LineMessagingClient {
    pub fn new(config: &LineConfig) -> Result<Self, ReplyError> {
        let client = reqwest::Client::builder()
            .timeout(config.reply_timeout)
            .build()
            .map_err(|e| ReplyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            access_token: config.channel_access_token.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base.as_str().trim_end_matches('/'))
    }

    /// Send `messages` as the reply to `reply_token`, continuing `trace`.
    pub async fn reply_message(
        &self,
        reply_token: &str,
        messages: &[ReplyMessage],
        trace: &TraceContext,
    ) -> Result<(), ReplyError> {
        let body = ReplyRequest {
            reply_token,
            messages,
        };

        let mut request = self
            .client
            .post(self.api_url("/v2/bot/message/reply"))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body);
        for (name, value) in trace.outbound_headers() {
            request = request.header(name, value);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ReplyError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReplyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let request_id = resp
            .headers()
            .get("x-line-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        debug!(request_id = %request_id, "LINE reply accepted");
        info!(messages = messages.len(), "Reply message sent");
        Ok(())
    }
}

#[async_trait]
impl ReplySender for LineMessagingClient {
    async fn reply(&self, action: &ReplyAction, trace: &TraceContext) -> Result<(), ReplyError> {
        self.reply_message(
            &action.reply_token,
            std::slice::from_ref(&action.message),
            trace,
        )
        .await
    }
}
