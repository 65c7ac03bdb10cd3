//! Authentication and batch decoding of canonical webhook requests.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::error::{AuthError, ParseError, WebhookError};
use crate::line::events::{Event, WebhookPayload};
use crate::line::signature::{self, SIGNATURE_HEADER};
use crate::webhook::types::CanonicalRequest;

/// Authenticates a canonical request and decodes its event batch.
///
/// Either the whole batch is trusted and returned in arrival order, or the
/// request is rejected. There is no partial result.
pub trait WebhookParser: Send + Sync {
    fn parse(&self, request: &CanonicalRequest) -> Result<Vec<Event>, WebhookError>;
}

/// LINE webhook parser keyed by the channel secret.
pub struct LineWebhookParser {
    channel_secret: SecretString,
}

impl LineWebhookParser {
    pub fn new(channel_secret: SecretString) -> Self {
        Self { channel_secret }
    }

    fn authenticate(&self, request: &CanonicalRequest) -> Result<(), AuthError> {
        let signature = request
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingSignature)?;

        if signature::verify(
            self.channel_secret.expose_secret().as_bytes(),
            &request.body,
            signature,
        ) {
            Ok(())
        } else {
            warn!("Webhook signature mismatch");
            Err(AuthError::InvalidSignature)
        }
    }
}

impl WebhookParser for LineWebhookParser {
    fn parse(&self, request: &CanonicalRequest) -> Result<Vec<Event>, WebhookError> {
        self.authenticate(request)?;

        let payload: WebhookPayload =
            serde_json::from_slice(&request.body).map_err(ParseError::MalformedBatch)?;

        debug!(
            destination = payload.destination.as_deref().unwrap_or("-"),
            events = payload.events.len(),
            "Webhook batch decoded"
        );
        Ok(payload.events)
    }
}
