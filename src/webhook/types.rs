//! Types flowing through the webhook pipeline.

use axum::body::Bytes;
use axum::http::HeaderMap;

use crate::line::ReplyMessage;

/// One inbound webhook request as received from the network.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Delivery {
    pub fn new(headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }
}

/// The single request shape handed to authentication, whatever the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl From<Delivery> for CanonicalRequest {
    fn from(delivery: Delivery) -> Self {
        Self {
            headers: delivery.headers,
            body: delivery.body,
        }
    }
}

/// An intended reply, tied to the reply token of the event that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAction {
    pub reply_token: String,
    pub message: ReplyMessage,
}
