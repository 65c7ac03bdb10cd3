//! Inbound envelope adapter.
//!
//! A delivery reaches us either as the platform's own webhook request or
//! wrapped in a CloudEvent by an event broker. In the wrapped case the
//! event's `data` carries the original request as `{"headers": {..}, "body": ..}`.
//! Both shapes are normalized into a [`CanonicalRequest`] so that signature
//! verification sees exactly what the platform signed.
//!
//! Strategy selection is a structural probe, not a content-type switch:
//! - `ce-specversion` header present → binary-mode CloudEvent, body is `data`
//! - `application/cloudevents+json`, or a top-level JSON object with
//!   `specversion` → structured-mode CloudEvent
//! - anything else → passed through unchanged

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::debug;

use crate::error::AdaptError;
use crate::webhook::types::{CanonicalRequest, Delivery};

const CE_SPECVERSION_HEADER: &str = "ce-specversion";
const CE_STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

/// One way of turning a delivery into a canonical request.
pub trait InboundAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn adapt(&self, delivery: Delivery) -> Result<CanonicalRequest, AdaptError>;
}

/// The delivery already is the platform request.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawPassthrough;

impl InboundAdapter for RawPassthrough {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn adapt(&self, delivery: Delivery) -> Result<CanonicalRequest, AdaptError> {
        Ok(CanonicalRequest::from(delivery))
    }
}

/// How a CloudEvent is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeMode {
    /// Attributes in `ce-*` headers, body is the event data.
    Binary,
    /// The whole event is a JSON document in the body.
    Structured,
}

/// Unwraps a CloudEvent-wrapped platform request.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeUnwrap {
    mode: EnvelopeMode,
}

impl EnvelopeUnwrap {
    pub fn new(mode: EnvelopeMode) -> Self {
        Self { mode }
    }
}

impl InboundAdapter for EnvelopeUnwrap {
    fn name(&self) -> &'static str {
        match self.mode {
            EnvelopeMode::Binary => "cloudevent-binary",
            EnvelopeMode::Structured => "cloudevent-structured",
        }
    }

    fn adapt(&self, delivery: Delivery) -> Result<CanonicalRequest, AdaptError> {
        match self.mode {
            EnvelopeMode::Binary => unwrap_payload(&delivery.body),
            EnvelopeMode::Structured => {
                let event: StructuredEvent<'_> = serde_json::from_slice(&delivery.body)
                    .map_err(|e| AdaptError::BadEnvelope(format!("invalid CloudEvent: {e}")))?;

                match (event.data, event.data_base64) {
                    (Some(data), _) => unwrap_payload(data.get().as_bytes()),
                    (None, Some(encoded)) => {
                        let data = STANDARD.decode(encoded.trim()).map_err(|e| {
                            AdaptError::BadEnvelope(format!("invalid data_base64: {e}"))
                        })?;
                        unwrap_payload(&data)
                    }
                    (None, None) => Err(AdaptError::BadEnvelope(
                        "CloudEvent carries no data".to_string(),
                    )),
                }
            }
        }
    }
}

/// Selects the right strategy for each delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeAdapter;

impl EnvelopeAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Detect whether a delivery is wrapped, and how.
    pub fn probe(delivery: &Delivery) -> Option<EnvelopeMode> {
        if delivery.headers.contains_key(CE_SPECVERSION_HEADER) {
            return Some(EnvelopeMode::Binary);
        }

        let structured_content_type = delivery
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with(CE_STRUCTURED_CONTENT_TYPE));
        if structured_content_type {
            return Some(EnvelopeMode::Structured);
        }

        let looks_like_object = delivery
            .body
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'{');
        if !looks_like_object {
            return None;
        }

        match serde_json::from_slice::<SpecVersionProbe<'_>>(&delivery.body) {
            Ok(SpecVersionProbe {
                specversion: Some(_),
            }) => Some(EnvelopeMode::Structured),
            Ok(_) => None,
            // Truncated envelopes still name their spec version.
            Err(_) if mentions_specversion(&delivery.body) => Some(EnvelopeMode::Structured),
            Err(_) => None,
        }
    }

    /// Strategy for this delivery.
    pub fn select(&self, delivery: &Delivery) -> Box<dyn InboundAdapter> {
        match Self::probe(delivery) {
            Some(mode) => Box::new(EnvelopeUnwrap::new(mode)),
            None => Box::new(RawPassthrough),
        }
    }

    /// Normalize a delivery into the canonical request.
    pub fn adapt(&self, delivery: Delivery) -> Result<CanonicalRequest, AdaptError> {
        let strategy = self.select(&delivery);
        debug!(strategy = strategy.name(), "Adapting inbound delivery");
        strategy.adapt(delivery)
    }
}

fn mentions_specversion(body: &[u8]) -> bool {
    const KEY: &[u8] = b"\"specversion\"";
    body.windows(KEY.len()).any(|w| w == KEY)
}

#[derive(Deserialize)]
struct SpecVersionProbe<'a> {
    #[serde(borrow, default)]
    specversion: Option<&'a RawValue>,
}

#[derive(Deserialize)]
struct StructuredEvent<'a> {
    #[allow(dead_code)]
    specversion: String,
    #[serde(borrow, default)]
    data: Option<&'a RawValue>,
    #[serde(default)]
    data_base64: Option<String>,
}

/// The original HTTP request carried inside the CloudEvent data.
#[derive(Deserialize)]
struct EnvelopePayload<'a> {
    headers: HashMap<String, HeaderValues>,
    #[serde(borrow)]
    body: &'a RawValue,
}

/// Header values as forwarded: a single string or a list (Go's `http.Header`).
#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

fn unwrap_payload(data: &[u8]) -> Result<CanonicalRequest, AdaptError> {
    let payload: EnvelopePayload<'_> = serde_json::from_slice(data)
        .map_err(|e| AdaptError::BadEnvelope(format!("invalid envelope payload: {e}")))?;

    let mut headers = HeaderMap::new();
    for (name, values) in payload.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AdaptError::BadEnvelope(format!("invalid header name: {name}")))?;
        let values = match values {
            HeaderValues::One(v) => vec![v],
            HeaderValues::Many(vs) => vs,
        };
        for value in values {
            let value = HeaderValue::from_str(&value).map_err(|_| {
                AdaptError::BadEnvelope(format!("invalid value for header {name}"))
            })?;
            headers.append(name.clone(), value);
        }
    }

    // A string body is the request text itself; anything else is kept verbatim.
    let raw = payload.body.get();
    let body = if raw.starts_with('"') {
        let text: String = serde_json::from_str(raw)
            .map_err(|e| AdaptError::BadEnvelope(format!("invalid body string: {e}")))?;
        Bytes::from(text)
    } else {
        Bytes::copy_from_slice(raw.as_bytes())
    };

    Ok(CanonicalRequest { headers, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_BODY: &str = r#"{"events":[{"type":"message","replyToken":"tok1","message":{"type":"text","text":"叫"}}]}"#;

    fn line_delivery() -> Delivery {
        let mut headers = HeaderMap::new();
        headers.insert("x-line-signature", HeaderValue::from_static("c2ln"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Delivery::new(headers, LINE_BODY)
    }

    #[test]
    fn raw_delivery_passes_through_unchanged() {
        let delivery = line_delivery();
        assert_eq!(EnvelopeAdapter::probe(&delivery), None);

        let canonical = EnvelopeAdapter::new().adapt(delivery.clone()).unwrap();
        assert_eq!(canonical.headers, delivery.headers);
        assert_eq!(canonical.body, delivery.body);
    }

    #[test]
    fn non_json_body_passes_through() {
        let delivery = Delivery::new(HeaderMap::new(), "not json at all");
        assert_eq!(EnvelopeAdapter::probe(&delivery), None);
        let canonical = EnvelopeAdapter::new().adapt(delivery).unwrap();
        assert_eq!(canonical.body, Bytes::from_static(b"not json at all"));
    }

    #[test]
    fn structured_envelope_keeps_raw_body_text() {
        let envelope = format!(
            r#"{{"specversion":"1.0","id":"1","source":"line","type":"line.webhook",
                "data":{{"headers":{{"X-Line-Signature":"c2ln"}},"body":{LINE_BODY}}}}}"#
        );
        let delivery = Delivery::new(HeaderMap::new(), envelope);
        assert_eq!(
            EnvelopeAdapter::probe(&delivery),
            Some(EnvelopeMode::Structured)
        );

        let canonical = EnvelopeAdapter::new().adapt(delivery).unwrap();
        assert_eq!(canonical.body, Bytes::from(LINE_BODY));
        assert_eq!(canonical.headers.get("x-line-signature").unwrap(), "c2ln");
    }

    #[test]
    fn string_body_is_decoded() {
        let encoded_body = serde_json::to_string(LINE_BODY).unwrap();
        let envelope = format!(
            r#"{{"specversion":"1.0","data":{{"headers":{{}},"body":{encoded_body}}}}}"#
        );
        let canonical = EnvelopeAdapter::new()
            .adapt(Delivery::new(HeaderMap::new(), envelope))
            .unwrap();
        assert_eq!(canonical.body, Bytes::from(LINE_BODY));
    }

    #[test]
    fn binary_mode_uses_body_as_data() {
        let mut headers = HeaderMap::new();
        headers.insert("ce-specversion", HeaderValue::from_static("1.0"));
        headers.insert("ce-type", HeaderValue::from_static("line.webhook"));
        let data = format!(
            r#"{{"headers":{{"x-line-signature":["c2ln"],"accept":["a","b"]}},"body":{LINE_BODY}}}"#
        );
        let delivery = Delivery::new(headers, data);
        assert_eq!(EnvelopeAdapter::probe(&delivery), Some(EnvelopeMode::Binary));

        let canonical = EnvelopeAdapter::new().adapt(delivery).unwrap();
        assert_eq!(canonical.body, Bytes::from(LINE_BODY));
        assert_eq!(canonical.headers.get("x-line-signature").unwrap(), "c2ln");
        assert_eq!(canonical.headers.get_all("accept").iter().count(), 2);
        assert!(canonical.headers.get("ce-type").is_none());
    }

    #[test]
    fn data_base64_is_decoded() {
        let data = format!(r#"{{"headers":{{}},"body":{LINE_BODY}}}"#);
        let envelope = format!(
            r#"{{"specversion":"1.0","data_base64":"{}"}}"#,
            STANDARD.encode(data)
        );
        let canonical = EnvelopeAdapter::new()
            .adapt(Delivery::new(HeaderMap::new(), envelope))
            .unwrap();
        assert_eq!(canonical.body, Bytes::from(LINE_BODY));
    }

    #[test]
    fn envelope_without_data_is_bad() {
        let delivery = Delivery::new(HeaderMap::new(), r#"{"specversion":"1.0","id":"1"}"#);
        let err = EnvelopeAdapter::new().adapt(delivery).unwrap_err();
        assert!(matches!(err, AdaptError::BadEnvelope(_)));
    }

    #[test]
    fn envelope_data_without_body_is_bad() {
        let delivery = Delivery::new(
            HeaderMap::new(),
            r#"{"specversion":"1.0","data":{"headers":{}}}"#,
        );
        assert!(EnvelopeAdapter::new().adapt(delivery).is_err());
    }

    #[test]
    fn binary_mode_with_garbage_body_is_bad() {
        let mut headers = HeaderMap::new();
        headers.insert("ce-specversion", HeaderValue::from_static("1.0"));
        let err = EnvelopeAdapter::new()
            .adapt(Delivery::new(headers, "{{{"))
            .unwrap_err();
        assert!(matches!(err, AdaptError::BadEnvelope(_)));
    }

    #[test]
    fn structured_content_type_with_garbage_is_bad() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/cloudevents+json; charset=utf-8"),
        );
        let err = EnvelopeAdapter::new()
            .adapt(Delivery::new(headers, "nope"))
            .unwrap_err();
        assert!(matches!(err, AdaptError::BadEnvelope(_)));
    }

    #[test]
    fn truncated_structured_envelope_is_bad() {
        let delivery = Delivery::new(
            HeaderMap::new(),
            r#"{"specversion":"1.0","data":{"headers":{},"body":"#,
        );
        assert_eq!(
            EnvelopeAdapter::probe(&delivery),
            Some(EnvelopeMode::Structured)
        );
        let err = EnvelopeAdapter::new().adapt(delivery).unwrap_err();
        assert!(matches!(err, AdaptError::BadEnvelope(_)));
    }

    #[test]
    fn truncated_raw_body_passes_through() {
        let delivery = Delivery::new(HeaderMap::new(), r#"{"events":[{"type":"mess"#);
        assert_eq!(EnvelopeAdapter::probe(&delivery), None);
    }

    #[test]
    fn invalid_header_name_is_bad() {
        let delivery = Delivery::new(
            HeaderMap::new(),
            r#"{"specversion":"1.0","data":{"headers":{"bad header":"x"},"body":{}}}"#,
        );
        assert!(EnvelopeAdapter::new().adapt(delivery).is_err());
    }
}
