//! HTTP routes: webhook callbacks, health check and static assets.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{Result, WebhookError};
use crate::line::LineMessagingClient;
use crate::telemetry::TraceContext;
use crate::webhook::dispatch::Dispatcher;
use crate::webhook::parser::LineWebhookParser;
use crate::webhook::rules::RulesEngine;
use crate::webhook::types::Delivery;

/// Shared state for webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<Dispatcher>,
}

impl WebhookState {
    /// Wire the LINE parser, trigger rules and reply client from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let rules = RulesEngine::from_config(config)?;
        info!(rules = rules.rule_count(), trigger = %config.trigger, "Trigger rules loaded");

        let parser = Arc::new(LineWebhookParser::new(config.line.channel_secret.clone()));
        let sender = Arc::new(LineMessagingClient::new(&config.line)?);

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new(parser, rules, sender)),
        })
    }
}

/// POST /callback, POST /line
///
/// 200 once the batch was accepted, whatever happened to individual replies.
async fn callback(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<&'static str, WebhookError> {
    let trace = TraceContext::from_headers(&headers);
    debug!(remote_parent = trace.is_remote(), "Webhook delivery received");
    let delivery = Delivery::new(headers, body);

    match state.dispatcher.dispatch(delivery, &trace).await {
        Ok(_) => Ok("OK"),
        Err(e) => {
            warn!(error = %e, status = e.status_code().as_u16(), "Delivery rejected");
            Err(e)
        }
    }
}

/// GET /healthz
async fn healthz() -> &'static str {
    "OK"
}

/// Build the webhook and health routes.
pub fn webhook_routes(state: WebhookState) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .route("/line", post(callback))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Serve files from `dir` under `/static`.
pub fn static_routes(dir: impl AsRef<Path>) -> Router {
    Router::new().nest_service("/static", ServeDir::new(dir.as_ref()))
}

/// The full application router.
pub fn app(state: WebhookState, static_dir: impl AsRef<Path>) -> Router {
    webhook_routes(state)
        .merge(static_routes(static_dir))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::error::ReplyError;
    use crate::webhook::executor::ReplySender;
    use crate::webhook::types::ReplyAction;

    struct NoopSender;

    #[async_trait::async_trait]
    impl ReplySender for NoopSender {
        async fn reply(
            &self,
            _action: &ReplyAction,
            _trace: &TraceContext,
        ) -> std::result::Result<(), ReplyError> {
            Ok(())
        }
    }

    fn state() -> WebhookState {
        WebhookState {
            dispatcher: Arc::new(Dispatcher::new(
                Arc::new(LineWebhookParser::new(SecretString::from("secret"))),
                RulesEngine::empty(),
                Arc::new(NoopSender),
            )),
        }
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let resp = webhook_routes(state())
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "OK");
    }

    #[tokio::test]
    async fn state_from_config_accepts_signed_delivery() {
        let config = AppConfig::from_lookup(|key| match key {
            "BASE_URL" => Some("https://example.com".to_string()),
            "LINE_CHANNEL_SECRET" => Some("secret".to_string()),
            "LINE_CHANNEL_ACCESS_TOKEN" => Some("token".to_string()),
            _ => None,
        })
        .unwrap();
        let state = WebhookState::from_config(&config).unwrap();

        let body = r#"{"events":[]}"#;
        let sig = crate::line::signature::sign(b"secret", body.as_bytes());
        let resp = webhook_routes(state)
            .oneshot(
                Request::post("/callback")
                    .header("x-line-signature", sig)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn truncated_envelope_is_bad_request() {
        let resp = webhook_routes(state())
            .oneshot(
                Request::post("/line")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"specversion":"1.0","data":{"headers":{},"body":"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unsigned_callback_is_unauthorized() {
        for path in ["/callback", "/line"] {
            let resp = webhook_routes(state())
                .oneshot(
                    Request::post(path)
                        .body(Body::from(r#"{"events":[]}"#))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
            assert!(body_string(resp).await.contains("error"));
        }
    }

    #[tokio::test]
    async fn bad_envelope_is_bad_request() {
        let resp = webhook_routes(state())
            .oneshot(
                Request::post("/callback")
                    .header("ce-specversion", "1.0")
                    .body(Body::from("not an envelope"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn static_files_are_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("audio")).unwrap();
        std::fs::write(dir.path().join("audio/noot_noot.mp3"), b"ID3fake").unwrap();

        let router = app(state(), dir.path());

        let resp = router
            .clone()
            .oneshot(
                Request::get("/static/audio/noot_noot.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "ID3fake");

        let missing = router
            .oneshot(
                Request::get("/static/audio/missing.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
