//! LINE webhook event model.
//!
//! Events and message contents are closed tagged unions keyed on `type`.
//! Types this crate does not handle decode to `Other` instead of failing,
//! so a new platform event kind never rejects a whole batch.

use serde::Deserialize;

/// Top-level webhook request body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Bot user id the events were sent to.
    #[serde(default)]
    pub destination: Option<String>,
    pub events: Vec<Event>,
}

/// One platform-reported activity unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    Message {
        #[serde(default)]
        reply_token: Option<String>,
        message: MessageContent,
        #[serde(default)]
        source: Option<Source>,
        #[serde(default)]
        timestamp: Option<i64>,
        #[serde(default)]
        webhook_event_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Follow {
        #[serde(default)]
        reply_token: Option<String>,
        #[serde(default)]
        source: Option<Source>,
    },
    #[serde(rename_all = "camelCase")]
    Unfollow {
        #[serde(default)]
        source: Option<Source>,
    },
    #[serde(rename_all = "camelCase")]
    Join {
        #[serde(default)]
        reply_token: Option<String>,
        #[serde(default)]
        source: Option<Source>,
    },
    #[serde(rename_all = "camelCase")]
    Leave {
        #[serde(default)]
        source: Option<Source>,
    },
    #[serde(rename_all = "camelCase")]
    Postback {
        #[serde(default)]
        reply_token: Option<String>,
        postback: Postback,
        #[serde(default)]
        source: Option<Source>,
    },
    #[serde(other)]
    Other,
}

impl Event {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Message { .. } => "message",
            Event::Follow { .. } => "follow",
            Event::Unfollow { .. } => "unfollow",
            Event::Join { .. } => "join",
            Event::Leave { .. } => "leave",
            Event::Postback { .. } => "postback",
            Event::Other => "other",
        }
    }

    /// Reply token, for event types that carry one.
    pub fn reply_token(&self) -> Option<&str> {
        match self {
            Event::Message { reply_token, .. }
            | Event::Follow { reply_token, .. }
            | Event::Join { reply_token, .. }
            | Event::Postback { reply_token, .. } => reply_token.as_deref(),
            Event::Unfollow { .. } | Event::Leave { .. } | Event::Other => None,
        }
    }
}

/// Message body of a `message` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    #[serde(rename_all = "camelCase")]
    Text {
        #[serde(default)]
        id: Option<String>,
        text: String,
        #[serde(default)]
        quote_token: Option<String>,
    },
    Image {
        #[serde(default)]
        id: Option<String>,
    },
    Video {
        #[serde(default)]
        id: Option<String>,
    },
    Audio {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        duration: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    File {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        file_name: Option<String>,
    },
    Location {
        #[serde(default)]
        title: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    #[serde(rename_all = "camelCase")]
    Sticker {
        #[serde(default)]
        package_id: Option<String>,
        #[serde(default)]
        sticker_id: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Where an event came from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Source {
    #[serde(rename_all = "camelCase")]
    User {
        #[serde(default)]
        user_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        group_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Room {
        room_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Postback {
    pub data: String,
}
