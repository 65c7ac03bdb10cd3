//! Trigger rules: exact text → reply payload.
//!
//! Matching is byte-for-byte string equality. No trimming, no case folding,
//! no Unicode normalization: `"叫 "` and `"Noot"` do not match `"叫"` / `"noot"`.

use reqwest::Url;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::line::events::{Event, MessageContent};
use crate::line::messaging::ReplyMessage;
use crate::webhook::types::ReplyAction;

/// Path of the audio clip sent for the default trigger, relative to the base URL.
pub const NOOT_NOOT_PATH: &str = "/static/audio/noot_noot.mp3";

/// Duration advertised for the default audio clip.
pub const NOOT_NOOT_DURATION_MS: u32 = 1000;

/// One exact-match rule with its pre-built reply.
#[derive(Debug, Clone)]
pub struct TriggerRule {
    /// Text that must equal the incoming message exactly.
    pub trigger: String,
    /// Reply sent on match.
    pub reply: ReplyMessage,
}

impl TriggerRule {
    pub fn new(trigger: impl Into<String>, reply: ReplyMessage) -> Self {
        Self {
            trigger: trigger.into(),
            reply,
        }
    }

    /// Rule replying with an audio clip at `base_url` + `path`.
    pub fn audio(
        trigger: impl Into<String>,
        base_url: &Url,
        path: &str,
        duration_ms: u32,
    ) -> Result<Self, ConfigError> {
        let url = join_path(base_url, path)?;
        Ok(Self::new(trigger, ReplyMessage::audio(&url, duration_ms)))
    }

    fn matches(&self, text: &str) -> bool {
        self.trigger == text
    }
}

/// Ordered rule set. First matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct RulesEngine {
    rules: Vec<TriggerRule>,
}

impl RulesEngine {
    /// Create an empty rules engine.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The single configured rule: trigger text → noot noot clip.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut engine = Self::empty();
        engine.add_rule(TriggerRule::audio(
            config.trigger.clone(),
            &config.base_url,
            NOOT_NOOT_PATH,
            NOOT_NOOT_DURATION_MS,
        )?);
        Ok(engine)
    }

    pub fn add_rule(&mut self, rule: TriggerRule) {
        self.rules.push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Decide whether an event should be answered, and with what.
    ///
    /// Only text messages carrying a reply token are eligible.
    pub fn evaluate(&self, event: &Event) -> Option<ReplyAction> {
        let Event::Message {
            reply_token,
            message: MessageContent::Text { text, .. },
            ..
        } = event
        else {
            return None;
        };

        let rule = self.rules.iter().find(|r| r.matches(text))?;

        let Some(reply_token) = reply_token else {
            debug!(trigger = %rule.trigger, "Trigger matched but event has no reply token");
            return None;
        };

        debug!(trigger = %rule.trigger, "Trigger rule matched");
        Some(ReplyAction {
            reply_token: reply_token.clone(),
            message: rule.reply.clone(),
        })
    }
}

/// Append `path` to the base URL's path, like Go's `url.JoinPath`.
///
/// Unlike `Url::join`, the last segment of the base is never replaced.
pub fn join_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| ConfigError::InvalidValue {
            key: "BASE_URL".into(),
            message: format!("{base} cannot be used as a base URL"),
        })?;
        segments.pop_if_empty();
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}
