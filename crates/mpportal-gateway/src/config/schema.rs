use std::collections::HashSet;

use mpportal_core::error::{PortalError, Result};
use mpportal_core::protocol::cipher::AesKey;
use serde::Deserialize;

use crate::credentials::EncodingMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortalConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub replies: ReplyTexts,

    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

impl PortalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PortalError::BadRequest(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.apps.is_empty() {
            return Err(PortalError::BadRequest("apps must not be empty".into()));
        }

        self.gateway.validate()?;

        let mut seen = HashSet::new();
        for app in &self.apps {
            if !seen.insert(app.id.as_str()) {
                return Err(PortalError::BadRequest(format!("duplicate app id: {}", app.id)));
            }
            app.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Time budget for dispatch + encode before the ack token is returned.
    #[serde(default = "default_reply_deadline_ms")]
    pub reply_deadline_ms: u64,

    /// Body written when there is nothing (or nothing in time) to reply.
    #[serde(default = "default_ack_token")]
    pub ack_token: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            reply_deadline_ms: default_reply_deadline_ms(),
            ack_token: default_ack_token(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=4900).contains(&self.reply_deadline_ms) {
            return Err(PortalError::BadRequest(
                "gateway.reply_deadline_ms must be between 100 and 4900".into(),
            ));
        }
        if self.ack_token.trim().is_empty() {
            return Err(PortalError::BadRequest(
                "gateway.ack_token must not be empty".into(),
            ));
        }
        if !(1024..=1_048_576).contains(&self.max_body_bytes) {
            return Err(PortalError::BadRequest(
                "gateway.max_body_bytes must be between 1024 and 1048576".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_reply_deadline_ms() -> u64 {
    4000
}
fn default_ack_token() -> String {
    "success".into()
}
fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// Canned reply texts. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReplyTexts {
    pub welcome: String,
    pub text: String,
    pub image: String,
    pub voice: String,
    pub video: String,
    pub short_video: String,
    pub location: String,
    pub link: String,
    pub click: String,
    /// Sent when the handler fails before producing a reply.
    pub fallback: String,
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self {
            welcome: "Thanks for following!".into(),
            text: "Got your message.".into(),
            image: "Got your image.".into(),
            voice: "Got your voice message.".into(),
            video: "Got your video.".into(),
            short_video: "Got your short video.".into(),
            location: "Got your location.".into(),
            link: "Got your link.".into(),
            click: "Got your menu click.".into(),
            fallback: "Sorry, something went wrong. Please try again later.".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Platform app id; also the `:app_id` route segment.
    pub id: String,
    pub token: String,

    /// 43-character EncodingAESKey. Required unless `encoding_mode` is plain.
    #[serde(default)]
    pub encoding_aes_key: Option<String>,

    #[serde(default)]
    pub encoding_mode: EncodingMode,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PortalError::BadRequest("apps[].id must not be empty".into()));
        }
        if self.token.is_empty() {
            return Err(PortalError::BadRequest(format!(
                "apps[{}].token must not be empty",
                self.id
            )));
        }
        match (&self.encoding_aes_key, self.encoding_mode) {
            (None, EncodingMode::Plain) => {}
            (None, mode) => {
                return Err(PortalError::BadRequest(format!(
                    "apps[{}].encoding_aes_key is required for {} mode",
                    self.id,
                    mode.as_str()
                )));
            }
            (Some(_), _) => {
                self.aes_key()?;
            }
        }
        Ok(())
    }

    /// Decode the configured EncodingAESKey, if any.
    pub fn aes_key(&self) -> Result<Option<AesKey>> {
        match &self.encoding_aes_key {
            None => Ok(None),
            Some(k) => AesKey::from_encoding_key(k).map(Some).map_err(|e| {
                PortalError::BadRequest(format!("apps[{}].encoding_aes_key: {e}", self.id))
            }),
        }
    }
}
