//! Per-app credentials and the store that resolves them.
//!
//! The portal route carries the platform app id; everything needed to verify
//! and open a callback for that app (token, symmetric key, accepted encoding
//! modes) is looked up through [`CredentialStore`]. The default store is
//! built from the `apps` config section.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mpportal_core::error::{PortalError, Result};
use mpportal_core::protocol::cipher::AesKey;
use serde::Deserialize;

use crate::config::AppConfig;

/// Which push encodings an app accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Plaintext bodies only.
    #[default]
    Plain,
    /// Plaintext and `encrypt_type=aes` bodies.
    Compatible,
    /// `encrypt_type=aes` bodies only.
    Safe,
}

impl EncodingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EncodingMode::Plain => "plain",
            EncodingMode::Compatible => "compatible",
            EncodingMode::Safe => "safe",
        }
    }

    pub fn accepts_plain(self) -> bool {
        !matches!(self, EncodingMode::Safe)
    }

    pub fn accepts_aes(self) -> bool {
        !matches!(self, EncodingMode::Plain)
    }
}

/// Secrets for one platform app.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub token: String,
    pub aes_key: Option<AesKey>,
    pub encoding_mode: EncodingMode,
}

impl AppCredentials {
    pub fn from_config(app: &AppConfig) -> Result<Self> {
        Ok(Self {
            app_id: app.id.clone(),
            token: app.token.clone(),
            aes_key: app.aes_key()?,
            encoding_mode: app.encoding_mode,
        })
    }
}

/// Resolves an app id to its credentials.
///
/// Unknown ids must fail with [`PortalError::UnknownApp`].
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    async fn credentials(&self, app_id: &str) -> Result<Arc<AppCredentials>>;
}

/// In-memory store, immutable after startup.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    apps: HashMap<String, Arc<AppCredentials>>,
}

impl StaticCredentialStore {
    pub fn new(apps: impl IntoIterator<Item = AppCredentials>) -> Self {
        Self {
            apps: apps
                .into_iter()
                .map(|c| (c.app_id.clone(), Arc::new(c)))
                .collect(),
        }
    }

    pub fn from_config(apps: &[AppConfig]) -> Result<Self> {
        let creds = apps
            .iter()
            .map(AppCredentials::from_config)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(creds))
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn credentials(&self, app_id: &str) -> Result<Arc<AppCredentials>> {
        self.apps
            .get(app_id)
            .cloned()
            .ok_or_else(|| PortalError::UnknownApp(app_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn mode_acceptance() {
        assert!(EncodingMode::Plain.accepts_plain());
        assert!(!EncodingMode::Plain.accepts_aes());
        assert!(EncodingMode::Compatible.accepts_plain());
        assert!(EncodingMode::Compatible.accepts_aes());
        assert!(!EncodingMode::Safe.accepts_plain());
        assert!(EncodingMode::Safe.accepts_aes());
    }

    #[tokio::test]
    async fn unknown_app_is_reported() {
        let store = StaticCredentialStore::new([AppCredentials {
            app_id: "wx1".into(),
            token: "t".into(),
            aes_key: None,
            encoding_mode: EncodingMode::Plain,
        }]);
        assert_eq!(store.credentials("wx1").await.unwrap().token, "t");
        let err = store.credentials("wx2").await.unwrap_err();
        assert_eq!(err.client_code().as_str(), "UNKNOWN_APP");
    }
}
