//! Credential retrieval for the structuring service.
//!
//! The API key is never embedded in the pipeline; it is asked for at call
//! time from a [`CredentialProvider`]. Failing to obtain it yields
//! [`StructureError::CredentialUnavailable`] before any request reaches the
//! structuring service.

use crate::error::StructureError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A secret API key. `Debug` and `Display` never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for placing into a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First four characters followed by `***`, safe for logs.
    pub fn redacted(&self) -> String {
        if self.0.chars().count() > 4 {
            format!("{}***", self.0.chars().take(4).collect::<String>())
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Source of the structuring service credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn api_key(&self) -> Result<ApiKey, StructureError>;
}

/// A key supplied directly by the caller.
pub struct StaticCredentials(ApiKey);

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self(ApiKey::new(key))
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn api_key(&self) -> Result<ApiKey, StructureError> {
        if self.0.expose().is_empty() {
            return Err(StructureError::CredentialUnavailable {
                reason: "configured API key is empty".into(),
            });
        }
        Ok(self.0.clone())
    }
}

/// Reads the key from the first non-empty environment variable in `vars`.
pub struct EnvCredentials {
    vars: Vec<String>,
}

impl EnvCredentials {
    pub fn new<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn api_key(&self) -> Result<ApiKey, StructureError> {
        for var in &self.vars {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    debug!("Using structuring API key from ${}", var);
                    return Ok(ApiKey::new(value.trim()));
                }
            }
        }
        Err(StructureError::CredentialUnavailable {
            reason: format!("none of {} is set", self.vars.join(", ")),
        })
    }
}

/// Fetches the key from an HTTP endpoint answering `{"apiKey": "..."}`.
pub struct RemoteCredentials {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct KeyReply {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

impl RemoteCredentials {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, StructureError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StructureError::CredentialUnavailable {
                reason: format!("could not build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CredentialProvider for RemoteCredentials {
    async fn api_key(&self) -> Result<ApiKey, StructureError> {
        let unavailable = |reason: String| StructureError::CredentialUnavailable { reason };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| unavailable(format!("could not reach {}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("{} answered HTTP {}", self.url, status.as_u16())));
        }

        let reply: KeyReply = response
            .json()
            .await
            .map_err(|e| unavailable(format!("malformed key reply from {}: {e}", self.url)))?;

        match reply.api_key {
            Some(key) if !key.is_empty() => {
                debug!("Fetched structuring API key from {}", self.url);
                Ok(ApiKey::new(key))
            }
            _ => Err(unavailable(format!("{} returned no apiKey", self.url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_redacted() {
        let key = ApiKey::new("AIzaSyExampleSecret");
        assert_eq!(format!("{key:?}"), "ApiKey(\"AIza***\")");
        assert_eq!(key.to_string(), "AIza***");
        assert_eq!(ApiKey::new("abc").redacted(), "***");
        assert_eq!(key.expose(), "AIzaSyExampleSecret");
    }

    #[tokio::test]
    async fn static_credentials_return_key() {
        let key = StaticCredentials::new("k-123").api_key().await.unwrap();
        assert_eq!(key.expose(), "k-123");
    }

    #[tokio::test]
    async fn empty_static_key_is_unavailable() {
        let err = StaticCredentials::new("").api_key().await.unwrap_err();
        assert!(matches!(err, StructureError::CredentialUnavailable { .. }));
    }

    #[tokio::test]
    async fn env_credentials_report_missing_vars() {
        let provider = EnvCredentials::new(["RESUME2JSON_TEST_SURELY_UNSET_VAR"]);
        match provider.api_key().await {
            Err(StructureError::CredentialUnavailable { reason }) => {
                assert!(reason.contains("RESUME2JSON_TEST_SURELY_UNSET_VAR"));
            }
            other => panic!("expected CredentialUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_key_endpoint_is_unavailable() {
        // Port 9 on loopback: nothing listens there, the connect is refused.
        let provider = RemoteCredentials::new("http://127.0.0.1:9/api-key", 2).unwrap();
        let err = provider.api_key().await.unwrap_err();
        assert!(matches!(err, StructureError::CredentialUnavailable { .. }));
    }
}
