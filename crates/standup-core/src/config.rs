//! Provider endpoint and credential configuration
//!
//! The config file maps provider names to the management cluster endpoint
//! and credentials used to talk to it:
//!
//! ```yaml
//! aws:
//!   context: giantswarm-aws
//!   endpoint: https://api.g8s.example.com
//!   token: s3cr3t
//! kvm:
//!   context: giantswarm-kvm
//!   endpoint: https://api.g8s.kvm.example.com
//!   username: ci
//!   password: hunter2
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Credentials and endpoint of one provider's management cluster
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub username: String,
}

// Keeps credentials out of debug logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("context", &self.context)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("has_token", &!self.token.is_empty())
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Load and validate the configuration of `provider` from a config file
    pub fn load(path: impl AsRef<Path>, provider: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content, provider)
    }

    pub fn from_yaml(content: &str, provider: &str) -> Result<Self> {
        let mut all: BTreeMap<String, ProviderConfig> = serde_yaml::from_str(content)?;
        let config = all.remove(provider).ok_or_else(|| {
            invalid(format!("missing config for provider '{}'", provider))
        })?;
        config.validate(provider)?;
        Ok(config)
    }

    fn validate(&self, provider: &str) -> Result<()> {
        if self.context.is_empty() {
            return Err(invalid(format!("missing context for provider '{}'", provider)));
        }
        if self.endpoint.is_empty() {
            return Err(invalid(format!("missing endpoint for provider '{}'", provider)));
        }
        if !self.has_token() && (self.username.is_empty() || self.password.is_empty()) {
            return Err(invalid(format!(
                "missing token or username/password for provider '{}'",
                provider
            )));
        }
        Ok(())
    }

    /// Whether token authentication is configured
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::InvalidConfig { message }
}
