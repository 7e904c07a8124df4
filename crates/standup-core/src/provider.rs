//! Provider capabilities and pipeline routing

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Optional cluster feature whose readiness is checked after creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    ExternalDns,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::ExternalDns => "external-dns",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable lookup of provider features and pipeline installation overrides
///
/// Built once at startup and handed to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct ProviderTable {
    features: BTreeMap<String, BTreeSet<Feature>>,
    pipelines: BTreeMap<String, String>,
}

impl ProviderTable {
    /// The table for the providers standup knows about
    pub fn standard() -> Self {
        let mut table = Self::default();
        for provider in ["aws", "azure", "gcp"] {
            table = table.with_feature(provider, Feature::ExternalDns);
        }
        for provider in ["kvm", "openstack"] {
            table.features.entry(provider.to_string()).or_default();
        }
        table
    }

    /// Add a feature to a provider
    pub fn with_feature(mut self, provider: &str, feature: Feature) -> Self {
        self.features
            .entry(provider.to_string())
            .or_default()
            .insert(feature);
        self
    }

    /// Route a pipeline to a specific installation instead of the provider's
    pub fn with_pipeline(mut self, pipeline: &str, installation: &str) -> Self {
        self.pipelines
            .insert(pipeline.to_string(), installation.to_string());
        self
    }

    pub fn has_feature(&self, provider: &str, feature: Feature) -> bool {
        self.features
            .get(provider)
            .is_some_and(|set| set.contains(&feature))
    }

    pub fn is_known_provider(&self, provider: &str) -> bool {
        self.features.contains_key(provider)
    }

    /// The installation a pipeline targets, falling back to the provider name
    pub fn installation_for<'a>(&'a self, pipeline: Option<&str>, provider: &'a str) -> &'a str {
        pipeline
            .and_then(|p| self.pipelines.get(p))
            .map(String::as_str)
            .unwrap_or(provider)
    }
}
