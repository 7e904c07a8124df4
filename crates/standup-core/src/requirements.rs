//! Release requirements (`requests.yaml`)
//!
//! Each provider directory of the releases repository carries a list of
//! rules. A rule names a range of release versions and the minimum app or
//! component versions any release in that range must ship:
//!
//! ```yaml
//! releases:
//!   - name: ">= 13.0.0"
//!     requests:
//!       - name: aws-operator
//!         version: ">= 9.1.0"
//!         issue: https://github.com/giantswarm/roadmap/issues/1
//! ```

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use crate::constraint::{Constraint, precedence};
use crate::error::{CoreError, Result, parse_version};
use crate::release::Release;

/// File name of the requirements file inside a provider directory
pub const REQUIREMENTS_FILE: &str = "requests.yaml";

/// The requirements file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub releases: Vec<RequirementRule>,
}

/// A version range and the minimum versions it requires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementRule {
    /// Version range expression, see [`crate::constraint`]
    pub name: String,

    #[serde(default)]
    pub requests: Vec<AppRequirement>,
}

/// Minimum version of a single app or component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRequirement {
    pub name: String,

    /// Must have the form `>= X.Y.Z`
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

impl AppRequirement {
    /// The minimum version this requirement asks for
    pub fn minimum(&self) -> Result<Version> {
        let literal = self
            .version
            .strip_prefix(">=")
            .ok_or_else(|| CoreError::InvalidConstraint {
                constraint: self.version.clone(),
                message: "app requirements must start with '>='".to_string(),
            })?;
        parse_version(literal)
    }
}

impl Requirements {
    /// Load the requirements file
    ///
    /// A file that cannot be parsed is an error; individual bad rules are
    /// only reported when merging.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Fold every rule matching `target` into one app -> minimum version map
    ///
    /// Rules that cannot be evaluated and requirements that cannot be parsed
    /// are skipped with a warning. When several rules name the same app the
    /// highest minimum wins.
    pub fn merge(&self, target: &Version) -> MergedRequirements {
        let mut merged = MergedRequirements::default();

        for rule in &self.releases {
            let affected = match Constraint::parse(&rule.name) {
                Ok(constraint) => constraint.matches(target),
                Err(e) => {
                    tracing::warn!(
                        rule = %rule.name,
                        target = %target,
                        error = %e,
                        "unable to check whether rule affects release, skipping"
                    );
                    continue;
                }
            };

            if !affected {
                continue;
            }
            tracing::debug!(rule = %rule.name, target = %target, "rule affects release");

            for request in &rule.requests {
                match request.minimum() {
                    Ok(candidate) => merged.raise(&request.name, candidate),
                    Err(e) => {
                        tracing::warn!(
                            app = %request.name,
                            request = %request.version,
                            error = %e,
                            "unable to parse app requirement, skipping"
                        );
                    }
                }
            }
        }

        merged
    }
}

/// App name -> minimum version, iterated in name order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedRequirements {
    minimums: BTreeMap<String, Version>,
}

impl MergedRequirements {
    /// Record a minimum, keeping the greater of the existing and new value
    ///
    /// Build metadata does not make a version greater.
    pub fn raise(&mut self, name: &str, candidate: Version) {
        match self.minimums.get_mut(name) {
            Some(current) if precedence(&candidate, current) == Ordering::Greater => {
                *current = candidate
            }
            Some(_) => {}
            None => {
                self.minimums.insert(name.to_string(), candidate);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Version> {
        self.minimums.get(name)
    }

    pub fn len(&self) -> usize {
        self.minimums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minimums.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Version)> {
        self.minimums.iter()
    }

    /// Raise matching components and apps of `release` to their minimums
    ///
    /// Components are searched before apps. Versions are never lowered.
    /// Names found in neither list are reported and left alone.
    pub fn apply(&self, release: &mut Release) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        for (name, minimum) in &self.minimums {
            let spec = &mut release.spec;
            let current = if let Some(c) = spec.components.iter_mut().find(|c| c.name == *name) {
                &mut c.version
            } else if let Some(a) = spec.apps.iter_mut().find(|a| a.name == *name) {
                &mut a.version
            } else {
                tracing::warn!(
                    app = %name,
                    "adding a new component from the requirements is not supported"
                );
                report.unmatched.push(name.clone());
                continue;
            };

            let from = parse_version(current)?;
            if precedence(&from, minimum) == Ordering::Less {
                *current = minimum.to_string();
                report.bumped.push(VersionBump {
                    name: name.clone(),
                    from,
                    to: minimum.clone(),
                });
            }
        }

        Ok(report)
    }
}

/// Outcome of applying merged requirements to a release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub bumped: Vec<VersionBump>,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBump {
    pub name: String,
    pub from: Version,
    pub to: Version,
}
