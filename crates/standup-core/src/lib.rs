//! Standup Core - Core types and release resolution logic
//!
//! This crate provides the pure building blocks used by the `standup` CLI:
//! - `Release`: The release manifest (components, apps, labels, status)
//! - `constraint`: Version-range matching for requirement rules
//! - `requirements`: Merging `requests.yaml` rules into a release
//! - `naming`: Collision-free test release names
//! - `diff`: Discovering a newly added release from `git diff` output
//! - `provider`: Provider feature and pipeline lookup table
//! - `config`: Provider endpoint and credential configuration
//! - `component`: Resolving a component's version from its checkout

pub mod component;
pub mod config;
pub mod constraint;
pub mod diff;
pub mod error;
pub mod naming;
pub mod provider;
pub mod release;
pub mod requirements;

pub use component::{ComponentVersionResolver, PROJECT_FILE, ProjectFileResolver};
pub use config::ProviderConfig;
pub use constraint::{Constraint, matches};
pub use diff::{DiffRelease, locate_release_in_diff};
pub use error::{CoreError, Result};
pub use naming::{generate_release_name, generate_release_name_at};
pub use provider::{Feature, ProviderTable};
pub use release::{
    App, Component, RELEASE_API_VERSION, RELEASE_KIND, Release, ReleaseMetadata, ReleaseSpec,
    ReleaseState, ReleaseStatus, TESTING_LABEL, find_latest_release,
};
pub use requirements::{
    AppRequirement, ApplyReport, MergedRequirements, REQUIREMENTS_FILE, RequirementRule,
    Requirements, VersionBump,
};
