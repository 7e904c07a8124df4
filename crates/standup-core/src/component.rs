//! Resolving the version of a component from its source checkout

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Default location of the version declaration in an operator checkout
pub const PROJECT_FILE: &str = "pkg/project/project.go";

/// Matches e.g. `\tversion            = "5.2.1-dev"`
static VERSION_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\t*\s*\t*version\s*=\s*"([^"]*)".*$"#).expect("valid regex")
});

/// Finds the version a component checkout would be released as
pub trait ComponentVersionResolver {
    fn resolve(&self, checkout: &Path) -> Result<String>;
}

/// Reads the version from a source file declaring `version = "..."`
#[derive(Debug, Clone)]
pub struct ProjectFileResolver {
    relative_path: PathBuf,
}

impl ProjectFileResolver {
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }
}

impl Default for ProjectFileResolver {
    fn default() -> Self {
        Self::new(PROJECT_FILE)
    }
}

impl ComponentVersionResolver for ProjectFileResolver {
    fn resolve(&self, checkout: &Path) -> Result<String> {
        let path = checkout.join(&self.relative_path);
        let content = std::fs::read_to_string(&path)?;

        content
            .lines()
            .find_map(|line| VERSION_DECLARATION.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| CoreError::VersionNotDeclared {
                path: path.display().to_string(),
            })
    }
}
