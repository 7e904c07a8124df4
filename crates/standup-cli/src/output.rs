//! Files exchanged between pipeline steps
//!
//! Each command leaves small text files in its output directory for the next
//! task to pick up: `create release` writes the provider, installation and
//! release id, `create cluster` reads them back and adds the cluster id and
//! its kubeconfig.

use std::path::PathBuf;

use crate::error::{CliError, Result};

pub const PROVIDER: &str = "provider";
pub const INSTALLATION: &str = "installation";
pub const RELEASE_ID: &str = "release-id";
pub const CLUSTER_ID: &str = "cluster-id";
pub const KUBECONFIG: &str = "kubeconfig";

#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn write(&self, name: &str, value: &str) -> Result<()> {
        let path = self.path(name);
        tracing::info!(path = %path.display(), value, "writing output");
        std::fs::write(&path, value)?;
        Ok(())
    }

    /// Read a value written by an earlier step, trimmed
    pub fn read(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        let value = std::fs::read_to_string(&path).map_err(|e| {
            CliError::input_with_help(
                format!("cannot read {}: {}", path.display(), e),
                format!("pass the value as a flag or run the step that writes '{}' first", name),
            )
        })?;
        Ok(value.trim().to_string())
    }

    /// A flag value if given, otherwise the value from the output directory
    pub fn flag_or_read(&self, flag: Option<&str>, name: &str) -> Result<String> {
        match flag {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => self.read(name),
        }
    }
}
