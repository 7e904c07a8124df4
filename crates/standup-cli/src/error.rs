//! CLI error types with exit code handling
//!
//! Library errors are folded into a handful of categories, each with its own
//! exit code.

use miette::Diagnostic;
use standup_core::CoreError;
use standup_kube::KubeError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid flags or missing inputs
    #[error("Invalid input: {message}")]
    #[diagnostic(code(standup::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Provider config or kubeconfig unusable
    #[error("Configuration error: {message}")]
    #[diagnostic(code(standup::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Release manifest or requirements problem
    #[error("Release error: {message}")]
    #[diagnostic(code(standup::cli::release))]
    Release {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Cluster-management or Kubernetes API failure
    #[error("Cluster error: {message}")]
    #[diagnostic(code(standup::cli::cluster))]
    Cluster { message: String },

    /// A bounded wait ran out of attempts
    #[error("Timed out waiting for {what}: {message}")]
    #[diagnostic(code(standup::cli::wait))]
    Wait { what: String, message: String },

    /// A git command failed
    #[error("git {command} failed: {message}")]
    #[diagnostic(code(standup::cli::git))]
    Git { command: String, message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(standup::cli::io))]
    Io { message: String },

    /// Failure outside any command, e.g. starting the async runtime
    #[error("{message}")]
    #[diagnostic(code(standup::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Release { .. } => exit_codes::RELEASE_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Wait { .. } => exit_codes::WAIT_ERROR,
            CliError::Git { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Wrap the error a bounded wait gave up with
    pub fn wait(what: impl Into<String>, err: KubeError) -> Self {
        if err.is_not_ready() {
            Self::Wait {
                what: what.into(),
                message: err.to_string(),
            }
        } else {
            err.into()
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::InvalidConfig { .. } => CliError::Config {
                message,
                help: Some("Each provider needs context, endpoint and a token or username/password".to_string()),
            },
            CoreError::MalformedDiff { .. } => CliError::input(message),
            CoreError::ReleaseNotFound => CliError::Release {
                message,
                help: Some("Add a release.yaml under <provider>/<version>/ on this branch".to_string()),
            },
            CoreError::Io(_) => CliError::Io { message },
            _ => CliError::Release {
                message,
                help: None,
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::Kubeconfig(_) | KubeError::InvalidConfig(_) => CliError::Config {
                message,
                help: None,
            },
            KubeError::NotReady { resource, message } => CliError::Wait {
                what: resource,
                message,
            },
            KubeError::Io(_) => CliError::Io { message },
            _ => CliError::Cluster { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
