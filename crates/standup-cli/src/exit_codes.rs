//! Exit codes for standup commands
//!
//! CI tasks branch on these, so they are part of the interface.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - invalid flags, missing output files, bad diff
///
/// Shared with clap's own usage errors.
pub const INPUT_ERROR: i32 = 2;

/// Configuration error - provider config or kubeconfig unusable
pub const CONFIG_ERROR: i32 = 3;

/// Release error - manifest missing, invalid, or rejected
pub const RELEASE_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Cluster error - cluster-management or Kubernetes API failure
pub const CLUSTER_ERROR: i32 = 6;

/// Wait error - a bounded wait ran out of attempts
pub const WAIT_ERROR: i32 = 7;
