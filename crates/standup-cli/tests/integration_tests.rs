//! Integration tests for CLI commands

use std::io::Write;
use std::process::{Command, Stdio};

/// Helper to run standup command
fn standup(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_standup"))
        .args(args)
        .output()
        .expect("Failed to execute standup")
}

fn diff_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

mod general {
    use super::*;

    #[test]
    fn test_help() {
        let output = standup(&["--help"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        for command in ["create", "wait", "cleanup", "locate-release"] {
            assert!(stdout.contains(command), "missing {} in help", command);
        }
    }

    #[test]
    fn test_create_help_lists_targets() {
        let output = standup(&["create", "--help"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("release"));
        assert!(stdout.contains("test-operator-release"));
        assert!(stdout.contains("cluster"));
    }

    #[test]
    fn test_version() {
        let output = standup(&["--version"]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_missing_required_flag() {
        let output = standup(&["wait", "--provider", "aws"]);
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("--kubeconfig"));
    }
}

mod locate_release_command {
    use super::*;

    #[test]
    fn test_locates_added_release() {
        let diff = diff_file("A\taws/v13.0.0/README.md\nA\taws/v13.0.0/release.yaml\n");
        let output = standup(&["locate-release", diff.path().to_str().unwrap()]);

        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("aws/v13.0.0/release.yaml"));
        assert!(stdout.contains("Provider:"));
        assert!(stdout.contains("v13.0.0"));
    }

    #[test]
    fn test_reads_stdin() {
        let mut child = Command::new(env!("CARGO_BIN_EXE_standup"))
            .args(["locate-release", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(b"A  azure/v14.1.0/release.yaml\n")
            .unwrap();

        let output = child.wait_with_output().unwrap();
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("azure"));
    }

    #[test]
    fn test_no_release_in_diff() {
        let diff = diff_file("A\taws/v13.0.0/README.md\n");
        let output = standup(&["locate-release", diff.path().to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(4));
        assert!(String::from_utf8_lossy(&output.stderr).contains("No new release found"));
    }

    #[test]
    fn test_empty_diff() {
        let diff = diff_file("");
        let output = standup(&["locate-release", diff.path().to_str().unwrap()]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_missing_diff_file() {
        let output = standup(&["locate-release", "/nonexistent/diff.txt"]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod validation {
    use super::*;

    #[test]
    fn test_wait_rejects_single_node() {
        let output = standup(&[
            "wait",
            "--kubeconfig",
            "/nonexistent",
            "--provider",
            "aws",
            "--nodes",
            "1",
        ]);
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("--nodes"));
    }

    #[test]
    fn test_unsupported_test_operator_provider() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap();
        let output = standup(&[
            "create",
            "test-operator-release",
            "--config",
            path,
            "--kubeconfig",
            path,
            "--operator-path",
            path,
            "--output",
            path,
            "--provider",
            "kvm",
            "--releases-path",
            path,
        ]);

        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported provider"));
    }

    #[test]
    fn test_cluster_needs_release_outputs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap();
        let output = standup(&[
            "create", "cluster", "--config", path, "--kubeconfig", path, "--output", path,
        ]);

        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stderr).contains("provider"));
    }
}
