//! Argument handling of the binary. None of these reach the network.

use std::process::{Command, Output};

use tempfile::TempDir;

fn run(args: &[&str]) -> (TempDir, Output) {
	let cwd = tempfile::tempdir().unwrap();
	let output = Command::new(env!("CARGO_BIN_EXE_gh-issue-export"))
		.args(args)
		.current_dir(cwd.path())
		.env_remove("GH_ISSUE_EXPORT_TRACE_FILE")
		.env_remove("GH_ISSUE_EXPORT__REPO_LIST")
		.env_remove("GH_ISSUE_EXPORT__OUTPUT_DIR")
		.output()
		.unwrap();
	(cwd, output)
}

#[test]
fn test_missing_arguments_print_usage_and_exit_cleanly() {
	for args in [&[][..], &["ghp_token"][..]] {
		let (_cwd, output) = run(args);
		assert!(output.status.success(), "args {args:?} should exit cleanly");
		assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
	}
}

#[test]
fn test_invalid_mode_exits_cleanly() {
	for args in [&["ghp_token", "--pdf"][..], &["ghp_token", "--html", "--json"][..]] {
		let (cwd, output) = run(args);
		assert!(output.status.success(), "args {args:?} should exit cleanly");
		assert!(!output.stderr.is_empty());
		assert!(!cwd.path().join("github_issues").exists());
	}
}

#[test]
fn test_export_without_repo_list() {
	let (cwd, output) = run(&["ghp_token", "--json"]);

	assert!(output.status.success());
	assert!(String::from_utf8_lossy(&output.stdout).contains("Run with --repo first"));
	assert!(!cwd.path().join("github_issues").exists());
}

#[test]
fn test_help_lists_modes() {
	let (_cwd, output) = run(&["--help"]);

	assert!(output.status.success());
	let stdout = String::from_utf8_lossy(&output.stdout);
	for mode in ["--html", "--json", "--repo"] {
		assert!(stdout.contains(mode), "help should mention {mode}");
	}
}
