// Smoke tests for the albumsift binary

use std::process::Command;

fn albumsift() -> Command {
	Command::new(env!("CARGO_BIN_EXE_albumsift"))
}

#[test]
fn test_version_display() {
	let output = albumsift().arg("--version").output().expect("Failed to run albumsift --version");

	assert!(output.status.success(), "Version command failed");
	let stdout = String::from_utf8_lossy(&output.stdout);
	assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands() {
	let output = albumsift().arg("--help").output().expect("Failed to run albumsift --help");

	assert!(output.status.success(), "Help command failed");
	let stdout = String::from_utf8_lossy(&output.stdout);
	for command in ["group", "train", "find", "reindex"] {
		assert!(stdout.contains(command), "help is missing '{}'", command);
	}
}

#[test]
fn test_threshold_out_of_range_is_rejected() {
	let output = albumsift()
		.args(["group", "-d", ".", "-t", "1.5"])
		.output()
		.expect("Failed to run albumsift group");

	assert!(!output.status.success());
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("threshold"));
}

#[test]
fn test_missing_model_fails_cleanly() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("a.png"), b"not really").unwrap();

	let output = albumsift()
		.args(["group", "-d"])
		.arg(dir.path())
		.args(["--model"])
		.arg(dir.path().join("missing.onnx"))
		.output()
		.expect("Failed to run albumsift group");

	assert!(!output.status.success());
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("does not exist"));
}
