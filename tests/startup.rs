use std::process::{Command, Output};

/// Runs the server binary from an empty directory with only `vars` set.
fn run_server(vars: &[(&str, &str)]) -> Output {
    // No .env file in here, so only `vars` reach the process.
    let dir = tempfile::tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_crop-grader"))
        .env_clear()
        .envs(vars.iter().copied())
        .current_dir(dir.path())
        .output()
        .unwrap()
}

#[test]
fn exits_when_required_variables_are_missing() {
    let output = run_server(&[("MONGO_URI", "mongodb://localhost/farm")]);

    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GEMINI_API_KEY"));
    assert!(stderr.contains("JWT_SECRET"));
    assert!(!stderr.contains("MONGO_URI"));
}

#[test]
fn empty_values_count_as_missing() {
    let output = run_server(&[
        ("GEMINI_API_KEY", ""),
        ("MONGO_URI", "mongodb://localhost/farm"),
        ("JWT_SECRET", "secret"),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("GEMINI_API_KEY"));
}
