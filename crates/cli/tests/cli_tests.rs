//! CLI integration tests

use std::process::Command;

fn usctl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_usctl"))
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = usctl()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Utilization Sampler"),
        "Should show app name"
    );
    assert!(stdout.contains("keys"), "Should show keys command");
    assert!(stdout.contains("show"), "Should show show command");
    assert!(stdout.contains("export"), "Should show export command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = usctl()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("usctl"), "Should show binary name");
}

/// Show needs both pod and container
#[test]
fn test_cli_show_requires_container() {
    let output = usctl()
        .args(["show", "p1"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("<CONTAINER>"), "{}", stderr);
}

/// An unreachable store is reported, not panicked on
#[test]
fn test_cli_unreachable_redis_fails() {
    let output = usctl()
        .args(["--redis-host", "127.0.0.1", "--redis-port", "1", "keys"])
        .env_remove("REDIS_PASSWORD")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Redis"), "{}", stderr);
}
