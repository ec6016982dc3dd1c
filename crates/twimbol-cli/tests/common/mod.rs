use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;

/// Path of the session file inside an isolated test directory.
pub fn session_file(dir: &Path) -> PathBuf {
    dir.join("session.json")
}

/// Run the CLI binary against an isolated session file.
pub async fn run_cli(args: &[&str], session: &Path, api_url: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_twimbol"));
    cmd.args(args);
    cmd.env("TWIMBOL_SESSION_FILE", session);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("TWIMBOL_API_URL");
    cmd.env_remove("RUST_LOG");
    if let Some(api_url) = api_url {
        cmd.env("TWIMBOL_API_URL", api_url);
    }
    cmd.output().await.expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub async fn run_cli_success(args: &[&str], session: &Path, api_url: Option<&str>) -> String {
    let output = run_cli(args, session, api_url).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Write a session file holding the given tokens.
pub fn write_session(session: &Path, access: &str, refresh: &str) {
    let json = serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "updated_at": "2026-01-01T00:00:00Z",
    });
    std::fs::write(session, serde_json::to_string_pretty(&json).unwrap()).unwrap();
}

/// Read the stored session as JSON.
pub fn read_session(session: &Path) -> serde_json::Value {
    let json = std::fs::read_to_string(session).unwrap();
    serde_json::from_str(&json).unwrap()
}
