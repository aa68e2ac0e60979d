//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured result of one `vprov` invocation.
#[derive(Debug)]
pub struct VprovOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run the built `vprov` binary with a clean provisioning environment.
pub fn run_vprov(args: &[&str]) -> VprovOutput {
    let output = Command::new(env!("CARGO_BIN_EXE_vprov"))
        .args(args)
        .env_remove("VPROV_ENDPOINT")
        .env_remove("VPROV_LOG")
        .output()
        .expect("run vprov");
    VprovOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Write a record file into `dir` and return its path.
pub fn write_input(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("views.csv");
    std::fs::write(&path, contents).expect("write input");
    path
}
