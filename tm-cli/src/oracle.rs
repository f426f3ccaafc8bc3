//! External-process timing oracle.

use std::path::Path;
use std::process::Command;

use tm_map::{OracleError, TimingOracle};

/// Runs a configured command as `<cmd...> <library> <netlist>` and parses
/// `(delay, area)` from the first two floats on stdout.
#[derive(Debug, Clone)]
pub struct ExternalOracle {
    cmd: String,
}

impl ExternalOracle {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }
}

/// First two whitespace-separated floats in `text`.
fn parse_two_floats(text: &str) -> Option<(f64, f64)> {
    let mut it = text.split_whitespace();
    let a: f64 = it.next()?.parse().ok()?;
    let b: f64 = it.next()?.parse().ok()?;
    Some((a, b))
}

impl TimingOracle for ExternalOracle {
    fn evaluate(&mut self, library: &Path, netlist: &Path) -> Result<(f64, f64), OracleError> {
        let mut parts = self.cmd.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| OracleError::Malformed("empty oracle command".to_string()))?;

        let output = Command::new(program)
            .args(parts)
            .arg(library)
            .arg(netlist)
            .output()?;
        if !output.status.success() {
            return Err(OracleError::Failed(output.status.code().unwrap_or(-1)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_two_floats(&stdout).ok_or_else(|| OracleError::Malformed(stdout.into_owned()))
    }
}
