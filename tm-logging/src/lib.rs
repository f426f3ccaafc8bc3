//! tm-logging: append-only NDJSON search telemetry.
//!
//! One JSON object per line; readers are lenient about a trailing partial
//! line left by a crash. Events cover the run header, every adapter step,
//! and every rollout.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn now_ms() -> u64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as u64
}

/// Stable hash of the run configuration, for reproducibility checks.
pub fn hash_config_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Written once at the start of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunHeaderV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub config_hash: String,
    pub seed: u64,
    pub nodes: usize,
    pub iterations: u32,
}

impl RunHeaderV1 {
    pub fn new(config_hash: String, seed: u64, nodes: usize, iterations: u32) -> Self {
        Self {
            event: "run_header",
            ts_ms: now_ms(),
            config_hash,
            seed,
            nodes,
            iterations,
        }
    }
}

/// Written once per adapter `take_action`.
#[derive(Debug, Clone, Serialize)]
pub struct StepEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub action: usize,
    pub depth: u32,
    pub extracted: usize,
    pub committed: usize,
    pub committed_nodes: usize,
    pub delay: f64,
    pub area: f64,
    pub reward: f64,
}

/// Written once per rollout.
#[derive(Debug, Clone, Serialize)]
pub struct RolloutEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub rollout: u32,
    pub depth: u32,
    pub terminal: bool,
    pub best_reward: f64,
    pub best_mul_reward: f64,
}

#[derive(Debug)]
pub enum NdjsonError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for NdjsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NdjsonError::Io(e) => write!(f, "ndjson io error: {e}"),
            NdjsonError::Json(e) => write!(f, "ndjson encode error: {e}"),
        }
    }
}

impl std::error::Error for NdjsonError {}

impl From<io::Error> for NdjsonError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for NdjsonError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Append-only NDJSON writer.
///
/// Contract: each call writes exactly one JSON object followed by a
/// newline.
pub struct NdjsonWriter {
    w: BufWriter<File>,
    lines_since_flush: u64,
    flush_every_lines: u64,
}

impl NdjsonWriter {
    /// Open a file for append. Creates it if it doesn't exist.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, NdjsonError> {
        Self::open_append_with_flush(path, 0)
    }

    /// `flush_every_lines=0` disables periodic flushing.
    pub fn open_append_with_flush(
        path: impl AsRef<Path>,
        flush_every_lines: u64,
    ) -> Result<Self, NdjsonError> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            w: BufWriter::new(f),
            lines_since_flush: 0,
            flush_every_lines,
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), NdjsonError> {
        let mut buf = serde_json::to_vec(event)?;
        buf.push(b'\n');
        self.w.write_all(&buf)?;
        self.lines_since_flush += 1;
        if self.flush_every_lines > 0 && self.lines_since_flush >= self.flush_every_lines {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), NdjsonError> {
        self.w.flush()?;
        self.lines_since_flush = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;

    fn read_ndjson_lenient(path: &Path) -> Vec<Value> {
        let s = fs::read_to_string(path).expect("read");
        let mut out = Vec::new();
        for line in s.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(v) = serde_json::from_str::<Value>(line) {
                out.push(v);
            }
        }
        out
    }

    #[test]
    fn writes_one_valid_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        let mut w = NdjsonWriter::open_append(&path).unwrap();

        w.write_event(&RunHeaderV1::new("abc".into(), 1, 10, 4))
            .unwrap();
        w.write_event(&StepEventV1 {
            event: "step",
            ts_ms: now_ms(),
            action: 2,
            depth: 0,
            extracted: 5,
            committed: 3,
            committed_nodes: 3,
            delay: 12.5,
            area: 40.0,
            reward: 12.5,
        })
        .unwrap();
        w.flush().unwrap();

        let vals = read_ndjson_lenient(&path);
        assert_eq!(vals.len(), 2);
        assert_eq!(vals[0]["event"], "run_header");
        assert_eq!(vals[1]["action"], 2);
    }

    #[test]
    fn lenient_reader_tolerates_trailing_partial_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");

        {
            let mut w = NdjsonWriter::open_append(&path).unwrap();
            w.write_event(&RunHeaderV1::new("abc".into(), 1, 10, 4))
                .unwrap();
            w.flush().unwrap();
        }

        // Simulate a crash: append a partial JSON line.
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(br#"{"event":"step","action":"#).unwrap();
        f.flush().unwrap();

        let vals = read_ndjson_lenient(&path);
        assert_eq!(vals.len(), 1);
    }

    #[test]
    fn config_hash_is_stable() {
        assert_eq!(hash_config_bytes(b"x"), hash_config_bytes(b"x"));
        assert_ne!(hash_config_bytes(b"x"), hash_config_bytes(b"y"));
    }
}
