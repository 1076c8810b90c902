//! Ground-truth log and run summary export.
//!
//! The ground-truth log is a header-less CSV with one line per rendered frame:
//!
//! ```text
//! timestamp_ns,x,y,z,roll,pitch,yaw
//! ```
//!
//! Floats are written with Rust's shortest round-trip formatting, so parsing a
//! log back yields bit-identical poses.

use crate::runner::ScenarioResult;
use fixturegen_core::{FixtureError, Pose};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One ground-truth line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthRecord {
    pub timestamp_ns: u64,
    pub pose: Pose,
}

impl GroundTruthRecord {
    pub fn new(timestamp_ns: u64, pose: Pose) -> Self {
        Self { timestamp_ns, pose }
    }

    /// Formats the record as a CSV line (without the trailing newline).
    pub fn to_csv_line(&self) -> String {
        let p = &self.pose;
        format!(
            "{},{},{},{},{},{},{}",
            self.timestamp_ns, p.x, p.y, p.z, p.roll, p.pitch, p.yaw
        )
    }

    /// Parses one CSV line.
    pub fn parse_csv_line(line: &str) -> Result<Self, FixtureError> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != 7 {
            return Err(FixtureError::invalid_input(format!(
                "expected 7 ground-truth columns, got {}",
                fields.len()
            )));
        }

        let timestamp_ns = fields[0]
            .trim()
            .parse::<u64>()
            .map_err(|e| FixtureError::invalid_input(format!("timestamp '{}': {}", fields[0], e)))?;

        let mut channels = [0.0; 6];
        for (value, field) in channels.iter_mut().zip(&fields[1..]) {
            *value = field
                .trim()
                .parse::<f64>()
                .map_err(|e| FixtureError::invalid_input(format!("value '{}': {}", field, e)))?;
        }

        Ok(Self::new(timestamp_ns, Pose::from_channels(channels)))
    }
}

/// Append-only writer for a test's ground-truth log.
pub struct GroundTruthLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    records: u64,
}

impl GroundTruthLog {
    /// Creates (or truncates) the log file.
    pub fn create(path: &Path) -> Result<Self, FixtureError> {
        let file = File::create(path).map_err(|e| FixtureError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
            records: 0,
        })
    }

    /// Appends one record.
    pub fn append(&mut self, record: &GroundTruthRecord) -> Result<(), FixtureError> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            FixtureError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::Other, "ground-truth log already closed"),
            )
        })?;

        writeln!(writer, "{}", record.to_csv_line()).map_err(|e| FixtureError::io(&self.path, e))?;
        self.records += 1;
        Ok(())
    }

    /// Number of records appended.
    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and closes the file. Subsequent calls are no-ops.
    pub fn finish(&mut self) -> Result<(), FixtureError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| FixtureError::io(&self.path, e))?;
        }
        Ok(())
    }
}

/// Parses a whole ground-truth log.
pub fn parse_ground_truth(text: &str) -> Result<Vec<GroundTruthRecord>, FixtureError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            GroundTruthRecord::parse_csv_line(line).map_err(|e| match e {
                FixtureError::InvalidInput(msg) => FixtureError::invalid_input(format!("line {}: {}", i + 1, msg)),
                other => other,
            })
        })
        .collect()
}

/// Reads a ground-truth log from disk.
pub fn read_ground_truth(path: &Path) -> Result<Vec<GroundTruthRecord>, FixtureError> {
    let text = std::fs::read_to_string(path).map_err(|e| FixtureError::io(path, e))?;
    parse_ground_truth(&text)
}

/// Summary of a complete run, one entry per test case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Frames per second used for every test
    pub framerate: f64,

    /// Per-test results in execution order
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    pub fn new(framerate: f64) -> Self {
        Self {
            framerate,
            results: Vec::new(),
        }
    }

    /// Adds a finished test.
    pub fn add_result(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    /// Total frames rendered per camera, summed over tests.
    pub fn total_frames(&self) -> usize {
        self.results.iter().map(|r| r.frames).sum()
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &Path) -> Result<(), FixtureError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FixtureError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        let mut file = File::create(path).map_err(|e| FixtureError::io(path, e))?;
        file.write_all(json.as_bytes()).map_err(|e| FixtureError::io(path, e))?;
        Ok(())
    }
}
