//! Waypoint CSV loading.
//!
//! One waypoint per row: `time, x, y, z, roll_deg, pitch_deg, yaw_deg`.
//! Blank lines and lines starting with `#` are skipped.

use crate::error::FixtureError;
use crate::pose::Waypoint;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Unit of the waypoint time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Converts a raw time column value into seconds.
    pub fn to_seconds(&self, value: f64) -> f64 {
        match self {
            TimeUnit::Seconds => value,
            TimeUnit::Nanoseconds => value / 1e9,
        }
    }
}

/// Parses waypoint rows from CSV text.
///
/// Only the row shape is checked here; sequence rules (zero start, increasing
/// times) are enforced by the interpolator.
pub fn parse_waypoints_csv(text: &str, unit: TimeUnit) -> Result<Vec<Waypoint>, FixtureError> {
    let mut waypoints = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let values = line
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| FixtureError::invalid_input(format!("line {}: {}", line_no + 1, e)))?;

        let [t, x, y, z, roll, pitch, yaw] = values[..] else {
            return Err(FixtureError::invalid_input(format!(
                "line {}: expected 7 columns (time, x, y, z, roll, pitch, yaw), got {}",
                line_no + 1,
                values.len()
            )));
        };

        waypoints.push(Waypoint::new(unit.to_seconds(t), x, y, z, roll, pitch, yaw));
    }

    Ok(waypoints)
}

/// Reads and parses a waypoint CSV file.
pub fn load_waypoints(path: &Path, unit: TimeUnit) -> Result<Vec<Waypoint>, FixtureError> {
    let text = std::fs::read_to_string(path).map_err(|e| FixtureError::io(path, e))?;
    let waypoints = parse_waypoints_csv(&text, unit).map_err(|e| match e {
        FixtureError::InvalidInput(msg) => FixtureError::invalid_input(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;

    debug!("Loaded {} waypoints from {}", waypoints.len(), path.display());
    Ok(waypoints)
}
