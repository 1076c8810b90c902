//! Waypoint trajectory interpolation.
//!
//! Converts sparse waypoints into a dense, fixed-rate pose sequence. Each
//! segment `(w[i-1], w[i])` yields `floor((w[i].t - w[i-1].t) * framerate)`
//! samples spread uniformly over the closed interval between the two
//! waypoints, so the first sample of every segment is exactly its left
//! waypoint and the last sample is exactly its right waypoint.
//!
//! Every channel is interpolated on its own, angles included: a yaw going
//! from 170° to -170° sweeps through 0°, not across the ±180° seam.

use crate::error::FixtureError;
use crate::pose::{Pose, Waypoint};
use serde::{Deserialize, Serialize};

/// Default frames per second.
pub const DEFAULT_FRAMERATE: f64 = 60.0;

/// Number of frames generated for a segment of `dt` seconds.
pub fn segment_frame_count(dt: f64, framerate: f64) -> usize {
    (dt * framerate).floor().max(0.0) as usize
}

/// Timestamp of frame `index` in nanoseconds: `round(index / framerate * 1e9)`.
pub fn frame_timestamp_ns(index: usize, framerate: f64) -> u64 {
    (index as f64 / framerate * 1e9).round() as u64
}

/// `n` evenly spaced samples over `[start, end]`, both ends included.
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (end - start) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |k| {
        if n > 1 && k == n - 1 {
            end
        } else {
            start + step * k as f64
        }
    })
}

/// Checks the waypoint sequence contract.
///
/// Requires at least two waypoints, `t[0] == 0`, strictly increasing times
/// and finite values everywhere.
pub fn validate_waypoints(waypoints: &[Waypoint]) -> Result<(), FixtureError> {
    if waypoints.len() < 2 {
        return Err(FixtureError::invalid_input(format!(
            "need at least 2 waypoints, got {}",
            waypoints.len()
        )));
    }

    if waypoints[0].t != 0.0 {
        return Err(FixtureError::invalid_input(format!(
            "first waypoint must start at 0 seconds, got {}",
            waypoints[0].t
        )));
    }

    for (i, w) in waypoints.iter().enumerate() {
        let values = [w.t, w.x, w.y, w.z, w.roll, w.pitch, w.yaw];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FixtureError::invalid_input(format!(
                "waypoint {} contains non-finite values",
                i
            )));
        }
    }

    for (i, pair) in waypoints.windows(2).enumerate() {
        if pair[1].t <= pair[0].t {
            return Err(FixtureError::invalid_input(format!(
                "waypoint times must be strictly increasing: waypoint {} at {}s follows {}s",
                i + 1,
                pair[1].t,
                pair[0].t
            )));
        }
    }

    Ok(())
}

/// A dense pose sequence sampled at a fixed framerate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    framerate: f64,
    poses: Vec<Pose>,
}

impl Trajectory {
    /// Interpolates waypoints into a fixed-rate trajectory.
    ///
    /// # Errors
    /// `FixtureError::InvalidInput` if the waypoints violate
    /// [`validate_waypoints`] or the framerate is not positive.
    pub fn from_waypoints(waypoints: &[Waypoint], framerate: f64) -> Result<Self, FixtureError> {
        if !(framerate.is_finite() && framerate > 0.0) {
            return Err(FixtureError::invalid_input(format!(
                "framerate must be positive, got {}",
                framerate
            )));
        }
        validate_waypoints(waypoints)?;

        let mut poses = Vec::new();
        for pair in waypoints.windows(2) {
            let (from, to) = (pair[0].pose().channels(), pair[1].pose().channels());
            let n = segment_frame_count(pair[1].t - pair[0].t, framerate);

            let mut columns = from
                .iter()
                .zip(to.iter())
                .map(|(&a, &b)| linspace(a, b, n))
                .collect::<Vec<_>>();

            for _ in 0..n {
                let mut channels = [0.0; 6];
                for (value, column) in channels.iter_mut().zip(columns.iter_mut()) {
                    *value = column.next().unwrap_or_default();
                }
                poses.push(Pose::from_channels(channels));
            }
        }

        Ok(Self { framerate, poses })
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// All poses in frame order.
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    /// Iterates `(frame_index, timestamp_ns, pose)` in frame order.
    pub fn frames(&self) -> impl Iterator<Item = (usize, u64, &Pose)> + '_ {
        self.poses
            .iter()
            .enumerate()
            .map(move |(i, pose)| (i, frame_timestamp_ns(i, self.framerate), pose))
    }

    /// Duration covered by the frames, in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.poses.len() as f64 / self.framerate
    }
}
