//! 6-DoF pose types: waypoints, per-frame poses and camera mounts.
//!
//! Angles are stored in degrees everywhere, exactly as they appear in the
//! input files and in the ground-truth log.

use crate::error::FixtureError;
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Rotation for a `(roll, pitch, yaw)` triple in degrees.
///
/// Axes are applied in a fixed order about the fixed world axes: roll about
/// Y (the body's forward axis), then pitch about X, then yaw about Z:
///
/// `R = Rz(yaw) · Rx(pitch) · Ry(roll)`
///
/// Pitching or yawing a rolled body therefore couples into the other axes;
/// downstream ground-truth comparisons depend on exactly this convention.
pub fn euler_rotation(roll_deg: f64, pitch_deg: f64, yaw_deg: f64) -> Rotation3<f64> {
    let roll = Rotation3::from_axis_angle(&Vector3::y_axis(), roll_deg.to_radians());
    let pitch = Rotation3::from_axis_angle(&Vector3::x_axis(), pitch_deg.to_radians());
    let yaw = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw_deg.to_radians());
    yaw * pitch * roll
}

/// A sparse, timestamped control point of the body trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Time since trajectory start in seconds
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Degrees
    pub roll: f64,
    /// Degrees
    pub pitch: f64,
    /// Degrees
    pub yaw: f64,
}

impl Waypoint {
    /// Creates a waypoint from time and the six pose channels.
    pub fn new(t: f64, x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { t, x, y, z, roll, pitch, yaw }
    }

    /// The pose part of this waypoint.
    pub fn pose(&self) -> Pose {
        Pose::new(self.x, self.y, self.z, self.roll, self.pitch, self.yaw)
    }
}

/// Body state at one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Degrees
    pub roll: f64,
    /// Degrees
    pub pitch: f64,
    /// Degrees
    pub yaw: f64,
}

impl Pose {
    /// Creates a pose from position and Euler angles in degrees.
    pub fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { x, y, z, roll, pitch, yaw }
    }

    /// Creates a pose from `[x, y, z, roll, pitch, yaw]`.
    pub fn from_channels(c: [f64; 6]) -> Self {
        Self::new(c[0], c[1], c[2], c[3], c[4], c[5])
    }

    /// Returns `[x, y, z, roll, pitch, yaw]`.
    pub fn channels(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
    }

    /// Position in world coordinates.
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Body-to-world rotation (see [`euler_rotation`]).
    pub fn rotation(&self) -> Rotation3<f64> {
        euler_rotation(self.roll, self.pitch, self.yaw)
    }
}

/// Rigid offset of a camera relative to the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraMount {
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    /// Degrees, same axis convention as [`Pose::roll`]
    pub rx: f64,
    /// Degrees, same axis convention as [`Pose::pitch`]
    pub ry: f64,
    /// Degrees, same axis convention as [`Pose::yaw`]
    pub rz: f64,
}

impl CameraMount {
    /// Creates a mount from translation and rotation offsets.
    pub fn new(tx: f64, ty: f64, tz: f64, rx: f64, ry: f64, rz: f64) -> Self {
        Self { tx, ty, tz, rx, ry, rz }
    }

    /// Parses a `[tx, ty, tz, rx, ry, rz]` extrinsic list.
    pub fn from_extrinsic(values: &[f64]) -> Result<Self, FixtureError> {
        match values {
            [tx, ty, tz, rx, ry, rz] => {
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(FixtureError::config(format!(
                        "camera extrinsic {:?} contains non-finite values",
                        values
                    )));
                }
                Ok(Self::new(*tx, *ty, *tz, *rx, *ry, *rz))
            }
            _ => Err(FixtureError::config(format!(
                "camera extrinsic must have 6 values [tx, ty, tz, rx, ry, rz], got {}",
                values.len()
            ))),
        }
    }

    /// Translation offset.
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.tx, self.ty, self.tz)
    }

    /// Mount rotation (see [`euler_rotation`]).
    pub fn rotation(&self) -> Rotation3<f64> {
        euler_rotation(self.rx, self.ry, self.rz)
    }
}

/// One physical camera of a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSpec {
    pub name: String,
    pub mount: CameraMount,
}

impl CameraSpec {
    pub fn new(name: impl Into<String>, mount: CameraMount) -> Self {
        Self {
            name: name.into(),
            mount,
        }
    }
}
