//! Camera pose composition.
//!
//! Turns a body pose and a camera mount into the world-frame look-at triple
//! consumed by the renderer. The camera looks along its local +Y axis with
//! local +Z up.

use crate::pose::{CameraMount, Pose};
use fixturegen_env::ViewParams;
use nalgebra::{Rotation3, Vector3};

/// Camera optical axis in the camera's local frame.
pub fn forward_local() -> Vector3<f64> {
    Vector3::y()
}

/// Camera up direction in the camera's local frame.
pub fn up_local() -> Vector3<f64> {
    Vector3::z()
}

/// Camera-to-world rotation: `R_body · R_mount`.
pub fn camera_rotation(pose: &Pose, mount: &CameraMount) -> Rotation3<f64> {
    pose.rotation() * mount.rotation()
}

/// Computes world-frame view parameters for one camera at one frame.
///
/// The mount translation is added to the body position as-is; it is not
/// rotated into the body frame. Identical inputs always give bit-identical
/// output.
pub fn compose_camera_view(pose: &Pose, mount: &CameraMount) -> ViewParams {
    let rotation = camera_rotation(pose, mount);
    let forward = rotation * forward_local();
    let up = rotation * up_local();

    let position = pose.position() + mount.translation();

    ViewParams {
        position,
        target: position + forward,
        up,
    }
}
