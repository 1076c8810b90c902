//! fixturegen Core - Synthetic Pose-Estimation Fixtures
//!
//! Everything needed to turn a handful of hand-written waypoints into the
//! per-frame inputs of a render loop:
//! 1. **Trajectory**: fixed-rate linear interpolation of 6-DoF waypoints
//! 2. **Camera**: composition of body pose and camera mount into look-at view parameters
//! 3. **Fiducials**: marker maps loaded into a scene backend
//! 4. **Config**: the typed, eagerly validated YAML run configuration

pub mod camera;
pub mod config;
pub mod error;
pub mod fiducial;
pub mod pose;
pub mod trajectory;
pub mod waypoints;

// Re-export key types for convenience
pub use camera::compose_camera_view;
pub use config::{RenderConfig, RunConfig, TestCase};
pub use error::FixtureError;
pub use fiducial::{Fiducial, FiducialMap};
pub use pose::{CameraMount, CameraSpec, Pose, Waypoint};
pub use trajectory::{frame_timestamp_ns, Trajectory, DEFAULT_FRAMERATE};
pub use waypoints::TimeUnit;
