//! Rerun preview of a running fixture generation.
//!
//! This is the "GUI mode" of the generator: instead of rendering blind, the
//! body trajectory, every camera's pose and the rendered frames are streamed
//! to a Rerun viewer. Preview is optional and only available with the
//! `visualization` feature.
//!
//! # What Gets Logged
//!
//! - Fiducial markers as static points
//! - Body position as a point per frame
//! - Each camera's forward/up directions as arrows
//! - Each camera's rendered image
//! - Frame index and trajectory time as timelines

use fixturegen_core::{FiducialMap, Pose};
use fixturegen_env::{RgbImage, ViewParams};
#[cfg(feature = "visualization")]
use rerun::{Arrows3D, Color, Points3D, RecordingStream, Radius};

/// Rerun logger for previewing fixture generation.
pub struct PreviewLogger {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether preview is enabled
    enabled: bool,
}

impl PreviewLogger {
    /// Creates a logger with preview disabled (headless mode).
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
        }
    }

    /// Creates a logger that spawns a Rerun viewer.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun preview enabled - frames are streamed to the viewer");
                Self {
                    rec: Some(rec),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Preview not available (compile with --features visualization), running headless");
        Self::disabled()
    }

    /// Returns whether preview is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the frame for subsequent logs.
    #[cfg(feature = "visualization")]
    pub fn set_frame(&self, index: usize, timestamp_ns: u64) {
        if let Some(ref rec) = self.rec {
            rec.set_time_sequence("frame", index as i64);
            rec.set_time_nanos("trajectory_time", timestamp_ns as i64);
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn set_frame(&self, _index: usize, _timestamp_ns: u64) {}

    /// Logs the fiducial markers of a test case.
    #[cfg(feature = "visualization")]
    pub fn log_markers(&self, test: &str, map: &FiducialMap) {
        if let Some(ref rec) = self.rec {
            let points: Vec<[f32; 3]> = map
                .fiducials
                .iter()
                .map(|f| {
                    let t = f.translation();
                    [t.x as f32, t.y as f32, t.z as f32]
                })
                .collect();
            let labels: Vec<String> = map.fiducials.iter().map(|f| f.id.to_string()).collect();

            let _ = rec.log_static(
                format!("{}/fiducials", test),
                &Points3D::new(points)
                    .with_labels(labels)
                    .with_colors([Color::from_rgb(255, 255, 255)])
                    .with_radii([Radius::new_scene_units(0.05)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_markers(&self, _test: &str, _map: &FiducialMap) {}

    /// Logs the body position for the current frame.
    #[cfg(feature = "visualization")]
    pub fn log_body(&self, test: &str, pose: &Pose) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(
                format!("{}/body", test),
                &Points3D::new([[pose.x as f32, pose.y as f32, pose.z as f32]])
                    .with_colors([Color::from_rgb(0, 255, 0)]) // Green
                    .with_radii([Radius::new_scene_units(0.03)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_body(&self, _test: &str, _pose: &Pose) {}

    /// Logs one camera's view and rendered image for the current frame.
    #[cfg(feature = "visualization")]
    pub fn log_camera(&self, test: &str, camera: &str, view: &ViewParams, frame: &RgbImage) {
        if let Some(ref rec) = self.rec {
            let p = view.position;
            let f = view.target - view.position;
            let u = view.up * 0.5;

            let _ = rec.log(
                format!("{}/cameras/{}/axes", test, camera),
                &Arrows3D::from_vectors([
                    [f.x as f32, f.y as f32, f.z as f32],
                    [u.x as f32, u.y as f32, u.z as f32],
                ])
                .with_origins([[p.x as f32, p.y as f32, p.z as f32]; 2])
                .with_colors([Color::from_rgb(255, 100, 100), Color::from_rgb(100, 100, 255)]),
            );

            let _ = rec.log(
                format!("{}/cameras/{}/image", test, camera),
                &rerun::Image::from_rgb24(frame.as_raw().clone(), [frame.width(), frame.height()]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_camera(&self, _test: &str, _camera: &str, _view: &ViewParams, _frame: &RgbImage) {}

    /// Logs a text annotation (e.g. phase transitions).
    #[cfg(feature = "visualization")]
    pub fn log_event(&self, path: &str, message: &str) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(path, &rerun::TextLog::new(message));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_event(&self, _path: &str, _message: &str) {}
}
