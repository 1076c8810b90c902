//! Scene and video sink abstractions.

use crate::error::BackendError;
use crate::types::{MarkerSpec, RenderSettings, ViewParams};
use image::RgbImage;
use std::path::Path;

/// A static scene that can be rendered from arbitrary viewpoints.
///
/// A scene is created fresh for every test case and owned by exactly one
/// orchestrator; render calls are synchronous and never overlap.
///
/// # Implementations
///
/// - **Production**: [`RaycastScene`](crate::RaycastScene) - CPU ray caster
/// - **Tests**: recording mocks that count calls
pub trait SceneBackend {
    /// Adds the static ground plane (z = 0).
    fn add_ground_plane(&mut self) -> Result<(), BackendError>;

    /// Instantiates a textured marker at the requested pose.
    ///
    /// # Returns
    /// * `Ok(())` - Marker is part of the scene
    /// * `Err(BackendError::Asset)` - Texture for `marker.texture_key` unavailable
    fn spawn_marker(&mut self, marker: MarkerSpec) -> Result<(), BackendError>;

    /// Renders one RGB image for the given view.
    fn render(&mut self, view: &ViewParams, settings: &RenderSettings) -> Result<RgbImage, BackendError>;

    /// Number of markers currently in the scene.
    fn marker_count(&self) -> usize;
}

/// Append-only frame stream for a single camera.
pub trait VideoSink {
    /// Appends one frame to the end of the stream.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), BackendError>;

    /// Number of frames appended so far.
    fn frames_written(&self) -> u64;

    /// Flushes and closes the stream, moving it to its final location.
    ///
    /// Calling `finish` more than once is a no-op.
    fn finish(&mut self) -> Result<(), BackendError>;
}

/// Factory for per-test scenes and video sinks.
pub trait Backend {
    type Scene: SceneBackend;
    type Sink: VideoSink;

    /// Creates a new, empty scene.
    fn create_scene(&mut self) -> Result<Self::Scene, BackendError>;

    /// Opens a video stream that will be finalized at `path`.
    fn open_video(
        &mut self,
        path: &Path,
        framerate: f64,
        settings: &RenderSettings,
    ) -> Result<Self::Sink, BackendError>;

    /// Extension appended to per-camera output names.
    fn video_extension(&self) -> &'static str;
}
