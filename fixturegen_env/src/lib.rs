//! fixturegen Backend Abstraction Layer
//!
//! This crate separates the fixture pipeline from the machinery that turns a
//! camera pose into pixels and pixels into a video file. The orchestrator only
//! ever talks to the traits defined here:
//!
//! - [`SceneBackend`]: a static scene (ground plane + fiducial markers) that
//!   renders RGB images for a given view
//! - [`VideoSink`]: an append-only stream of frames for one camera
//! - [`Backend`]: a factory handing out fresh scenes and sinks per test case
//!
//! # Implementations
//!
//! - **Production**: [`RaycastBackend`] - CPU ray caster + Y4M/PNG writers
//! - **Tests**: any in-memory implementation of the traits
//!
//! # Example
//!
//! ```ignore
//! use fixturegen_env::{Backend, RaycastBackend, RenderSettings, SceneBackend, VideoFormat};
//!
//! let mut backend = RaycastBackend::new("assets/tag36h11", 0.1651, VideoFormat::Y4m);
//! let mut scene = backend.create_scene()?;
//! scene.add_ground_plane()?;
//! let frame = scene.render(&view, &RenderSettings::default())?;
//! ```

mod error;
mod raycast;
mod scene;
mod types;
mod video;

pub use error::BackendError;
pub use image::RgbImage;
pub use raycast::{RaycastBackend, RaycastScene, DEFAULT_TEXTURE_PATTERN};
pub use scene::{Backend, SceneBackend, VideoSink};
pub use types::{MarkerSpec, RenderSettings, VideoFormat, ViewParams};
pub use video::{AnyVideoSink, PngSequenceWriter, Y4mWriter};
