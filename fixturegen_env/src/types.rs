//! Common types shared between the pipeline and its backends.

use nalgebra::{Isometry3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// World-frame view parameters for one camera at one frame.
///
/// This is the look-at triple a rendering backend turns into a view matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    /// Camera centre in world coordinates
    pub position: Vector3<f64>,

    /// Point the camera looks at (one unit along the optical axis)
    pub target: Vector3<f64>,

    /// Camera up direction in world coordinates
    pub up: Vector3<f64>,
}

impl ViewParams {
    /// Unit vector along the optical axis.
    pub fn forward(&self) -> Vector3<f64> {
        (self.target - self.position).normalize()
    }

    /// Right-handed world-to-camera view matrix.
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }
}

/// Fixed per-run rendering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Vertical field of view in degrees
    pub fov_deg: f64,

    /// Near clipping distance (metres along the optical axis)
    pub near: f64,

    /// Far clipping distance (metres along the optical axis)
    pub far: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fov_deg: 60.0,
            near: 0.03,
            far: 30.0,
        }
    }
}

impl RenderSettings {
    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Request to place one textured fiducial marker in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Fiducial id
    pub id: u32,

    /// Fixed-width texture key derived from the id (e.g. `"00007"`)
    pub texture_key: String,

    /// Marker pose in the world frame
    pub pose: Isometry3<f64>,
}

/// Container format used for per-camera video output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    /// Single uncompressed YUV4MPEG2 file per camera
    #[default]
    Y4m,

    /// Directory of numbered PNG frames per camera
    Png,
}

impl VideoFormat {
    /// File extension (or directory suffix) used for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            VideoFormat::Y4m => "y4m",
            VideoFormat::Png => "png.d",
        }
    }
}

impl std::fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoFormat::Y4m => write!(f, "y4m"),
            VideoFormat::Png => write!(f, "png"),
        }
    }
}
