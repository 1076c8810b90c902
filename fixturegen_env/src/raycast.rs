//! Production backend: a small CPU ray caster.
//!
//! The scene only ever contains a ground plane and flat square markers, so
//! every primary ray is intersected analytically against a handful of planes.
//! Ray parameters are measured in view-space depth, which makes near/far
//! clipping behave like a perspective projection matrix would.

use crate::error::BackendError;
use crate::scene::{Backend, SceneBackend};
use crate::types::{MarkerSpec, RenderSettings, VideoFormat, ViewParams};
use crate::video::{AnyVideoSink, PngSequenceWriter, Y4mWriter};
use image::{Rgb, RgbImage};
use nalgebra::{Isometry3, Point3, Vector3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const SKY: Rgb<u8> = Rgb([178, 204, 230]);
const GROUND_LIGHT: Rgb<u8> = Rgb([200, 200, 200]);
const GROUND_DARK: Rgb<u8> = Rgb([120, 120, 120]);

/// Texture file name used for AprilTag tag36h11 assets; `{key}` is replaced by
/// the marker's texture key.
pub const DEFAULT_TEXTURE_PATTERN: &str = "tag36_11_{key}-big-cleaned.png";

/// Side length of one ground checker cell in metres.
const CHECKER_SIZE: f64 = 1.0;

struct Marker {
    /// World-to-marker transform
    world_to_local: Isometry3<f64>,
    texture: Arc<RgbImage>,
}

/// CPU ray-cast scene with a checkerboard ground plane and textured markers.
pub struct RaycastScene {
    asset_dir: PathBuf,
    texture_pattern: String,
    tag_size: f64,
    ground_plane: bool,
    markers: Vec<Marker>,
    textures: HashMap<String, Arc<RgbImage>>,
}

impl RaycastScene {
    /// Creates an empty scene loading marker textures from `asset_dir`.
    pub fn new(asset_dir: impl Into<PathBuf>, tag_size: f64) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            texture_pattern: DEFAULT_TEXTURE_PATTERN.to_string(),
            tag_size,
            ground_plane: false,
            markers: Vec::new(),
            textures: HashMap::new(),
        }
    }

    /// Sets the texture file name pattern.
    pub fn with_texture_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.texture_pattern = pattern.into();
        self
    }

    /// Path of the texture image for a marker key.
    pub fn texture_path(&self, key: &str) -> PathBuf {
        self.asset_dir.join(self.texture_pattern.replace("{key}", key))
    }

    fn load_texture(&mut self, key: &str) -> Result<Arc<RgbImage>, BackendError> {
        if let Some(texture) = self.textures.get(key) {
            return Ok(Arc::clone(texture));
        }

        let path = self.texture_path(key);
        let texture = image::open(&path)
            .map_err(|e| BackendError::asset(&path, e.to_string()))?
            .to_rgb8();
        if texture.width() == 0 || texture.height() == 0 {
            return Err(BackendError::asset(&path, "empty texture"));
        }

        let texture = Arc::new(texture);
        self.textures.insert(key.to_string(), Arc::clone(&texture));
        Ok(texture)
    }

    /// Shades the ray `origin + t * dir`, returning the colour of the nearest hit.
    fn trace(&self, origin: &Point3<f64>, dir: &Vector3<f64>, near: f64, far: f64) -> Rgb<u8> {
        let mut best_t = far;
        let mut colour = SKY;

        if self.ground_plane && dir.z.abs() > f64::EPSILON {
            let t = -origin.z / dir.z;
            if t >= near && t <= best_t {
                let hit = origin + dir * t;
                let cell = (hit.x / CHECKER_SIZE).floor() as i64 + (hit.y / CHECKER_SIZE).floor() as i64;
                best_t = t;
                colour = if cell.rem_euclid(2) == 0 { GROUND_LIGHT } else { GROUND_DARK };
            }
        }

        let half = self.tag_size / 2.0;
        for marker in &self.markers {
            let o = marker.world_to_local * origin;
            let d = marker.world_to_local.rotation * dir;
            if d.z.abs() <= f64::EPSILON {
                continue;
            }

            let t = -o.z / d.z;
            if t < near || t > best_t {
                continue;
            }

            let hit = o + d * t;
            if hit.x.abs() > half || hit.y.abs() > half {
                continue;
            }

            let (tw, th) = marker.texture.dimensions();
            let u = (hit.x / self.tag_size + 0.5) * tw as f64;
            let v = (0.5 - hit.y / self.tag_size) * th as f64;
            let px = (u.max(0.0) as u32).min(tw - 1);
            let py = (v.max(0.0) as u32).min(th - 1);

            best_t = t;
            colour = *marker.texture.get_pixel(px, py);
        }

        colour
    }
}

impl SceneBackend for RaycastScene {
    fn add_ground_plane(&mut self) -> Result<(), BackendError> {
        self.ground_plane = true;
        Ok(())
    }

    fn spawn_marker(&mut self, marker: MarkerSpec) -> Result<(), BackendError> {
        let texture = self.load_texture(&marker.texture_key)?;
        debug!("Spawned marker {} at {:?}", marker.id, marker.pose.translation.vector);

        self.markers.push(Marker {
            world_to_local: marker.pose.inverse(),
            texture,
        });
        Ok(())
    }

    fn render(&mut self, view: &ViewParams, settings: &RenderSettings) -> Result<RgbImage, BackendError> {
        if settings.width == 0 || settings.height == 0 {
            return Err(BackendError::render("image size must be non-zero"));
        }
        if !(settings.fov_deg > 0.0 && settings.fov_deg < 180.0) {
            return Err(BackendError::render(format!("invalid field of view {}", settings.fov_deg)));
        }

        if view.forward().cross(&view.up).norm() <= f64::EPSILON {
            return Err(BackendError::render("up vector is parallel to the view direction"));
        }

        // Rows of the view rotation are the camera axes in world coordinates
        let view_matrix = view.view_matrix();
        let right: Vector3<f64> = view_matrix.fixed_view::<1, 3>(0, 0).transpose();
        let up: Vector3<f64> = view_matrix.fixed_view::<1, 3>(1, 0).transpose();
        let forward: Vector3<f64> = -view_matrix.fixed_view::<1, 3>(2, 0).transpose();

        let tan_half = (settings.fov_deg.to_radians() / 2.0).tan();
        let aspect = settings.aspect_ratio();
        let (w, h) = (settings.width as f64, settings.height as f64);
        let origin = Point3::from(view.position);

        let image = RgbImage::from_fn(settings.width, settings.height, |px, py| {
            let sx = ((px as f64 + 0.5) / w * 2.0 - 1.0) * tan_half * aspect;
            let sy = (1.0 - (py as f64 + 0.5) / h * 2.0) * tan_half;
            let dir = forward + right * sx + up * sy;
            self.trace(&origin, &dir, settings.near, settings.far)
        });

        Ok(image)
    }

    fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

/// Backend handing out [`RaycastScene`]s and the built-in video writers.
#[derive(Debug, Clone)]
pub struct RaycastBackend {
    asset_dir: PathBuf,
    texture_pattern: String,
    tag_size: f64,
    format: VideoFormat,
}

impl RaycastBackend {
    /// Creates a backend.
    pub fn new(asset_dir: impl Into<PathBuf>, tag_size: f64, format: VideoFormat) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            texture_pattern: DEFAULT_TEXTURE_PATTERN.to_string(),
            tag_size,
            format,
        }
    }

    /// Sets the texture file name pattern used by every scene.
    pub fn with_texture_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.texture_pattern = pattern.into();
        self
    }
}

impl Backend for RaycastBackend {
    type Scene = RaycastScene;
    type Sink = AnyVideoSink;

    fn create_scene(&mut self) -> Result<RaycastScene, BackendError> {
        let scene = RaycastScene::new(self.asset_dir.clone(), self.tag_size);
        Ok(scene.with_texture_pattern(self.texture_pattern.clone()))
    }

    fn open_video(
        &mut self,
        path: &Path,
        framerate: f64,
        settings: &RenderSettings,
    ) -> Result<AnyVideoSink, BackendError> {
        Ok(match self.format {
            VideoFormat::Y4m => {
                AnyVideoSink::Y4m(Y4mWriter::create(path, settings.width, settings.height, framerate)?)
            }
            VideoFormat::Png => {
                AnyVideoSink::Png(PngSequenceWriter::create(path, settings.width, settings.height)?)
            }
        })
    }

    fn video_extension(&self) -> &'static str {
        self.format.extension()
    }
}
