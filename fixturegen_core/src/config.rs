//! Typed run configuration.
//!
//! The YAML file lists independent test cases under `tests`, keyed by name,
//! plus optional run-wide settings:
//!
//! ```yaml
//! framerate: 60
//! waypoint_time_unit: seconds
//! video_format: y4m
//! render:
//!   width: 640
//!   height: 480
//!   asset_dir: at_objs/apriltag-imgs/tag36h11
//!   texture_pattern: "tag36_11_{key}-big-cleaned.png"
//! tests:
//!   straight_line:
//!     fmap: ../fmap/field.fmap
//!     waypoints: straight_line.csv
//!     camera_names: [left, right]
//!     camera_extrinsics: [[0, 0, 0, 0, 0, 0], [0, 0, 0, 0, 30, 0]]
//! ```
//!
//! Everything is validated when the file is loaded, unknown keys included.
//! Relative paths are resolved against the directory containing the config
//! file.

use crate::error::FixtureError;
use crate::pose::{CameraMount, CameraSpec};
use crate::trajectory::DEFAULT_FRAMERATE;
use crate::waypoints::TimeUnit;
use fixturegen_env::{RenderSettings, VideoFormat, DEFAULT_TEXTURE_PATTERN};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

fn default_framerate() -> f64 {
    DEFAULT_FRAMERATE
}

/// Accepted framerate range in frames per second.
pub const FRAMERATE_RANGE: (f64, f64) = (0.001, 10_000.0);

/// Largest accepted image width or height in pixels.
pub const MAX_RENDER_DIMENSION: u32 = 16_384;

/// Renderer settings plus the marker assets it draws with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawRenderConfig")]
pub struct RenderConfig {
    pub settings: RenderSettings,

    /// Marker side length in metres
    pub tag_size: f64,

    /// Directory holding the marker textures
    pub asset_dir: PathBuf,

    /// Texture file name inside `asset_dir`, `{key}` is replaced by the texture key
    pub texture_pattern: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RawRenderConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawRenderConfig {
    width: u32,
    height: u32,
    fov_deg: f64,
    near: f64,
    far: f64,
    tag_size: f64,
    asset_dir: PathBuf,
    texture_pattern: String,
}

impl Default for RawRenderConfig {
    fn default() -> Self {
        let settings = RenderSettings::default();
        Self {
            width: settings.width,
            height: settings.height,
            fov_deg: settings.fov_deg,
            near: settings.near,
            far: settings.far,
            tag_size: 0.1651,
            asset_dir: PathBuf::from("at_objs/apriltag-imgs/tag36h11"),
            texture_pattern: DEFAULT_TEXTURE_PATTERN.to_string(),
        }
    }
}

impl From<RawRenderConfig> for RenderConfig {
    fn from(raw: RawRenderConfig) -> Self {
        Self {
            settings: RenderSettings {
                width: raw.width,
                height: raw.height,
                fov_deg: raw.fov_deg,
                near: raw.near,
                far: raw.far,
            },
            tag_size: raw.tag_size,
            asset_dir: raw.asset_dir,
            texture_pattern: raw.texture_pattern,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRunConfig {
    #[serde(default = "default_framerate")]
    framerate: f64,
    #[serde(default)]
    waypoint_time_unit: TimeUnit,
    #[serde(default)]
    video_format: VideoFormat,
    #[serde(default)]
    render: RenderConfig,
    tests: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTestCase {
    fmap: PathBuf,
    waypoints: PathBuf,
    camera_names: Vec<String>,
    camera_extrinsics: Vec<Vec<f64>>,
}

/// One independent rendering job.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,

    /// Fiducial map file
    pub fmap: PathBuf,

    /// Waypoint CSV file
    pub waypoints: PathBuf,

    /// Cameras in declared order
    pub cameras: Vec<CameraSpec>,
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub framerate: f64,
    pub waypoint_time_unit: TimeUnit,
    pub video_format: VideoFormat,
    pub render: RenderConfig,

    /// Test cases in file order
    pub tests: Vec<TestCase>,
}

impl RunConfig {
    /// Reads, parses and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FixtureError::config(format!("{}: {}", path.display(), e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let config = Self::from_yaml_str(&text, base_dir).map_err(|e| match e {
            FixtureError::Config(msg) => FixtureError::config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        debug!("Loaded {} test cases from {}", config.tests.len(), path.display());
        Ok(config)
    }

    /// Parses and validates configuration text, resolving relative paths
    /// against `base_dir`.
    pub fn from_yaml_str(text: &str, base_dir: &Path) -> Result<Self, FixtureError> {
        let raw: RawRunConfig = serde_yaml::from_str(text).map_err(|e| FixtureError::config(e.to_string()))?;

        let (min_rate, max_rate) = FRAMERATE_RANGE;
        if !(raw.framerate >= min_rate && raw.framerate <= max_rate) {
            return Err(FixtureError::config(format!(
                "framerate must be within [{}, {}], got {}",
                min_rate, max_rate, raw.framerate
            )));
        }

        let mut render = raw.render;
        validate_render(&render)?;
        render.asset_dir = resolve(base_dir, &render.asset_dir);

        if raw.tests.is_empty() {
            return Err(FixtureError::config("no tests configured"));
        }

        let mut tests = Vec::with_capacity(raw.tests.len());
        for (key, value) in raw.tests {
            let name = key
                .as_str()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| FixtureError::config(format!("test names must be non-empty strings, got {:?}", key)))?
                .to_string();

            let case: RawTestCase = serde_yaml::from_value(value)
                .map_err(|e| FixtureError::config(format!("test '{}': {}", name, e)))?;

            tests.push(build_test_case(name, case, base_dir)?);
        }

        Ok(Self {
            framerate: raw.framerate,
            waypoint_time_unit: raw.waypoint_time_unit,
            video_format: raw.video_format,
            render,
            tests,
        })
    }

    /// Looks up a test case by name.
    pub fn test(&self, name: &str) -> Option<&TestCase> {
        self.tests.iter().find(|t| t.name == name)
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn validate_render(render: &RenderConfig) -> Result<(), FixtureError> {
    let s = &render.settings;
    if s.width == 0 || s.height == 0 || s.width > MAX_RENDER_DIMENSION || s.height > MAX_RENDER_DIMENSION {
        return Err(FixtureError::config(format!(
            "render size must be within 1..={} per side, got {}x{}",
            MAX_RENDER_DIMENSION, s.width, s.height
        )));
    }
    if !(s.fov_deg > 0.0 && s.fov_deg < 180.0) {
        return Err(FixtureError::config(format!("fov_deg must be in (0, 180), got {}", s.fov_deg)));
    }
    if !(s.near > 0.0 && s.far > s.near) {
        return Err(FixtureError::config(format!(
            "clip planes must satisfy 0 < near < far, got near={} far={}",
            s.near, s.far
        )));
    }
    if !(render.tag_size > 0.0) {
        return Err(FixtureError::config(format!("tag_size must be positive, got {}", render.tag_size)));
    }
    if !render.texture_pattern.contains("{key}") {
        return Err(FixtureError::config(format!(
            "texture_pattern must contain {{key}}, got '{}'",
            render.texture_pattern
        )));
    }
    Ok(())
}

fn build_test_case(name: String, raw: RawTestCase, base_dir: &Path) -> Result<TestCase, FixtureError> {
    if raw.camera_names.len() != raw.camera_extrinsics.len() {
        return Err(FixtureError::config(format!(
            "test '{}': {} camera_names but {} camera_extrinsics",
            name,
            raw.camera_names.len(),
            raw.camera_extrinsics.len()
        )));
    }
    if raw.camera_names.is_empty() {
        return Err(FixtureError::config(format!("test '{}': no cameras configured", name)));
    }

    let mut seen = HashSet::new();
    let mut cameras = Vec::with_capacity(raw.camera_names.len());
    for (camera_name, extrinsic) in raw.camera_names.into_iter().zip(raw.camera_extrinsics) {
        if camera_name.is_empty() || !seen.insert(camera_name.clone()) {
            return Err(FixtureError::config(format!(
                "test '{}': camera names must be unique and non-empty, got '{}'",
                name, camera_name
            )));
        }

        let mount = CameraMount::from_extrinsic(&extrinsic).map_err(|e| match e {
            FixtureError::Config(msg) => FixtureError::config(format!("test '{}', camera '{}': {}", name, camera_name, msg)),
            other => other,
        })?;
        cameras.push(CameraSpec::new(camera_name, mount));
    }

    Ok(TestCase {
        fmap: resolve(base_dir, &raw.fmap),
        waypoints: resolve(base_dir, &raw.waypoints),
        name,
        cameras,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
framerate: 30
video_format: png
render:
  width: 320
  height: 240
tests:
  zeta:
    fmap: maps/field.fmap
    waypoints: /abs/zeta.csv
    camera_names: [left, right]
    camera_extrinsics:
      - [-0.25, 0, 0.5, 0, 15, 0]
      - [0.25, 0, 0.5, 0, 15, 0]
  alpha:
    fmap: maps/field.fmap
    waypoints: alpha.csv
    camera_names: [front]
    camera_extrinsics: [[0, 0, 0, 0, 0, 0]]
"#;

    #[test]
    fn test_parse_config() {
        let config = RunConfig::from_yaml_str(CONFIG, Path::new("/data")).unwrap();

        assert_eq!(config.framerate, 30.0);
        assert_eq!(config.video_format, VideoFormat::Png);
        assert_eq!(config.waypoint_time_unit, TimeUnit::Seconds);
        assert_eq!(config.render.settings.width, 320);
        assert_eq!(config.render.settings.fov_deg, 60.0);
        assert_eq!(config.render.tag_size, 0.1651);
        assert_eq!(config.render.asset_dir, PathBuf::from("/data/at_objs/apriltag-imgs/tag36h11"));

        let zeta = &config.tests[0];
        assert_eq!(zeta.fmap, PathBuf::from("/data/maps/field.fmap"));
        assert_eq!(zeta.waypoints, PathBuf::from("/abs/zeta.csv"));
        assert_eq!(zeta.cameras[0].name, "left");
        assert_eq!(zeta.cameras[0].mount, CameraMount::new(-0.25, 0.0, 0.5, 0.0, 15.0, 0.0));
    }

    #[test]
    fn test_declared_order_is_kept() {
        let config = RunConfig::from_yaml_str(CONFIG, Path::new("")).unwrap();
        let names: Vec<&str> = config.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(config.test("alpha").is_some());
        assert!(config.test("beta").is_none());
    }

    #[test]
    fn test_defaults() {
        let text = "tests:\n  t:\n    fmap: a.fmap\n    waypoints: a.csv\n    camera_names: [c]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n";
        let config = RunConfig::from_yaml_str(text, Path::new("")).unwrap();

        assert_eq!(config.framerate, DEFAULT_FRAMERATE);
        assert_eq!(config.video_format, VideoFormat::Y4m);
        assert_eq!(config.render.settings, RenderSettings::default());
    }

    fn expect_config_error(text: &str) {
        assert!(
            matches!(RunConfig::from_yaml_str(text, Path::new("")), Err(FixtureError::Config(_))),
            "accepted:\n{text}"
        );
    }

    #[test]
    fn test_mismatched_camera_lists() {
        expect_config_error(
            "tests:\n  t:\n    fmap: a\n    waypoints: b\n    camera_names: [l, r]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n",
        );
    }

    #[test]
    fn test_short_extrinsic() {
        expect_config_error("tests:\n  t:\n    fmap: a\n    waypoints: b\n    camera_names: [l]\n    camera_extrinsics: [[0,0,0]]\n");
    }

    #[test]
    fn test_duplicate_camera_names() {
        expect_config_error(
            "tests:\n  t:\n    fmap: a\n    waypoints: b\n    camera_names: [l, l]\n    camera_extrinsics: [[0,0,0,0,0,0],[0,0,0,0,0,0]]\n",
        );
    }

    #[test]
    fn test_missing_field() {
        expect_config_error("tests:\n  t:\n    fmap: a\n    camera_names: [l]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n");
    }

    #[test]
    fn test_invalid_run_settings() {
        expect_config_error("tests: {}\n");
        expect_config_error("framerate: 0\ntests:\n  t:\n    fmap: a\n    waypoints: b\n    camera_names: [l]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n");
        expect_config_error("render:\n  near: 5\n  far: 1\ntests:\n  t:\n    fmap: a\n    waypoints: b\n    camera_names: [l]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n");
        expect_config_error("video_format: mp4\ntests:\n  t:\n    fmap: a\n    waypoints: b\n    camera_names: [l]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n");
        expect_config_error("- not a mapping\n");
    }

    #[test]
    fn test_misspelled_keys_are_rejected() {
        let test = "tests:\n  t:\n    fmap: a\n    waypoints: b\n    camera_names: [l]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n";

        expect_config_error(&format!("framerat: 30\n{test}"));
        expect_config_error(&format!("render:\n  widht: 320\n{test}"));
        expect_config_error(
            "tests:\n  t:\n    fmap: a\n    waypoint: b\n    waypoints: b\n    camera_names: [l]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n",
        );
    }

    #[test]
    fn test_out_of_range_values() {
        let test = "tests:\n  t:\n    fmap: a\n    waypoints: b\n    camera_names: [l]\n    camera_extrinsics: [[0,0,0,0,0,0]]\n";

        expect_config_error(&format!("render:\n  width: 40000\n  height: 40000\n{test}"));
        expect_config_error(&format!("framerate: 0.0004\n{test}"));
        expect_config_error(&format!("framerate: .nan\n{test}"));
        expect_config_error(&format!("render:\n  texture_pattern: tag.png\n{test}"));

        let config = RunConfig::from_yaml_str(&format!("framerate: 0.5\n{test}"), Path::new("")).unwrap();
        assert_eq!(config.framerate, 0.5);
        assert_eq!(config.render.texture_pattern, DEFAULT_TEXTURE_PATTERN);
    }

    #[test]
    fn test_unreadable_file() {
        assert!(matches!(
            RunConfig::load(Path::new("/nonexistent/run.yaml")),
            Err(FixtureError::Config(_))
        ));
    }
}
