//! Fiducial map loading.
//!
//! Map files are JSON documents with a top-level `fiducials` array; each entry
//! carries an integer `id` and a row-major 4x4 world transform:
//!
//! ```json
//! { "fiducials": [ { "id": 7, "transform": [1,0,0,2, 0,1,0,0, 0,0,1,0.5, 0,0,0,1] } ] }
//! ```
//!
//! Unknown fields are ignored. Duplicate ids are not detected.

use crate::error::FixtureError;
use fixturegen_env::{MarkerSpec, SceneBackend};
use nalgebra::{Isometry3, Matrix3, Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Width of the zero-padded texture key.
pub const TEXTURE_KEY_WIDTH: usize = 5;

#[derive(Debug, Deserialize)]
struct RawMap {
    fiducials: Vec<RawFiducial>,
}

#[derive(Debug, Deserialize)]
struct RawFiducial {
    id: u32,
    transform: Vec<f64>,
}

/// A static marker with a known world pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Fiducial {
    pub id: u32,
    pub transform: Matrix4<f64>,
}

impl Fiducial {
    /// Translation part of the transform.
    pub fn translation(&self) -> Vector3<f64> {
        self.transform.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Rotation part of the transform, re-orthonormalised.
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        let m: Matrix3<f64> = self.transform.fixed_view::<3, 3>(0, 0).into_owned();
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&m))
    }

    /// Rigid world pose of the marker.
    pub fn pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation()), self.rotation())
    }

    /// Texture key: the id zero-padded to [`TEXTURE_KEY_WIDTH`] digits.
    pub fn texture_key(&self) -> String {
        format!("{:0width$}", self.id, width = TEXTURE_KEY_WIDTH)
    }

    /// Marker request for a scene backend.
    pub fn marker_spec(&self) -> MarkerSpec {
        MarkerSpec {
            id: self.id,
            texture_key: self.texture_key(),
            pose: self.pose(),
        }
    }
}

/// All fiducials of one map file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiducialMap {
    pub fiducials: Vec<Fiducial>,
}

impl FiducialMap {
    /// Parses a map from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, FixtureError> {
        let raw: RawMap = serde_json::from_str(text).map_err(|e| FixtureError::map_format(e.to_string()))?;

        let fiducials = raw
            .fiducials
            .into_iter()
            .enumerate()
            .map(|(i, f)| {
                if f.transform.len() != 16 {
                    return Err(FixtureError::map_format(format!(
                        "fiducial #{} (id {}): transform must have 16 values, got {}",
                        i,
                        f.id,
                        f.transform.len()
                    )));
                }
                if f.transform.iter().any(|v| !v.is_finite()) {
                    return Err(FixtureError::map_format(format!(
                        "fiducial #{} (id {}): transform contains non-finite values",
                        i, f.id
                    )));
                }
                Ok(Fiducial {
                    id: f.id,
                    transform: Matrix4::from_row_slice(&f.transform),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { fiducials })
    }

    /// Reads and parses a map file.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FixtureError::map_format(format!("{}: {}", path.display(), e)))?;
        let map = Self::from_json_str(&text).map_err(|e| match e {
            FixtureError::MapFormat(msg) => FixtureError::map_format(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

        debug!("Loaded {} fiducials from {}", map.len(), path.display());
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.fiducials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fiducials.is_empty()
    }

    /// Instantiates one textured marker per fiducial in `scene`.
    ///
    /// Returns the number of markers spawned.
    pub fn populate_scene<S: SceneBackend + ?Sized>(&self, scene: &mut S) -> Result<usize, FixtureError> {
        for fiducial in &self.fiducials {
            scene.spawn_marker(fiducial.marker_spec())?;
        }

        info!("Spawned {} fiducial markers", self.fiducials.len());
        Ok(self.fiducials.len())
    }
}
