//! Test-case preparation and output layout.

use fixturegen_core::waypoints::load_waypoints;
use fixturegen_core::{FiducialMap, FixtureError, TestCase, TimeUnit, Trajectory};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A test case with its inputs loaded and its trajectory interpolated.
///
/// Preparing touches no output files, so input errors surface before
/// anything is written.
#[derive(Debug, Clone)]
pub struct PreparedScenario<'a> {
    pub case: &'a TestCase,
    pub trajectory: Trajectory,
    pub map: FiducialMap,
}

impl<'a> PreparedScenario<'a> {
    /// Loads waypoints and the fiducial map and interpolates the trajectory.
    pub fn load(case: &'a TestCase, framerate: f64, unit: TimeUnit) -> Result<Self, FixtureError> {
        let waypoints = load_waypoints(&case.waypoints, unit)?;
        let trajectory = Trajectory::from_waypoints(&waypoints, framerate).map_err(|e| match e {
            FixtureError::InvalidInput(msg) => {
                FixtureError::invalid_input(format!("{}: {}", case.waypoints.display(), msg))
            }
            other => other,
        })?;
        let map = FiducialMap::load(&case.fmap)?;

        debug!(
            "Prepared '{}': {} waypoints -> {} frames, {} fiducials",
            case.name,
            waypoints.len(),
            trajectory.len(),
            map.len()
        );

        Ok(Self { case, trajectory, map })
    }
}

/// Where a test case writes its artifacts.
///
/// ```text
/// <output>/<test>/<test>_<camera>.<ext>
/// <output>/<test>/<test>_gt.csv
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    dir: PathBuf,
    test: String,
}

impl OutputLayout {
    pub fn new(output_root: &Path, test: &str) -> Self {
        Self {
            dir: output_root.join(test),
            test: test.to_string(),
        }
    }

    /// Video output for one camera.
    pub fn video_path(&self, camera: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.{}", self.test, camera, extension))
    }

    /// Ground-truth log.
    pub fn ground_truth_path(&self) -> PathBuf {
        self.dir.join(format!("{}_gt.csv", self.test))
    }

    /// Creates the test directory.
    pub fn create_dir(&self) -> Result<(), FixtureError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| FixtureError::io(&self.dir, e))
    }
}

/// Picks the test cases to run.
///
/// An empty `only` list selects everything; otherwise tests run in config
/// order and every requested name must exist.
pub fn select_tests<'a>(tests: &'a [TestCase], only: &[String]) -> Result<Vec<&'a TestCase>, FixtureError> {
    if only.is_empty() {
        return Ok(tests.iter().collect());
    }

    if let Some(unknown) = only.iter().find(|name| !tests.iter().any(|t| &t.name == *name)) {
        let available: Vec<&str> = tests.iter().map(|t| t.name.as_str()).collect();
        return Err(FixtureError::config(format!(
            "unknown test '{}' (available: {})",
            unknown,
            available.join(", ")
        )));
    }

    Ok(tests.iter().filter(|t| only.contains(&t.name)).collect())
}
