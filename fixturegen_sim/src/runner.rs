//! Scenario runner - renders, encodes and logs test cases.
//!
//! Each test case walks through `INIT → RUNNING → FINALIZE → DONE`:
//!
//! - **INIT**: load inputs, build a fresh scene (ground plane + fiducials),
//!   open one video stream per camera and the ground-truth log
//! - **RUNNING**: for every trajectory frame, render each camera in declared
//!   order, append the frames, then append one ground-truth record
//! - **FINALIZE**: flush and close all streams and the log
//! - **DONE**: the scene is dropped; the next test starts from scratch
//!
//! Test cases run strictly one after another. The first error aborts the run
//! and is returned to the caller.

use crate::exporter::{GroundTruthLog, GroundTruthRecord, RunSummary};
use crate::scenarios::{OutputLayout, PreparedScenario};
use crate::visualizer::PreviewLogger;

use fixturegen_core::{compose_camera_view, FixtureError, RunConfig, TestCase, TimeUnit, DEFAULT_FRAMERATE};
use fixturegen_env::{Backend, BackendError, RenderSettings, SceneBackend, VideoSink};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle phase of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Running,
    Finalize,
    Done,
}

impl RunPhase {
    pub fn name(&self) -> &'static str {
        match self {
            RunPhase::Init => "INIT",
            RunPhase::Running => "RUNNING",
            RunPhase::Finalize => "FINALIZE",
            RunPhase::Done => "DONE",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output of one camera of a finished test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraOutput {
    pub name: String,
    pub path: PathBuf,
    pub frames: u64,
}

/// Results from running a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Test case name
    pub test: String,

    /// Frames rendered per camera (= ground-truth records)
    pub frames: usize,

    /// Fiducial markers placed in the scene
    pub markers: usize,

    /// Per-camera video outputs in declared order
    pub cameras: Vec<CameraOutput>,

    /// Ground-truth log
    pub ground_truth: PathBuf,

    /// Wall-clock time spent on the test
    pub elapsed_secs: f64,
}

/// Reports completion in steps of at least 10%.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    next_percent: f64,
}

impl ProgressTracker {
    /// Progress step in percent.
    pub const STEP: f64 = 10.0;

    pub fn new(total: usize) -> Self {
        Self {
            total,
            next_percent: Self::STEP,
        }
    }

    /// Records `done` completed frames, returning the percentage when a new
    /// 10% threshold has been crossed.
    pub fn update(&mut self, done: usize) -> Option<f64> {
        if self.total == 0 {
            return None;
        }

        let percent = done as f64 * 100.0 / self.total as f64;
        if percent + 1e-9 < self.next_percent {
            return None;
        }

        self.next_percent = ((percent + 1e-9) / Self::STEP).floor() * Self::STEP + Self::STEP;
        Some(percent)
    }
}

/// Runs test cases against a backend.
pub struct ScenarioRunner<B: Backend> {
    backend: B,

    /// Root directory for all test outputs
    output_dir: PathBuf,

    /// Frames per second
    framerate: f64,

    /// Unit of the waypoint time column
    time_unit: TimeUnit,

    /// Fixed render resolution and projection
    settings: RenderSettings,

    preview: PreviewLogger,
}

impl<B: Backend> ScenarioRunner<B> {
    /// Creates a runner with default framerate and render settings.
    pub fn new(backend: B, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
            framerate: DEFAULT_FRAMERATE,
            time_unit: TimeUnit::Seconds,
            settings: RenderSettings::default(),
            preview: PreviewLogger::disabled(),
        }
    }

    /// Creates a runner using the run-wide settings of a configuration.
    pub fn from_config(backend: B, config: &RunConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self::new(backend, output_dir)
            .with_framerate(config.framerate)
            .with_time_unit(config.waypoint_time_unit)
            .with_render_settings(config.render.settings.clone())
    }

    /// Sets the framerate.
    pub fn with_framerate(mut self, framerate: f64) -> Self {
        self.framerate = framerate;
        self
    }

    /// Sets the waypoint time unit.
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = unit;
        self
    }

    /// Sets the render settings.
    pub fn with_render_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Attaches a preview logger.
    pub fn with_preview(mut self, preview: PreviewLogger) -> Self {
        self.preview = preview;
        self
    }

    /// Gives back the backend (e.g. to inspect a test double).
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Runs every test case in order, stopping at the first error.
    pub fn run_all<'a, I>(&mut self, cases: I) -> Result<RunSummary, FixtureError>
    where
        I: IntoIterator<Item = &'a TestCase>,
    {
        let mut summary = RunSummary::new(self.framerate);
        for case in cases {
            let result = self.run(case)?;
            summary.add_result(result);
        }
        Ok(summary)
    }

    /// Runs a single test case.
    pub fn run(&mut self, case: &TestCase) -> Result<ScenarioResult, FixtureError> {
        let started = Instant::now();
        info!("Starting test: {} ({} cameras)", case.name, case.cameras.len());

        // INIT
        self.enter(case, RunPhase::Init);
        let prepared = PreparedScenario::load(case, self.framerate, self.time_unit)?;

        let mut scene = self.backend.create_scene()?;
        scene.add_ground_plane()?;
        let markers = prepared.map.populate_scene(&mut scene)?;
        self.preview.log_markers(&case.name, &prepared.map);

        let layout = OutputLayout::new(&self.output_dir, &case.name);
        layout.create_dir()?;

        let extension = self.backend.video_extension();
        let mut sinks = Vec::with_capacity(case.cameras.len());
        let mut video_paths = Vec::with_capacity(case.cameras.len());
        for camera in &case.cameras {
            let path = layout.video_path(&camera.name, extension);
            sinks.push(self.backend.open_video(&path, self.framerate, &self.settings)?);
            video_paths.push(path);
        }
        let mut log = GroundTruthLog::create(&layout.ground_truth_path())?;

        // RUNNING
        self.enter(case, RunPhase::Running);
        let trajectory = &prepared.trajectory;
        if trajectory.is_empty() {
            warn!("Test '{}' interpolates to zero frames", case.name);
        }

        let mut progress = ProgressTracker::new(trajectory.len());
        for (index, timestamp_ns, pose) in trajectory.frames() {
            self.preview.set_frame(index, timestamp_ns);
            self.preview.log_body(&case.name, pose);

            for (camera, sink) in case.cameras.iter().zip(sinks.iter_mut()) {
                let view = compose_camera_view(pose, &camera.mount);
                let frame = scene.render(&view, &self.settings)?;
                sink.write_frame(&frame)?;
                self.preview.log_camera(&case.name, &camera.name, &view, &frame);
            }

            log.append(&GroundTruthRecord::new(timestamp_ns, *pose))?;

            if let Some(percent) = progress.update(index + 1) {
                info!("  {}: {:.2}% complete", case.name, percent);
            }
        }

        // FINALIZE
        self.enter(case, RunPhase::Finalize);
        for sink in sinks.iter_mut() {
            sink.finish()?;
        }
        log.finish()?;

        let records = log.records_written();
        let mut cameras = Vec::with_capacity(sinks.len());
        for ((camera, sink), path) in case.cameras.iter().zip(&sinks).zip(video_paths) {
            if sink.frames_written() != records {
                return Err(BackendError::Encode(format!(
                    "camera '{}' has {} frames but the ground-truth log has {} records",
                    camera.name,
                    sink.frames_written(),
                    records
                ))
                .into());
            }
            cameras.push(CameraOutput {
                name: camera.name.clone(),
                path,
                frames: sink.frames_written(),
            });
        }

        // DONE
        self.enter(case, RunPhase::Done);
        let elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            "✓ {} complete: {} frames x {} cameras, {} markers ({:.1}s)",
            case.name,
            trajectory.len(),
            cameras.len(),
            markers,
            elapsed_secs
        );

        Ok(ScenarioResult {
            test: case.name.clone(),
            frames: trajectory.len(),
            markers,
            cameras,
            ground_truth: log.path().to_path_buf(),
            elapsed_secs,
        })
    }

    fn enter(&self, case: &TestCase, phase: RunPhase) {
        debug!("[{}] {}", case.name, phase);
        self.preview.log_event(&format!("{}/events", case.name), phase.name());
    }
}
