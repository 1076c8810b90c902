//! fixturegen Render/Encode/Log Harness
//!
//! This crate drives the fixture pipeline end to end: for every configured
//! test case it interpolates the waypoint trajectory, renders each mounted
//! camera frame by frame, streams the frames into per-camera videos and writes
//! a ground-truth pose log that lines up with the videos frame for frame.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ScenarioRunner                         │
//! │                                                              │
//! │  TestCase ──► PreparedScenario (Trajectory + FiducialMap)    │
//! │                     │                                        │
//! │        ┌────────────┼──────────────────┐                     │
//! │        ▼            ▼                  ▼                     │
//! │   SceneBackend   compose_camera_view   GroundTruthLog        │
//! │   (per test)     (per camera/frame)    (per test)            │
//! │        │                                                     │
//! │        ▼                                                     │
//! │   VideoSink × cameras                                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use fixturegen_core::RunConfig;
//! use fixturegen_env::RaycastBackend;
//! use fixturegen_sim::ScenarioRunner;
//!
//! let config = RunConfig::load("run.yaml".as_ref())?;
//! let backend = RaycastBackend::new(&config.render.asset_dir, config.render.tag_size, config.video_format)
//!     .with_texture_pattern(config.render.texture_pattern.clone());
//! let mut runner = ScenarioRunner::from_config(backend, &config, "output");
//! let summary = runner.run_all(&config.tests)?;
//! ```

pub mod exporter;
pub mod runner;
pub mod scenarios;
pub mod visualizer;

pub use exporter::{parse_ground_truth, read_ground_truth, GroundTruthLog, GroundTruthRecord, RunSummary};
pub use runner::{CameraOutput, ProgressTracker, RunPhase, ScenarioResult, ScenarioRunner};
pub use scenarios::{select_tests, OutputLayout, PreparedScenario};
pub use visualizer::PreviewLogger;
