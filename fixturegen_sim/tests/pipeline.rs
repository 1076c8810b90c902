//! End-to-end runs of the fixture pipeline.

use fixturegen_core::{FixtureError, RunConfig, TimeUnit, Trajectory};
use fixturegen_env::{
    Backend, BackendError, MarkerSpec, RaycastBackend, RenderSettings, RgbImage, SceneBackend, VideoSink,
    ViewParams,
};
use fixturegen_sim::{read_ground_truth, PreparedScenario, RunSummary, ScenarioRunner};
use image::Rgb;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

// =============================================================================
// Recording backend
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Event {
    CreateScene,
    GroundPlane,
    Spawn(String),
    Open(String),
    Render,
    Write(String),
    Finish(String),
}

type Events = Rc<RefCell<Vec<Event>>>;

struct RecordingScene {
    events: Events,
    markers: usize,
}

impl SceneBackend for RecordingScene {
    fn add_ground_plane(&mut self) -> Result<(), BackendError> {
        self.events.borrow_mut().push(Event::GroundPlane);
        Ok(())
    }

    fn spawn_marker(&mut self, marker: MarkerSpec) -> Result<(), BackendError> {
        self.events.borrow_mut().push(Event::Spawn(marker.texture_key));
        self.markers += 1;
        Ok(())
    }

    fn render(&mut self, _view: &ViewParams, settings: &RenderSettings) -> Result<RgbImage, BackendError> {
        self.events.borrow_mut().push(Event::Render);
        Ok(RgbImage::new(settings.width, settings.height))
    }

    fn marker_count(&self) -> usize {
        self.markers
    }
}

struct RecordingSink {
    events: Events,
    name: String,
    frames: u64,
    /// Frames still to be silently lost
    drops: u64,
}

impl VideoSink for RecordingSink {
    fn write_frame(&mut self, _frame: &RgbImage) -> Result<(), BackendError> {
        self.events.borrow_mut().push(Event::Write(self.name.clone()));
        if self.drops > 0 {
            self.drops -= 1;
        } else {
            self.frames += 1;
        }
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        self.events.borrow_mut().push(Event::Finish(self.name.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingBackend {
    events: Events,
    /// Video file whose sink loses its first frame
    lossy_video: Option<String>,
}

impl Backend for RecordingBackend {
    type Scene = RecordingScene;
    type Sink = RecordingSink;

    fn create_scene(&mut self) -> Result<RecordingScene, BackendError> {
        self.events.borrow_mut().push(Event::CreateScene);
        Ok(RecordingScene {
            events: Rc::clone(&self.events),
            markers: 0,
        })
    }

    fn open_video(
        &mut self,
        path: &Path,
        _framerate: f64,
        _settings: &RenderSettings,
    ) -> Result<RecordingSink, BackendError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.events.borrow_mut().push(Event::Open(name.clone()));
        let drops = u64::from(self.lossy_video.as_deref() == Some(name.as_str()));
        Ok(RecordingSink {
            events: Rc::clone(&self.events),
            name,
            frames: 0,
            drops,
        })
    }

    fn video_extension(&self) -> &'static str {
        "vid"
    }
}

// =============================================================================
// Fixtures
// =============================================================================

const MAP: &str = r#"{
    "fiducials": [
        { "id": 7, "transform": [1,0,0,0, 0,0,-1,2, 0,1,0,1, 0,0,0,1] },
        { "id": 21, "transform": [1,0,0,1, 0,0,-1,2, 0,1,0,1, 0,0,0,1] }
    ]
}"#;

/// Writes inputs and a config into `dir` and loads the config.
fn write_inputs(dir: &Path, framerate: f64, video_format: &str, tests: &[(&str, &str)]) -> RunConfig {
    fs::write(dir.join("field.fmap"), MAP).unwrap();

    let assets = dir.join("tags");
    fs::create_dir_all(&assets).unwrap();
    for key in ["00007", "00021"] {
        RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]))
            .save(assets.join(format!("tag36_11_{}-big-cleaned.png", key)))
            .unwrap();
    }

    let mut yaml = format!(
        "framerate: {}\nvideo_format: {}\nrender:\n  width: 16\n  height: 12\n  tag_size: 0.5\n  asset_dir: tags\ntests:\n",
        framerate, video_format
    );
    for (name, waypoints) in tests {
        fs::write(dir.join(format!("{}.csv", name)), waypoints).unwrap();
        yaml.push_str(&format!(
            "  {name}:\n    fmap: field.fmap\n    waypoints: {name}.csv\n    camera_names: [left, right]\n    camera_extrinsics: [[-0.1, 0, 0, 0, 0, 0], [0.1, 0, 0, 0, 0, 0]]\n"
        ));
    }

    let path = dir.join("run.yaml");
    fs::write(&path, yaml).unwrap();
    RunConfig::load(&path).unwrap()
}

const SHORT: &str = "0,0,0,1,0,0,0\n0.2,0,0.5,1,0,0,10\n";
const LATE_START: &str = "1,0,0,0,0,0,0\n2,1,1,1,0,0,0\n";

fn hidden_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with('.'))
        .collect()
}

// =============================================================================
// Recording backend runs
// =============================================================================

#[test]
fn test_cameras_render_in_declared_order_each_frame() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 20.0, "y4m", &[("walk", SHORT)]);
    let out = dir.path().join("out");

    let mut runner = ScenarioRunner::from_config(RecordingBackend::default(), &config, &out);
    let result = runner.run(&config.tests[0]).unwrap();
    let backend = runner.into_backend();
    let events = backend.events.borrow().clone();

    // floor(0.2 * 20) = 4 frames
    assert_eq!(result.frames, 4);
    assert_eq!(result.markers, 2);

    let mut expected = vec![
        Event::CreateScene,
        Event::GroundPlane,
        Event::Spawn("00007".to_string()),
        Event::Spawn("00021".to_string()),
        Event::Open("walk_left.vid".to_string()),
        Event::Open("walk_right.vid".to_string()),
    ];
    for _ in 0..4 {
        expected.push(Event::Render);
        expected.push(Event::Write("walk_left.vid".to_string()));
        expected.push(Event::Render);
        expected.push(Event::Write("walk_right.vid".to_string()));
    }
    expected.push(Event::Finish("walk_left.vid".to_string()));
    expected.push(Event::Finish("walk_right.vid".to_string()));
    assert_eq!(events, expected);

    let records = read_ground_truth(&out.join("walk").join("walk_gt.csv")).unwrap();
    assert_eq!(records.len(), 4);
    assert!(result.cameras.iter().all(|c| c.frames == 4));
}

#[test]
fn test_every_test_gets_a_fresh_scene() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 20.0, "y4m", &[("first", SHORT), ("second", SHORT)]);

    let mut runner = ScenarioRunner::from_config(RecordingBackend::default(), &config, dir.path().join("out"));
    let summary = runner.run_all(&config.tests).unwrap();
    let backend = runner.into_backend();
    let events = backend.events.borrow().clone();

    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.results[0].test, "first");
    assert_eq!(summary.results[1].test, "second");

    let scenes = events.iter().filter(|e| **e == Event::CreateScene).count();
    let spawns = events.iter().filter(|e| matches!(e, Event::Spawn(_))).count();
    assert_eq!(scenes, 2);
    assert_eq!(spawns, 4);
}

#[test]
fn test_run_stops_at_first_failing_test() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(
        dir.path(),
        20.0,
        "y4m",
        &[("good", SHORT), ("bad", LATE_START), ("later", SHORT)],
    );
    let out = dir.path().join("out");

    let mut runner = ScenarioRunner::from_config(RecordingBackend::default(), &config, &out);
    let err = runner.run_all(&config.tests).unwrap_err();

    assert!(matches!(err, FixtureError::InvalidInput(_)));
    assert!(out.join("good").join("good_gt.csv").exists());
    assert!(!out.join("bad").exists());
    assert!(!out.join("later").exists());
}

#[test]
fn test_lost_frame_fails_the_test() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 20.0, "y4m", &[("walk", SHORT)]);

    let backend = RecordingBackend {
        lossy_video: Some("walk_right.vid".to_string()),
        ..Default::default()
    };
    let mut runner = ScenarioRunner::from_config(backend, &config, dir.path().join("out"));

    match runner.run(&config.tests[0]) {
        Err(FixtureError::Backend(BackendError::Encode(msg))) => {
            assert!(msg.contains("'right' has 3 frames"), "{msg}");
        }
        other => panic!("expected an encode error, got {other:?}"),
    }
}

// =============================================================================
// Ray-cast backend runs
// =============================================================================

#[test]
fn test_y4m_frames_match_ground_truth() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 50.0, "y4m", &[("walk", SHORT)]);
    let out = dir.path().join("out");

    let backend = RaycastBackend::new(config.render.asset_dir.clone(), config.render.tag_size, config.video_format);
    let mut runner = ScenarioRunner::from_config(backend, &config, &out);
    let summary = runner.run_all(&config.tests).unwrap();

    // floor(0.2 * 50) = 10 frames, 20 ms apart
    let result = &summary.results[0];
    assert_eq!(result.frames, 10);

    let records = read_ground_truth(&result.ground_truth).unwrap();
    assert_eq!(records.len(), 10);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.timestamp_ns, i as u64 * 20_000_000);
    }

    let prepared = PreparedScenario::load(&config.tests[0], config.framerate, TimeUnit::Seconds).unwrap();
    let logged: Vec<_> = records.iter().map(|r| r.pose).collect();
    assert_eq!(logged, prepared.trajectory.poses());

    let header = "YUV4MPEG2 W16 H12 F50:1 Ip A1:1 C444\n";
    let frame_bytes = "FRAME\n".len() + 16 * 12 * 3;
    for camera in &result.cameras {
        assert_eq!(camera.path, out.join("walk").join(format!("walk_{}.y4m", camera.name)));
        let bytes = fs::read(&camera.path).unwrap();
        assert!(bytes.starts_with(header.as_bytes()));
        assert_eq!(bytes.len(), header.len() + 10 * frame_bytes);
    }

    assert!(hidden_files(&out.join("walk")).is_empty());
}

#[test]
fn test_png_sequence_output() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 20.0, "png", &[("walk", SHORT)]);
    let out = dir.path().join("out");

    let backend = RaycastBackend::new(config.render.asset_dir.clone(), config.render.tag_size, config.video_format);
    let mut runner = ScenarioRunner::from_config(backend, &config, &out);
    runner.run_all(&config.tests).unwrap();

    let frames_dir = out.join("walk").join("walk_left.png.d");
    let frames = fs::read_dir(&frames_dir).unwrap().count();
    assert_eq!(frames, 4);

    let first = image::open(frames_dir.join("frame_000000.png")).unwrap().to_rgb8();
    assert_eq!(first.dimensions(), (16, 12));
}

#[test]
fn test_invalid_waypoints_write_nothing() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 50.0, "y4m", &[("late", LATE_START)]);
    let out = dir.path().join("out");

    let backend = RaycastBackend::new(config.render.asset_dir.clone(), config.render.tag_size, config.video_format);
    let mut runner = ScenarioRunner::from_config(backend, &config, &out);

    let err = runner.run(&config.tests[0]).unwrap_err();
    assert!(matches!(err, FixtureError::InvalidInput(_)));
    assert!(!out.exists());
}

#[test]
fn test_missing_texture_is_backend_error() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 50.0, "y4m", &[("walk", SHORT)]);
    fs::remove_file(config.render.asset_dir.join("tag36_11_00021-big-cleaned.png")).unwrap();
    let out = dir.path().join("out");

    let backend = RaycastBackend::new(config.render.asset_dir.clone(), config.render.tag_size, config.video_format);
    let mut runner = ScenarioRunner::from_config(backend, &config, &out);

    let err = runner.run(&config.tests[0]).unwrap_err();
    assert!(matches!(err, FixtureError::Backend(BackendError::Asset { .. })));
    assert!(!out.exists());
}

#[test]
fn test_summary_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 20.0, "y4m", &[("walk", SHORT)]);
    let out = dir.path().join("out");

    let mut runner = ScenarioRunner::from_config(RecordingBackend::default(), &config, &out);
    let summary = runner.run_all(&config.tests).unwrap();

    let path = out.join("summary.json");
    summary.write_to_file(&path).unwrap();

    let loaded: RunSummary = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.framerate, 20.0);
    assert_eq!(loaded.results.len(), 1);
    assert_eq!(loaded.results[0].test, "walk");
    assert_eq!(loaded.results[0].cameras, summary.results[0].cameras);
    assert_eq!(loaded.total_frames(), 4);
}

#[test]
fn test_trajectory_matches_runner_frame_count() {
    let dir = TempDir::new().unwrap();
    let config = write_inputs(dir.path(), 60.0, "y4m", &[("walk", SHORT)]);

    let waypoints = fixturegen_core::waypoints::load_waypoints(&config.tests[0].waypoints, TimeUnit::Seconds).unwrap();
    let trajectory = Trajectory::from_waypoints(&waypoints, 60.0).unwrap();

    let mut runner = ScenarioRunner::from_config(RecordingBackend::default(), &config, dir.path().join("out"));
    let result = runner.run(&config.tests[0]).unwrap();
    assert_eq!(result.frames, trajectory.len());
}
