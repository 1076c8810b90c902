//! Video sinks.
//!
//! Both writers stage their output under a hidden `.<name>.partial` path and
//! only rename it to the final name in [`VideoSink::finish`], so a run that
//! aborts half way never leaves a truncated video that looks complete.

use crate::error::BackendError;
use crate::scene::VideoSink;
use image::RgbImage;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Hidden staging path next to `path`.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

/// Rational representation of a framerate for the Y4M header.
///
/// Returns `None` when the rate is not representable as `N:1` or `N:1000`
/// with a non-zero 32-bit numerator.
fn framerate_ratio(framerate: f64) -> Option<(u64, u64)> {
    if !framerate.is_finite() || framerate <= 0.0 {
        return None;
    }

    let (num, den) = if framerate.fract() == 0.0 {
        (framerate, 1)
    } else {
        ((framerate * 1000.0).round(), 1000)
    };
    if num < 1.0 || num > u32::MAX as f64 {
        return None;
    }
    Some((num as u64, den))
}

fn check_frame_size(frame: &RgbImage, width: u32, height: u32) -> Result<(), BackendError> {
    if frame.width() != width || frame.height() != height {
        return Err(BackendError::FrameSize {
            expected_width: width,
            expected_height: height,
            width: frame.width(),
            height: frame.height(),
        });
    }
    Ok(())
}

// =============================================================================
// Y4M
// =============================================================================

/// Uncompressed YUV4MPEG2 writer (4:4:4, progressive, full-range BT.601).
pub struct Y4mWriter {
    path: PathBuf,
    staging: PathBuf,
    writer: Option<BufWriter<File>>,
    width: u32,
    height: u32,
    frames: u64,
    /// Scratch plane buffer reused across frames
    planes: Vec<u8>,
}

impl Y4mWriter {
    /// Creates the staging file and writes the stream header.
    pub fn create(path: &Path, width: u32, height: u32, framerate: f64) -> Result<Self, BackendError> {
        let (num, den) = framerate_ratio(framerate)
            .ok_or_else(|| BackendError::Encode(format!("unsupported Y4M framerate {}", framerate)))?;

        let staging = partial_path(path);
        let mut writer = BufWriter::new(File::create(&staging)?);
        writeln!(writer, "YUV4MPEG2 W{} H{} F{}:{} Ip A1:1 C444", width, height, num, den)?;

        debug!("Opened Y4M stream {} ({}x{} @ {}:{})", path.display(), width, height, num, den);

        Ok(Self {
            path: path.to_path_buf(),
            staging,
            writer: Some(writer),
            width,
            height,
            frames: 0,
            planes: Vec::new(),
        })
    }
}

impl VideoSink for Y4mWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), BackendError> {
        check_frame_size(frame, self.width, self.height)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BackendError::Encode(format!("{} already finished", self.path.display())))?;

        let n = self.width as usize * self.height as usize;
        self.planes.clear();
        self.planes.resize(n * 3, 0);
        for (i, px) in frame.pixels().enumerate() {
            let [r, g, b] = px.0.map(f64::from);
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            let cb = 128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b;
            let cr = 128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b;
            self.planes[i] = y.round().clamp(0.0, 255.0) as u8;
            self.planes[n + i] = cb.round().clamp(0.0, 255.0) as u8;
            self.planes[2 * n + i] = cr.round().clamp(0.0, 255.0) as u8;
        }

        writer.write_all(b"FRAME\n")?;
        writer.write_all(&self.planes)?;
        self.frames += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            drop(writer);
            fs::rename(&self.staging, &self.path)?;
            debug!("Finalized {} ({} frames)", self.path.display(), self.frames);
        }
        Ok(())
    }
}

// =============================================================================
// PNG SEQUENCE
// =============================================================================

/// Writes each frame as `frame_NNNNNN.png` inside a per-camera directory.
pub struct PngSequenceWriter {
    path: PathBuf,
    staging: PathBuf,
    width: u32,
    height: u32,
    frames: u64,
    finished: bool,
}

impl PngSequenceWriter {
    /// Creates the (empty) staging directory.
    pub fn create(path: &Path, width: u32, height: u32) -> Result<Self, BackendError> {
        let staging = partial_path(path);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        Ok(Self {
            path: path.to_path_buf(),
            staging,
            width,
            height,
            frames: 0,
            finished: false,
        })
    }
}

impl VideoSink for PngSequenceWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), BackendError> {
        check_frame_size(frame, self.width, self.height)?;
        if self.finished {
            return Err(BackendError::Encode(format!("{} already finished", self.path.display())));
        }

        let file = self.staging.join(format!("frame_{:06}.png", self.frames));
        frame.save(&file)?;
        self.frames += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        if self.finished {
            return Ok(());
        }
        if self.path.exists() {
            fs::remove_dir_all(&self.path)?;
        }
        fs::rename(&self.staging, &self.path)?;
        self.finished = true;
        debug!("Finalized {} ({} frames)", self.path.display(), self.frames);
        Ok(())
    }
}

/// Either of the built-in sinks, selected at runtime from the run configuration.
pub enum AnyVideoSink {
    Y4m(Y4mWriter),
    Png(PngSequenceWriter),
}

impl VideoSink for AnyVideoSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), BackendError> {
        match self {
            AnyVideoSink::Y4m(sink) => sink.write_frame(frame),
            AnyVideoSink::Png(sink) => sink.write_frame(frame),
        }
    }

    fn frames_written(&self) -> u64 {
        match self {
            AnyVideoSink::Y4m(sink) => sink.frames_written(),
            AnyVideoSink::Png(sink) => sink.frames_written(),
        }
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        match self {
            AnyVideoSink::Y4m(sink) => sink.finish(),
            AnyVideoSink::Png(sink) => sink.finish(),
        }
    }
}
