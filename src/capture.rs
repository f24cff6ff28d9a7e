use crate::config::RecordFormat;
use crate::error::{Error, Result};
use image::{imageops, RgbaImage};
use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Largest side a GIF frame can have
const GIF_MAX_SIDE: u32 = u16::MAX as u32;

/// NeuQuant speed for GIF palette quantization (1 best, 30 fastest)
const GIF_QUANTIZE_SPEED: i32 = 10;

/// Milliseconds since the Unix epoch, for capture file names
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn is_blank(surface: &RgbaImage) -> bool {
    surface.as_raw().iter().all(|b| *b == 0)
}

/// Pick the frame to capture: the presented one, or the retained world
/// surface if the presented one is empty.
pub fn capture_source<'a>(
    presented: Option<&'a RgbaImage>,
    retained: Option<&'a RgbaImage>,
) -> Result<&'a RgbaImage> {
    presented
        .filter(|s| !is_blank(s))
        .or_else(|| retained.filter(|s| !is_blank(s)))
        .ok_or(Error::NothingToCapture)
}

/// Save `screenshot-<unix-ms>.png` in `dir`, flipped so row 0 is the top
pub fn save_screenshot(
    presented: Option<&RgbaImage>,
    retained: Option<&RgbaImage>,
    dir: &Path,
    stamp_ms: u128,
) -> Result<PathBuf> {
    let source = capture_source(presented, retained)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("screenshot-{}.png", stamp_ms));
    imageops::flip_vertical(source).save(&path)?;
    log::info!("screenshot saved to {}", path.display());
    Ok(path)
}

/// Fall back to GIF for containers that need an external video encoder
pub fn negotiate_format(requested: RecordFormat) -> RecordFormat {
    match requested {
        RecordFormat::Gif | RecordFormat::Png => requested,
        RecordFormat::Mp4 | RecordFormat::Webm => {
            log::warn!(
                "{} recording is not supported, falling back to gif",
                requested.name()
            );
            RecordFormat::Gif
        }
    }
}

/// Writer that tallies the bytes passing through it
struct CountingWriter<W> {
    inner: W,
    count: Rc<Cell<u64>>,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count.set(self.count.get() + written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

enum Sink {
    Gif(gif::Encoder<CountingWriter<BufWriter<File>>>),
    Png { dir: PathBuf },
}

/// Recording limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordLimits {
    pub duration_secs: f64,
    /// Bits per second
    pub bitrate: u64,
}

impl RecordLimits {
    /// Total encoded bytes allowed over the whole duration
    pub fn byte_budget(&self) -> u64 {
        (self.bitrate as f64 / 8.0 * self.duration_secs) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Duration,
    ByteBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Recording,
    Finished(StopReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub format: RecordFormat,
    pub frames: u32,
    pub bytes: u64,
}

/// An in-progress recording of presented frames
pub struct Recorder {
    sink: Sink,
    format: RecordFormat,
    path: PathBuf,
    size: (u32, u32),
    limits: RecordLimits,
    started_ms: f64,
    frame_delay_cs: u16,
    frames: u32,
    bytes: Rc<Cell<u64>>,
}

impl Recorder {
    /// Open `recording-<unix-ms>.gif` (or a frame directory) in `dir`
    pub fn start(
        dir: &Path,
        requested: RecordFormat,
        size: (u32, u32),
        target_fps: f32,
        limits: RecordLimits,
        now_ms: f64,
        stamp_ms: u128,
    ) -> Result<Self> {
        let format = negotiate_format(requested);
        let (width, height) = size;
        if width == 0 || height == 0 {
            return Err(Error::NothingToCapture);
        }
        fs::create_dir_all(dir)?;

        let bytes = Rc::new(Cell::new(0));
        let (sink, path) = match format {
            RecordFormat::Png => {
                let path = dir.join(format!("recording-{}", stamp_ms));
                fs::create_dir_all(&path)?;
                (Sink::Png { dir: path.clone() }, path)
            }
            _ => {
                if width > GIF_MAX_SIDE || height > GIF_MAX_SIDE {
                    return Err(Error::FrameTooLarge { width, height });
                }
                let path = dir.join(format!("recording-{}.gif", stamp_ms));
                let writer = CountingWriter {
                    inner: BufWriter::new(File::create(&path)?),
                    count: Rc::clone(&bytes),
                };
                let mut encoder = gif::Encoder::new(writer, width as u16, height as u16, &[])?;
                encoder.set_repeat(gif::Repeat::Infinite)?;
                (Sink::Gif(encoder), path)
            }
        };

        log::info!(
            "recording {} to {} ({}x{}, budget {} bytes)",
            format.name(),
            path.display(),
            width,
            height,
            limits.byte_budget()
        );
        Ok(Self {
            sink,
            format,
            path,
            size,
            limits,
            started_ms: now_ms,
            frame_delay_cs: (100.0 / target_fps.max(1.0)).round().max(2.0) as u16,
            frames: 0,
            bytes,
        })
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes.get()
    }

    pub fn elapsed_secs(&self, now_ms: f64) -> f64 {
        (now_ms - self.started_ms).max(0.0) / 1000.0
    }

    /// Encode one presented frame (row 0 at the bottom).
    ///
    /// Frames of a different size than the recording are skipped.
    pub fn push_frame(&mut self, frame: &RgbaImage, now_ms: f64) -> Result<RecordStatus> {
        if self.elapsed_secs(now_ms) >= self.limits.duration_secs {
            return Ok(RecordStatus::Finished(StopReason::Duration));
        }
        if frame.dimensions() != self.size {
            log::debug!("recording skipped a {:?} frame", frame.dimensions());
            return Ok(RecordStatus::Recording);
        }

        let flipped = imageops::flip_vertical(frame);
        match &mut self.sink {
            Sink::Gif(encoder) => {
                let mut pixels = flipped.into_raw();
                let mut gif_frame = gif::Frame::from_rgba_speed(
                    self.size.0 as u16,
                    self.size.1 as u16,
                    &mut pixels,
                    GIF_QUANTIZE_SPEED,
                );
                gif_frame.delay = self.frame_delay_cs;
                encoder.write_frame(&gif_frame)?;
            }
            Sink::Png { dir } => {
                let path = dir.join(format!("frame-{:05}.png", self.frames));
                flipped.save(&path)?;
                let len = fs::metadata(&path)?.len();
                self.bytes.set(self.bytes.get() + len);
            }
        }
        self.frames += 1;

        if self.bytes.get() >= self.limits.byte_budget() {
            return Ok(RecordStatus::Finished(StopReason::ByteBudget));
        }
        Ok(RecordStatus::Recording)
    }

    /// Close the file and report what was written
    pub fn finish(self) -> Result<RecordingSummary> {
        let Recorder {
            sink,
            format,
            path,
            frames,
            bytes,
            ..
        } = self;
        if let Sink::Gif(encoder) = sink {
            // writes the trailer; the flush must succeed or the file is truncated
            let counting = encoder.into_inner()?;
            counting.inner.into_inner().map_err(|e| e.into_error())?;
        }
        let summary = RecordingSummary {
            path,
            format,
            frames,
            bytes: bytes.get(),
        };
        log::info!(
            "recording saved to {} ({} frames, {} bytes)",
            summary.path.display(),
            summary.frames,
            summary.bytes
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Bottom row red, everything else blue
    fn frame(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |_, y| {
            if y == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    fn limits() -> RecordLimits {
        RecordLimits {
            duration_secs: 13.0,
            bitrate: 50_000_000,
        }
    }

    #[test]
    fn test_screenshot_is_flipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_screenshot(Some(&frame(4, 3)), None, dir.path(), 1234).unwrap();
        assert_eq!(path.file_name().unwrap(), "screenshot-1234.png");

        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved.get_pixel(0, 2).0, [255, 0, 0, 255]);
        assert_eq!(saved.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_screenshot_falls_back_to_retained() {
        let blank = RgbaImage::new(4, 3);
        let retained = frame(4, 3);
        let source = capture_source(Some(&blank), Some(&retained)).unwrap();
        assert_eq!(source, &retained);
    }

    #[test]
    fn test_nothing_to_capture() {
        let blank = RgbaImage::new(4, 3);
        assert!(matches!(
            capture_source(Some(&blank), Some(&blank)),
            Err(Error::NothingToCapture)
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(save_screenshot(None, None, dir.path(), 1).is_err());
    }

    #[test]
    fn test_video_formats_fall_back_to_gif() {
        assert_eq!(negotiate_format(RecordFormat::Mp4), RecordFormat::Gif);
        assert_eq!(negotiate_format(RecordFormat::Webm), RecordFormat::Gif);
        assert_eq!(negotiate_format(RecordFormat::Png), RecordFormat::Png);
    }

    #[test]
    fn test_byte_budget() {
        assert_eq!(limits().byte_budget(), 81_250_000);
    }

    #[test]
    fn test_gif_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder =
            Recorder::start(dir.path(), RecordFormat::Mp4, (8, 6), 60.0, limits(), 0.0, 77)
                .unwrap();
        assert_eq!(recorder.format(), RecordFormat::Gif);
        for i in 0..3 {
            let status = recorder.push_frame(&frame(8, 6), i as f64 * 16.0).unwrap();
            assert_eq!(status, RecordStatus::Recording);
        }
        let summary = recorder.finish().unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.path.file_name().unwrap(), "recording-77.gif");

        let bytes = std::fs::read(&summary.path).unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
        assert_eq!(summary.bytes, bytes.len() as u64);
    }

    #[cfg(unix)]
    #[test]
    fn test_finish_reports_write_failure() {
        if !Path::new("/dev/full").exists() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/dev/full", dir.path().join("recording-5.gif")).unwrap();

        let mut recorder =
            Recorder::start(dir.path(), RecordFormat::Gif, (4, 4), 60.0, limits(), 0.0, 5)
                .unwrap();
        recorder.push_frame(&frame(4, 4), 0.0).unwrap();
        assert!(recorder.finish().is_err());
    }

    #[test]
    fn test_recording_stops_at_duration() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder =
            Recorder::start(dir.path(), RecordFormat::Gif, (4, 4), 60.0, limits(), 1000.0, 1)
                .unwrap();
        recorder.push_frame(&frame(4, 4), 1000.0).unwrap();
        let status = recorder.push_frame(&frame(4, 4), 14_000.0).unwrap();
        assert_eq!(status, RecordStatus::Finished(StopReason::Duration));
        assert_eq!(recorder.frames(), 1);
    }

    #[test]
    fn test_recording_stops_at_byte_budget() {
        let dir = tempfile::tempdir().unwrap();
        let tiny = RecordLimits {
            duration_secs: 13.0,
            bitrate: 8,
        };
        let mut recorder =
            Recorder::start(dir.path(), RecordFormat::Png, (4, 4), 60.0, tiny, 0.0, 2).unwrap();
        let status = recorder.push_frame(&frame(4, 4), 0.0).unwrap();
        assert_eq!(status, RecordStatus::Finished(StopReason::ByteBudget));
        let summary = recorder.finish().unwrap();
        assert!(summary.path.join("frame-00000.png").exists());
    }

    #[test]
    fn test_mismatched_frame_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder =
            Recorder::start(dir.path(), RecordFormat::Png, (4, 4), 60.0, limits(), 0.0, 3).unwrap();
        recorder.push_frame(&frame(5, 4), 0.0).unwrap();
        assert_eq!(recorder.frames(), 0);
    }

    #[test]
    fn test_oversized_gif_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = Recorder::start(
            dir.path(),
            RecordFormat::Gif,
            (70_000, 10),
            60.0,
            limits(),
            0.0,
            4,
        );
        assert!(matches!(result, Err(Error::FrameTooLarge { .. })));
    }
}
