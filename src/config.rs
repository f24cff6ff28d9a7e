use crate::brush::{Direction, Mode};
use crate::error::{Error, Result};
use crate::scheduler::{DEFAULT_FPS_WINDOW_MS, MAX_TARGET_FPS, MIN_TARGET_FPS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "fluxpaint";

pub const MIN_PIXEL_DENSITY: u32 = 1;
pub const MAX_PIXEL_DENSITY: u32 = 4;

/// Recording container requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    #[default]
    Gif,
    /// Directory of numbered PNG frames
    Png,
    Mp4,
    Webm,
}

impl RecordFormat {
    pub fn name(&self) -> &str {
        match self {
            RecordFormat::Gif => "gif",
            RecordFormat::Png => "png",
            RecordFormat::Mp4 => "mp4",
            RecordFormat::Webm => "webm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gif" => Some(RecordFormat::Gif),
            "png" | "frames" => Some(RecordFormat::Png),
            "mp4" => Some(RecordFormat::Mp4),
            "webm" => Some(RecordFormat::Webm),
            _ => None,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    pub target_fps: f32,
    /// Surface pixels per terminal column (rows get twice as many)
    pub pixel_density: u32,
    /// Window for the observed FPS counter
    pub fps_window_ms: f64,
    pub record_duration_secs: f64,
    /// Encoded bits per second allowed for a recording
    pub record_bitrate: u64,
    pub record_format: RecordFormat,
    /// Where screenshots and recordings go; the working directory if unset
    pub output_dir: Option<PathBuf>,
    pub start_mode: Mode,
    pub start_direction: Direction,
    pub manual_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            target_fps: 60.0,
            pixel_density: 2,
            fps_window_ms: DEFAULT_FPS_WINDOW_MS,
            record_duration_secs: 13.0,
            record_bitrate: 50_000_000,
            record_format: RecordFormat::Gif,
            output_dir: None,
            start_mode: Mode::Waterfall,
            start_direction: Direction::Down,
            manual_mode: false,
        }
    }
}

impl AppConfig {
    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    /// Import config from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.sanitized())
    }

    /// `<config_dir>/fluxpaint/config.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the explicitly given file, or the default one if it exists.
    ///
    /// An explicit path must load; a broken default file is logged and
    /// ignored.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match Self::default_path().filter(|p| p.exists()) {
            Some(path) => match Self::load_from_file(&path) {
                Ok(config) => Ok(config),
                Err(e) => {
                    log::warn!("ignoring default config: {}", e);
                    Ok(Self::default())
                }
            },
            None => Ok(Self::default()),
        }
    }

    /// Clamp values into their usable ranges
    pub fn sanitized(mut self) -> Self {
        self.pixel_density = self.pixel_density.clamp(MIN_PIXEL_DENSITY, MAX_PIXEL_DENSITY);
        if !(self.target_fps.is_finite() && self.target_fps >= MIN_TARGET_FPS) {
            self.target_fps = MIN_TARGET_FPS;
        }
        self.target_fps = self.target_fps.min(MAX_TARGET_FPS);
        if !(self.fps_window_ms.is_finite() && self.fps_window_ms > 0.0) {
            self.fps_window_ms = DEFAULT_FPS_WINDOW_MS;
        }
        if !(self.record_duration_secs.is_finite() && self.record_duration_secs > 0.0) {
            self.record_duration_secs = 13.0;
        }
        self
    }

    /// Directory for captures
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
