//! Persisted run settings (JSON)
//!
//! Every key is optional; missing keys fall back to the defaults of the
//! control loop configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::automation::{
    CaptureConfig, CaptureMode, ClickerError, DispatchConfig, DispatchMode, LogicalRegion,
    RelativeRect,
};
use crate::platform::{ScreenRect, WindowHandle};

pub const DEFAULT_SETTINGS_FILE: &str = "clicker_settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read or write settings {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to encode settings: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Setting '{key}' has an empty or negative size: {value:?}")]
    InvalidRegion { key: &'static str, value: [i32; 4] },

    #[error(transparent)]
    Invalid(#[from] ClickerError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Track a window instead of a fixed screen region
    pub use_window: bool,
    /// Title (or title fragment) of the tracked window
    pub window_title: Option<String>,
    /// Fixed region `[x, y, width, height]` in screen pixels
    pub region: Option<[i32; 4]>,
    /// Window-relative region `[dx, dy, width, height]`
    pub relative_region: Option<[i32; 4]>,
    pub confidence: f32,
    /// Per-template click cooldown in seconds
    pub interval: f64,
    pub multi: bool,
    /// Click through window messages instead of the real pointer
    pub background: bool,
    pub debug: bool,
    /// UI language of the desktop front end, kept for round trips
    pub lang: String,
    /// Template image paths, in match order
    pub images: Vec<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        let dispatch = DispatchConfig::default();
        Self {
            use_window: false,
            window_title: None,
            region: None,
            relative_region: None,
            confidence: dispatch.confidence_threshold,
            interval: dispatch.cooldown.as_secs_f64(),
            multi: dispatch.allow_multiple_clicks,
            background: false,
            debug: false,
            lang: "EN".to_string(),
            images: Vec::new(),
        }
    }
}

fn size_of(key: &'static str, value: [i32; 4]) -> Result<(u32, u32), SettingsError> {
    match (u32::try_from(value[2]), u32::try_from(value[3])) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(SettingsError::InvalidRegion { key, value }),
    }
}

impl RunSettings {
    /// Read settings from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No settings at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Write settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(SettingsError::Encode)?;
        std::fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn capture_config(&self) -> Result<CaptureConfig, SettingsError> {
        if self.use_window {
            let region = match self.relative_region {
                Some(v) => {
                    let (w, h) = size_of("relative_region", v)?;
                    Some(RelativeRect::new(v[0], v[1], w, h))
                }
                None => None,
            };
            Ok(CaptureConfig::window(region))
        } else {
            let region = match self.region {
                Some(v) => {
                    let (w, h) = size_of("region", v)?;
                    Some(ScreenRect::new(v[0], v[1], w, h))
                }
                None => None,
            };
            Ok(CaptureConfig::fixed(region))
        }
    }

    pub fn dispatch_config(
        &self,
        target_window: Option<WindowHandle>,
    ) -> Result<DispatchConfig, SettingsError> {
        Ok(DispatchConfig {
            confidence_threshold: self.confidence,
            cooldown: DispatchConfig::cooldown_from_secs(self.interval)?,
            allow_multiple_clicks: self.multi,
            dispatch_mode: if self.background {
                DispatchMode::WindowMessageInjection
            } else {
                DispatchMode::SyntheticGlobalClick
            },
            target_window,
            debug_frames: self.debug,
            ..Default::default()
        })
    }

    /// Record a capture config; the region of the other mode is cleared.
    pub fn set_capture(&mut self, capture: &CaptureConfig) {
        self.use_window = capture.mode == CaptureMode::WindowRelative;
        self.region = None;
        self.relative_region = None;
        match capture.region {
            Some(LogicalRegion::Fixed(r)) => {
                self.region = Some([r.x, r.y, r.width as i32, r.height as i32]);
            }
            Some(LogicalRegion::Relative(r)) => {
                self.relative_region = Some([r.dx, r.dy, r.width as i32, r.height as i32]);
            }
            None => {}
        }
    }

    /// Record the dispatch values that are persisted.
    pub fn set_dispatch(&mut self, dispatch: &DispatchConfig) {
        self.confidence = dispatch.confidence_threshold;
        self.interval = dispatch.cooldown.as_secs_f64();
        self.multi = dispatch.allow_multiple_clicks;
        self.background = dispatch.dispatch_mode == DispatchMode::WindowMessageInjection;
        self.debug = dispatch.debug_frames;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_keys_use_defaults() {
        let settings: RunSettings = serde_json::from_str(r#"{"confidence": 0.9}"#).unwrap();
        assert_eq!(settings.confidence, 0.9);
        assert_eq!(settings.interval, 1.0);
        assert!(!settings.use_window);
        assert!(settings.images.is_empty());
    }

    #[test]
    fn test_reads_desktop_front_end_layout() {
        let json = r#"{
            "use_window": true,
            "region": null,
            "relative_region": [10, 20, 300, 200],
            "confidence": 0.85,
            "interval": 0.5,
            "multi": true,
            "debug": false,
            "lang": "RU",
            "images": ["a.png", "b.png"]
        }"#;
        let settings: RunSettings = serde_json::from_str(json).unwrap();

        let capture = settings.capture_config().unwrap();
        assert_eq!(capture.mode, CaptureMode::WindowRelative);
        assert_eq!(
            capture.region,
            Some(LogicalRegion::Relative(RelativeRect::new(10, 20, 300, 200)))
        );

        let dispatch = settings.dispatch_config(Some(WindowHandle(9))).unwrap();
        assert_eq!(dispatch.cooldown, Duration::from_millis(500));
        assert!(dispatch.allow_multiple_clicks);
        assert_eq!(dispatch.target_window, Some(WindowHandle(9)));
        assert_eq!(settings.images.len(), 2);
    }

    #[test]
    fn test_negative_region_rejected() {
        let settings = RunSettings {
            region: Some([0, 0, -5, 10]),
            ..Default::default()
        };
        assert!(matches!(
            settings.capture_config(),
            Err(SettingsError::InvalidRegion { key: "region", .. })
        ));
    }

    #[test]
    fn test_negative_interval_rejected() {
        let settings = RunSettings {
            interval: -1.0,
            ..Default::default()
        };
        assert!(settings.dispatch_config(None).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);

        let mut settings = RunSettings::default();
        settings.set_capture(&CaptureConfig::fixed(Some(ScreenRect::new(5, 6, 70, 80))));
        settings.images.push(PathBuf::from("ok.png"));
        settings.save(&path).unwrap();

        let loaded = RunSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.region, Some([5, 6, 70, 80]));
        assert_eq!(loaded.relative_region, None);
    }

    #[test]
    fn test_unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(RunSettings::load(&path), Err(SettingsError::Parse { .. })));
        assert_eq!(RunSettings::load_or_default(&path), RunSettings::default());
        assert_eq!(
            RunSettings::load_or_default(dir.path().join("missing.json")),
            RunSettings::default()
        );
    }
}
