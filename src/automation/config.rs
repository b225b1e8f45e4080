//! Configuration for capture, matching and click dispatch

use std::fmt;
use std::time::Duration;

use super::error::{ClickerError, ClickerResult};
use crate::platform::{ScreenPoint, ScreenRect, WindowHandle};
use crate::template_matching::{MatchMethod, TemplateSet};

/// How an accepted match is turned into a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Move the real pointer and click; focuses whatever is under the cursor.
    #[default]
    SyntheticGlobalClick,
    /// Queue button messages on the target window without moving the pointer.
    WindowMessageInjection,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::SyntheticGlobalClick => write!(f, "Mouse"),
            DispatchMode::WindowMessageInjection => write!(f, "Background"),
        }
    }
}

/// Decision and dispatch settings. Replaced as a whole while running.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Minimum score for a click (0.0 to 1.0]
    pub confidence_threshold: f32,
    /// Minimum time between two clicks on the same template
    pub cooldown: Duration,
    /// Click every template that clears the threshold, not only the first
    pub allow_multiple_clicks: bool,
    pub dispatch_mode: DispatchMode,
    /// Window tracked for window-relative capture and background clicks
    pub target_window: Option<WindowHandle>,
    /// Emit annotated copies of every frame
    pub debug_frames: bool,
    pub match_method: MatchMethod,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            cooldown: Duration::from_secs(1),
            allow_multiple_clicks: false,
            dispatch_mode: DispatchMode::SyntheticGlobalClick,
            target_window: None,
            debug_frames: false,
            match_method: MatchMethod::default(),
        }
    }
}

impl DispatchConfig {
    /// Convert a user-facing interval in seconds.
    pub fn cooldown_from_secs(secs: f64) -> ClickerResult<Duration> {
        Duration::try_from_secs_f64(secs).map_err(|_| ClickerError::InvalidCooldown { value: secs })
    }

    /// Check the fields that do not depend on the capture target.
    pub fn validate(&self, capture_mode: CaptureMode) -> ClickerResult<()> {
        let t = self.confidence_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(ClickerError::InvalidThreshold { value: t });
        }
        if self.target_window.is_none() {
            if self.dispatch_mode == DispatchMode::WindowMessageInjection {
                return Err(ClickerError::MissingTargetWindow {
                    operation: "Background click",
                });
            }
            if capture_mode == CaptureMode::WindowRelative {
                return Err(ClickerError::MissingTargetWindow {
                    operation: "Window capture",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    FixedRegion,
    WindowRelative,
}

impl CaptureMode {
    fn label(&self) -> &'static str {
        match self {
            CaptureMode::FixedRegion => "region",
            CaptureMode::WindowRelative => "window",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sub-rectangle relative to a window's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeRect {
    pub dx: i32,
    pub dy: i32,
    pub width: u32,
    pub height: u32,
}

impl RelativeRect {
    pub fn new(dx: i32, dy: i32, width: u32, height: u32) -> Self {
        Self {
            dx,
            dy,
            width,
            height,
        }
    }

    /// Absolute rectangle for a window whose origin is `origin`.
    pub fn at(&self, origin: ScreenPoint) -> ScreenRect {
        ScreenRect::new(
            origin.x.saturating_add(self.dx),
            origin.y.saturating_add(self.dy),
            self.width,
            self.height,
        )
    }
}

impl fmt::Display for RelativeRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.dx, self.dy, self.width, self.height)
    }
}

/// A capture rectangle before desktop clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalRegion {
    /// Absolute screen pixels
    Fixed(ScreenRect),
    /// Offset from the tracked window's top-left corner
    Relative(RelativeRect),
}

impl LogicalRegion {
    pub fn mode(&self) -> CaptureMode {
        match self {
            LogicalRegion::Fixed(_) => CaptureMode::FixedRegion,
            LogicalRegion::Relative(_) => CaptureMode::WindowRelative,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            LogicalRegion::Fixed(r) => r.is_empty(),
            LogicalRegion::Relative(r) => r.width == 0 || r.height == 0,
        }
    }
}

impl fmt::Display for LogicalRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalRegion::Fixed(r) => write!(f, "Rect: {r}"),
            LogicalRegion::Relative(r) => write!(f, "Rel: {r}"),
        }
    }
}

/// What to capture each frame.
///
/// A `None` region means "not configured": the whole virtual desktop in
/// fixed-region mode, the whole window in window-relative mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureConfig {
    pub mode: CaptureMode,
    pub region: Option<LogicalRegion>,
}

impl CaptureConfig {
    pub fn fixed(region: Option<ScreenRect>) -> Self {
        Self {
            mode: CaptureMode::FixedRegion,
            region: region.map(LogicalRegion::Fixed),
        }
    }

    pub fn window(region: Option<RelativeRect>) -> Self {
        Self {
            mode: CaptureMode::WindowRelative,
            region: region.map(LogicalRegion::Relative),
        }
    }

    /// Switch to the region's mode; the previous region is discarded.
    pub fn set_region(&mut self, region: LogicalRegion) {
        self.mode = region.mode();
        self.region = Some(region);
    }

    /// Switch capture mode, clearing a region that belongs to the other mode.
    pub fn set_mode(&mut self, mode: CaptureMode) {
        if self.mode != mode {
            self.mode = mode;
            self.region = None;
        }
    }

    pub fn validate(&self) -> ClickerResult<()> {
        if let Some(region) = &self.region {
            if region.mode() != self.mode {
                return Err(ClickerError::RegionModeMismatch {
                    region: region.mode().label(),
                    mode: self.mode.label(),
                });
            }
            if region.is_empty() {
                return Err(ClickerError::EmptySelection);
            }
        }
        Ok(())
    }
}

/// Cadence of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    /// Target iteration period
    pub frame_period: Duration,
    /// Wait while the tracked window is minimized
    pub minimized_retry: Duration,
    /// Wait while the capture rectangle is off the desktop
    pub out_of_bounds_retry: Duration,
    /// Wait after a failed iteration
    pub error_retry: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            frame_period: Duration::from_millis(33),
            minimized_retry: Duration::from_secs(1),
            out_of_bounds_retry: Duration::from_millis(100),
            error_retry: Duration::from_secs(1),
        }
    }
}

/// Everything a control loop run needs besides templates and the platform.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub dispatch: DispatchConfig,
    pub capture: CaptureConfig,
    pub timing: LoopTiming,
}

impl RunConfig {
    pub fn new(dispatch: DispatchConfig, capture: CaptureConfig) -> Self {
        Self {
            dispatch,
            capture,
            timing: LoopTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: LoopTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Reject configurations that cannot be started.
    pub fn validate(&self, templates: &TemplateSet) -> ClickerResult<()> {
        if templates.is_empty() {
            return Err(ClickerError::EmptyTemplateSet);
        }
        self.capture.validate()?;
        self.dispatch.validate(self.capture.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_matching::Template;
    use image::RgbImage;

    fn one_template() -> TemplateSet {
        let mut set = TemplateSet::new();
        set.push(Template::from_image("t.png", RgbImage::new(2, 2)).unwrap());
        set
    }

    #[test]
    fn test_dispatch_config_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.confidence_threshold, 0.8);
        assert_eq!(config.cooldown, Duration::from_secs(1));
        assert!(!config.allow_multiple_clicks);
        assert_eq!(config.dispatch_mode, DispatchMode::SyntheticGlobalClick);
        assert!(!config.debug_frames);
    }

    #[test]
    fn test_empty_template_set_rejected() {
        let err = RunConfig::default().validate(&TemplateSet::new()).unwrap_err();
        assert!(matches!(err, ClickerError::EmptyTemplateSet));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_background_click_requires_window() {
        let run = RunConfig::new(
            DispatchConfig {
                dispatch_mode: DispatchMode::WindowMessageInjection,
                ..Default::default()
            },
            CaptureConfig::default(),
        );
        let err = run.validate(&one_template()).unwrap_err();
        assert!(matches!(err, ClickerError::MissingTargetWindow { .. }));
    }

    #[test]
    fn test_window_capture_requires_window() {
        let run = RunConfig::new(DispatchConfig::default(), CaptureConfig::window(None));
        assert!(run.validate(&one_template()).is_err());

        let run = RunConfig::new(
            DispatchConfig {
                target_window: Some(WindowHandle(3)),
                ..Default::default()
            },
            CaptureConfig::window(None),
        );
        assert!(run.validate(&one_template()).is_ok());
    }

    #[test]
    fn test_threshold_range() {
        for bad in [0.0, -0.5, 1.01, f32::NAN] {
            let config = DispatchConfig {
                confidence_threshold: bad,
                ..Default::default()
            };
            assert!(config.validate(CaptureMode::FixedRegion).is_err(), "{bad}");
        }
        let config = DispatchConfig {
            confidence_threshold: 1.0,
            ..Default::default()
        };
        assert!(config.validate(CaptureMode::FixedRegion).is_ok());
    }

    #[test]
    fn test_cooldown_from_secs() {
        assert_eq!(
            DispatchConfig::cooldown_from_secs(0.25).unwrap(),
            Duration::from_millis(250)
        );
        assert!(DispatchConfig::cooldown_from_secs(-1.0).is_err());
        assert!(DispatchConfig::cooldown_from_secs(f64::INFINITY).is_err());
    }

    #[test]
    fn test_switching_mode_clears_region() {
        let mut capture = CaptureConfig::fixed(Some(ScreenRect::new(1, 2, 3, 4)));
        capture.set_mode(CaptureMode::WindowRelative);
        assert_eq!(capture.region, None);

        capture.set_region(LogicalRegion::Fixed(ScreenRect::new(0, 0, 5, 5)));
        assert_eq!(capture.mode, CaptureMode::FixedRegion);
        capture.set_region(LogicalRegion::Relative(RelativeRect::new(1, 1, 2, 2)));
        assert_eq!(capture.mode, CaptureMode::WindowRelative);
        assert_eq!(
            capture.region,
            Some(LogicalRegion::Relative(RelativeRect::new(1, 1, 2, 2)))
        );
    }

    #[test]
    fn test_region_mode_mismatch_rejected() {
        let capture = CaptureConfig {
            mode: CaptureMode::FixedRegion,
            region: Some(LogicalRegion::Relative(RelativeRect::new(0, 0, 5, 5))),
        };
        assert!(matches!(
            capture.validate(),
            Err(ClickerError::RegionModeMismatch { .. })
        ));
    }

    #[test]
    fn test_relative_rect_at_origin() {
        let rel = RelativeRect::new(10, -5, 30, 40);
        assert_eq!(rel.at(ScreenPoint::new(100, 200)), ScreenRect::new(110, 195, 30, 40));
    }
}
