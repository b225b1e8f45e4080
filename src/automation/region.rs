//! Coordinate mapping between user selections, logical regions and the
//! physical desktop

use super::config::{CaptureMode, LogicalRegion, RelativeRect};
use super::error::{ClickerError, ClickerResult};
use crate::platform::{ScreenPoint, ScreenRect};

/// A rectangle drawn by the user, in UI points (before DPI scaling).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl UiRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two drag corners given in any order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            width: (a.0 - b.0).abs(),
            height: (a.1 - b.1).abs(),
        }
    }
}

/// Scale and truncate one coordinate to physical pixels.
fn to_physical(value: f64, scale: f64) -> i64 {
    let scaled = value * scale;
    if scaled.is_finite() {
        scaled.trunc() as i64
    } else {
        0
    }
}

/// Turn a user selection into a logical region.
///
/// Coordinates are multiplied by `scale` and truncated. In window-relative
/// mode the window origin (already in physical pixels) is subtracted; a
/// missing origin means the window could not be resolved.
pub fn to_logical(
    user: UiRect,
    scale: f64,
    mode: CaptureMode,
    reference_origin: Option<ScreenPoint>,
) -> ClickerResult<LogicalRegion> {
    let x = to_physical(user.x, scale);
    let y = to_physical(user.y, scale);
    let width = to_physical(user.width, scale);
    let height = to_physical(user.height, scale);

    let width = u32::try_from(width).map_err(|_| ClickerError::EmptySelection)?;
    let height = u32::try_from(height).map_err(|_| ClickerError::EmptySelection)?;
    if width == 0 || height == 0 {
        return Err(ClickerError::EmptySelection);
    }

    match mode {
        CaptureMode::FixedRegion => Ok(LogicalRegion::Fixed(ScreenRect::new(
            clamp_i32(x),
            clamp_i32(y),
            width,
            height,
        ))),
        CaptureMode::WindowRelative => {
            let origin = reference_origin.ok_or(ClickerError::WindowNotFound)?;
            Ok(LogicalRegion::Relative(RelativeRect::new(
                clamp_i32(x - origin.x as i64),
                clamp_i32(y - origin.y as i64),
                width,
                height,
            )))
        }
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Absolute rectangle for a logical region.
///
/// `window` is the tracked window's current rectangle and is required for
/// relative regions.
pub fn to_absolute(region: &LogicalRegion, window: Option<ScreenRect>) -> Option<ScreenRect> {
    match region {
        LogicalRegion::Fixed(rect) => Some(*rect),
        LogicalRegion::Relative(rel) => window.map(|w| rel.at(w.origin())),
    }
}

/// Intersection with the virtual desktop, `None` when nothing is visible.
pub fn clip_to_desktop(rect: ScreenRect, desktop: ScreenRect) -> Option<ScreenRect> {
    rect.intersect(&desktop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_round_trip_at_unit_scale() {
        let user = UiRect::new(100.0, 50.0, 300.0, 200.0);
        let region = to_logical(user, 1.0, CaptureMode::FixedRegion, None).unwrap();
        let rect = to_absolute(&region, None).unwrap();
        assert_eq!(rect, ScreenRect::new(100, 50, 300, 200));
    }

    #[test]
    fn test_scale_truncates() {
        let user = UiRect::new(10.0, 11.0, 101.0, 33.0);
        let region = to_logical(user, 1.5, CaptureMode::FixedRegion, None).unwrap();
        // 16.5 -> 16, 151.5 -> 151, 49.5 -> 49
        assert_eq!(region, LogicalRegion::Fixed(ScreenRect::new(15, 16, 151, 49)));
    }

    #[test]
    fn test_window_relative_subtracts_origin() {
        let user = UiRect::new(220.0, 130.0, 40.0, 30.0);
        let region = to_logical(
            user,
            1.0,
            CaptureMode::WindowRelative,
            Some(ScreenPoint::new(200, 100)),
        )
        .unwrap();
        assert_eq!(region, LogicalRegion::Relative(RelativeRect::new(20, 30, 40, 30)));

        let moved = ScreenRect::new(500, 400, 800, 600);
        assert_eq!(
            to_absolute(&region, Some(moved)),
            Some(ScreenRect::new(520, 430, 40, 30))
        );
    }

    #[test]
    fn test_window_relative_without_window() {
        let user = UiRect::new(0.0, 0.0, 10.0, 10.0);
        let err = to_logical(user, 1.0, CaptureMode::WindowRelative, None).unwrap_err();
        assert!(matches!(err, ClickerError::WindowNotFound));
        assert_eq!(err.to_string(), "Error: Window not found");
    }

    #[test]
    fn test_empty_selection_rejected() {
        let user = UiRect::from_corners((10.0, 10.0), (10.0, 50.0));
        assert!(matches!(
            to_logical(user, 1.0, CaptureMode::FixedRegion, None),
            Err(ClickerError::EmptySelection)
        ));
        let tiny = UiRect::new(0.0, 0.0, 0.4, 10.0);
        assert!(to_logical(tiny, 2.0, CaptureMode::FixedRegion, None).is_err());
    }

    #[test]
    fn test_from_corners_normalizes() {
        let rect = UiRect::from_corners((50.0, 80.0), (10.0, 20.0));
        assert_eq!(rect, UiRect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_clip_to_desktop() {
        let desktop = ScreenRect::new(-1280, 0, 3200, 1080);
        assert_eq!(
            clip_to_desktop(ScreenRect::new(-1300, -10, 100, 100), desktop),
            Some(ScreenRect::new(-1280, 0, 80, 90))
        );
        assert_eq!(clip_to_desktop(ScreenRect::new(5000, 0, 10, 10), desktop), None);
    }
}
