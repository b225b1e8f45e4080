//! Monitor, window and pixel access backed by `xcap`

use image::{DynamicImage, RgbImage, imageops};
use xcap::{Monitor, Window};

use super::error::{PlatformError, PlatformResult};
use super::types::{Desktop, ScreenRect, WindowHandle, WindowInfo, WindowState};

/// Desktop implementation over the native window server.
#[derive(Debug, Clone, Copy, Default)]
pub struct XcapDesktop;

impl XcapDesktop {
    pub fn new() -> Self {
        Self
    }

    fn monitors() -> PlatformResult<Vec<Monitor>> {
        let monitors = Monitor::all().map_err(|e| PlatformError::MonitorEnumerationFailed {
            description: e.to_string(),
        })?;
        if monitors.is_empty() {
            return Err(PlatformError::NoMonitors);
        }
        Ok(monitors)
    }

    fn monitor_rect(monitor: &Monitor) -> ScreenRect {
        ScreenRect::new(monitor.x(), monitor.y(), monitor.width(), monitor.height())
    }

    fn windows() -> PlatformResult<Vec<Window>> {
        Window::all().map_err(|e| PlatformError::WindowEnumerationFailed {
            description: e.to_string(),
        })
    }

    /// Copy the part of `monitor` covered by `part` into `frame`, where
    /// `frame` starts at `origin`.
    fn blit_monitor(
        monitor: &Monitor,
        part: ScreenRect,
        frame: &mut RgbImage,
        origin: (i32, i32),
    ) -> PlatformResult<()> {
        let shot = monitor.capture_image().map_err(PlatformError::capture)?;
        let shot = DynamicImage::ImageRgba8(shot).to_rgb8();
        let bounds = Self::monitor_rect(monitor);

        // Some window servers report monitor geometry in logical points while
        // the captured image is in physical pixels.
        let scale_x = shot.width() as f64 / bounds.width.max(1) as f64;
        let scale_y = shot.height() as f64 / bounds.height.max(1) as f64;

        let src_x = ((part.x - bounds.x) as f64 * scale_x).round() as u32;
        let src_y = ((part.y - bounds.y) as f64 * scale_y).round() as u32;
        let src_w = ((part.width as f64 * scale_x).round() as u32)
            .min(shot.width().saturating_sub(src_x));
        let src_h = ((part.height as f64 * scale_y).round() as u32)
            .min(shot.height().saturating_sub(src_y));
        if src_w == 0 || src_h == 0 {
            return Ok(());
        }

        let mut piece = imageops::crop_imm(&shot, src_x, src_y, src_w, src_h).to_image();
        if piece.width() != part.width || piece.height() != part.height {
            piece = imageops::resize(
                &piece,
                part.width,
                part.height,
                imageops::FilterType::Nearest,
            );
        }

        imageops::replace(
            frame,
            &piece,
            (part.x - origin.0) as i64,
            (part.y - origin.1) as i64,
        );
        Ok(())
    }
}

impl Desktop for XcapDesktop {
    fn window_state(&self, handle: WindowHandle) -> PlatformResult<WindowState> {
        let windows = Self::windows()?;

        Ok(match windows.iter().find(|w| w.id() as u64 == handle.0) {
            None => WindowState::Lost,
            Some(window) if window.is_minimized() => WindowState::Minimized,
            Some(window) => {
                WindowState::Visible(ScreenRect::new(window.x(), window.y(), window.width(), window.height()))
            }
        })
    }

    fn virtual_desktop(&self) -> PlatformResult<ScreenRect> {
        let monitors = Self::monitors()?;
        let mut rects = monitors.iter().map(Self::monitor_rect);
        let first = rects.next().ok_or(PlatformError::NoMonitors)?;
        Ok(rects.fold(first, |acc, r| acc.union(&r)))
    }

    fn grab(&self, rect: ScreenRect) -> PlatformResult<RgbImage> {
        if rect.is_empty() {
            return Err(PlatformError::capture(format!("empty capture rectangle {rect}")));
        }

        let mut frame = RgbImage::new(rect.width, rect.height);
        let mut covered = false;
        for monitor in Self::monitors()? {
            if let Some(part) = rect.intersect(&Self::monitor_rect(&monitor)) {
                Self::blit_monitor(&monitor, part, &mut frame, (rect.x, rect.y))?;
                covered = true;
            }
        }

        if !covered {
            return Err(PlatformError::capture(format!("{rect} is not on any monitor")));
        }
        Ok(frame)
    }

    fn list_windows(&self) -> PlatformResult<Vec<WindowInfo>> {
        let mut windows: Vec<WindowInfo> = Self::windows()?
            .iter()
            .filter(|w| !w.is_minimized() && !w.title().is_empty())
            .filter(|w| w.width() > 0 && w.height() > 0)
            .map(|w| WindowInfo {
                handle: WindowHandle(w.id() as u64),
                title: w.title().to_string(),
                rect: ScreenRect::new(w.x(), w.y(), w.width(), w.height()),
            })
            .collect();

        windows.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(windows)
    }
}
