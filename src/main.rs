mod args;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use args::{Args, Mode, WindowSelector};
use screen_click_run::automation::{
    self, CaptureConfig, CaptureMode, ClickerError, ClickerEvent, DebugFrame, RunConfig,
};
use screen_click_run::platform::{
    Desktop, NativePointer, PlatformError, WindowHandle, WindowState, XcapDesktop,
};
use screen_click_run::settings::{RunSettings, SettingsError};
use screen_click_run::template_matching::TemplateSet;
use thiserror::Error;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Clicker(#[from] ClickerError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() {
    let Some(args) = Args::parse() else {
        return;
    };

    let default_filter = if args.debug_mode { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = tokio::runtime::Runtime::new()
        .map_err(AppError::from)
        .and_then(|rt| rt.block_on(run(args)));

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let desktop = XcapDesktop::new();

    if args.mode == Mode::ListWindows {
        for window in desktop.list_windows()? {
            println!(
                "{:>12}  {:<20}  {}",
                window.handle.to_string(),
                window.rect.to_string(),
                window.title
            );
        }
        return Ok(());
    }

    let mut settings = RunSettings::load_or_default(&args.config_path);
    args.apply_to(&mut settings);

    let target_window = resolve_window(&desktop, &args, &settings)?;
    let mut capture = settings.capture_config()?;

    if let Some(selection) = args.selection {
        let origin = match (capture.mode, target_window) {
            (CaptureMode::WindowRelative, Some(handle)) => match desktop.window_state(handle)? {
                WindowState::Visible(rect) => Some(rect.origin()),
                _ => None,
            },
            _ => None,
        };
        let region = automation::region::to_logical(selection, args.scale, capture.mode, origin)?;
        capture.set_region(region);
        settings.set_capture(&capture);
    }
    log_capture(&capture);

    let mut templates = TemplateSet::new();
    templates.load_paths(&settings.images);

    let mut dispatch = settings.dispatch_config(target_window)?;
    dispatch.match_method = args.method;

    if let Some(path) = &args.save_config {
        settings.save(path)?;
        log::info!("💾 Settings saved to {:?}", path);
    }

    let (handle, mut events) = automation::start(
        Arc::new(templates),
        RunConfig::new(dispatch, capture),
        desktop,
        NativePointer::new(),
    )?;

    let deadline = async {
        match args.timeout_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ClickerEvent::MatchFound { template, x, y }) => {
                    println!("🎯 {} at ({},{})", template, x, y);
                }
                Some(ClickerEvent::DebugFrame(frame)) => {
                    if let Some(path) = &args.vision {
                        save_debug_frame(&frame, path);
                    }
                }
                Some(ClickerEvent::Stopped) | None => break,
                // Log lines already went through the logger.
                Some(_) => {}
            },
            _ = &mut deadline => {
                log::info!("⏰ Timeout reached, stopping");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("🛑 Interrupted, stopping");
                break;
            }
        }
    }

    tokio::task::spawn_blocking(move || handle.stop())
        .await
        .map_err(|e| ClickerError::Panicked {
            description: e.to_string(),
        })??;
    Ok(())
}

fn resolve_window(
    desktop: &XcapDesktop,
    args: &Args,
    settings: &RunSettings,
) -> Result<Option<WindowHandle>, AppError> {
    if let Some(WindowSelector::Id(id)) = &args.window {
        return Ok(Some(WindowHandle(*id)));
    }
    let Some(title) = &settings.window_title else {
        return Ok(None);
    };

    let needle = title.to_lowercase();
    let found = desktop
        .list_windows()?
        .into_iter()
        .find(|w| w.title.to_lowercase().contains(&needle));

    match found {
        Some(window) => {
            log::info!("🪟 Target window: {} ({})", window.title, window.handle);
            Ok(Some(window.handle))
        }
        None => Err(ClickerError::WindowNotFound.into()),
    }
}

fn log_capture(capture: &CaptureConfig) {
    match (&capture.region, capture.mode) {
        (Some(region), _) => log::info!("📐 {}", region),
        (None, CaptureMode::FixedRegion) => log::info!("📐 Rect: Full Screen"),
        (None, CaptureMode::WindowRelative) => log::info!("📐 Whole window"),
    }
}

fn save_debug_frame(frame: &DebugFrame, path: &Path) {
    let Some(image) = frame.to_image() else {
        log::warn!("Debug frame has inconsistent dimensions");
        return;
    };
    if let Err(e) = image.save(path) {
        log::warn!("Failed to write debug frame {:?}: {}", path, e);
    }
}
