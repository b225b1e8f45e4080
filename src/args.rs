use std::env;
use std::path::PathBuf;

use screen_click_run::automation::UiRect;
use screen_click_run::settings::{DEFAULT_SETTINGS_FILE, RunSettings};
use screen_click_run::template_matching::MatchMethod;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Run,
    ListWindows,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowSelector {
    Title(String),
    Id(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub debug_mode: bool,
    pub timeout_secs: Option<u64>,
    pub config_path: PathBuf,
    pub save_config: Option<PathBuf>,
    pub images: Vec<PathBuf>,
    pub region: Option<[i32; 4]>,
    pub relative_region: Option<[i32; 4]>,
    /// Drag rectangle in UI points, mapped through `scale`
    pub selection: Option<UiRect>,
    pub scale: f64,
    pub window: Option<WindowSelector>,
    pub confidence: Option<f32>,
    pub interval: Option<f64>,
    pub multi: bool,
    pub background: bool,
    pub vision: Option<PathBuf>,
    pub method: MatchMethod,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            mode: Mode::Run,
            debug_mode: false,
            timeout_secs: None,
            config_path: PathBuf::from(DEFAULT_SETTINGS_FILE),
            save_config: None,
            images: Vec::new(),
            region: None,
            relative_region: None,
            selection: None,
            scale: 1.0,
            window: None,
            confidence: None,
            interval: None,
            multi: false,
            background: false,
            vision: None,
            method: MatchMethod::default(),
        }
    }
}

/// Outcome of parsing the command line.
#[derive(Debug, PartialEq)]
pub enum Parsed {
    Run(Args),
    Help,
    Version,
}

fn parse_value<T: std::str::FromStr>(flag: &str, val: &str) -> Result<T, String> {
    val.parse::<T>()
        .map_err(|_| format!("Invalid value for {}: {}", flag, val))
}

fn parse_quad<T: std::str::FromStr + Copy + Default>(flag: &str, val: &str) -> Result<[T; 4], String> {
    let parts: Vec<&str> = val.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("{} expects four comma-separated numbers, got '{}'", flag, val));
    }
    let mut out = [T::default(); 4];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = parse_value(flag, part)?;
    }
    Ok(out)
}

impl Args {
    pub fn parse() -> Option<Self> {
        match Self::parse_from(env::args().skip(1)) {
            Ok(Parsed::Run(args)) => Some(args),
            Ok(Parsed::Help) => {
                print_help();
                None
            }
            Ok(Parsed::Version) => {
                println!("Screen Click Run v{}", env!("CARGO_PKG_VERSION"));
                None
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                print_help();
                None
            }
        }
    }

    pub fn parse_from<I, S>(args: I) -> Result<Parsed, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Args::default();

        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" || arg == "-h" {
                return Ok(Parsed::Help);
            } else if arg == "--version" || arg == "-v" {
                return Ok(Parsed::Version);
            } else if arg == "--debug" {
                parsed.debug_mode = true;
            } else if arg == "--list-windows" {
                parsed.mode = Mode::ListWindows;
            } else if arg == "--multi" {
                parsed.multi = true;
            } else if arg == "--background" {
                parsed.background = true;
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                parsed.timeout_secs = Some(parse_value("--timeout", val)?);
            } else if let Some(val) = arg.strip_prefix("--config=") {
                parsed.config_path = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--save-config=") {
                parsed.save_config = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--image=") {
                parsed.images.push(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--region=") {
                parsed.region = Some(parse_quad("--region", val)?);
            } else if let Some(val) = arg.strip_prefix("--relative-region=") {
                parsed.relative_region = Some(parse_quad("--relative-region", val)?);
            } else if let Some(val) = arg.strip_prefix("--select=") {
                let [x1, y1, x2, y2] = parse_quad::<f64>("--select", val)?;
                parsed.selection = Some(UiRect::from_corners((x1, y1), (x2, y2)));
            } else if let Some(val) = arg.strip_prefix("--scale=") {
                parsed.scale = parse_value("--scale", val)?;
            } else if let Some(val) = arg.strip_prefix("--window=") {
                parsed.window = Some(WindowSelector::Title(val.to_string()));
            } else if let Some(val) = arg.strip_prefix("--window-id=") {
                let id = match val.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16)
                        .map_err(|_| format!("Invalid value for --window-id: {}", val))?,
                    None => parse_value("--window-id", val)?,
                };
                parsed.window = Some(WindowSelector::Id(id));
            } else if let Some(val) = arg.strip_prefix("--confidence=") {
                parsed.confidence = Some(parse_value("--confidence", val)?);
            } else if let Some(val) = arg.strip_prefix("--interval=") {
                parsed.interval = Some(parse_value("--interval", val)?);
            } else if let Some(val) = arg.strip_prefix("--vision=") {
                parsed.vision = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--method=") {
                parsed.method = match val {
                    "ccoeff" => MatchMethod::CorrelationCoefficientNormalized,
                    "ccorr" => MatchMethod::CrossCorrelationNormalized,
                    other => {
                        return Err(format!(
                            "Unknown method '{}', expected 'ccoeff' or 'ccorr'",
                            other
                        ));
                    }
                };
            } else if arg.starts_with('-') {
                return Err(format!("Unknown argument: {}", arg));
            } else {
                parsed.images.push(PathBuf::from(arg));
            }
        }

        if parsed.region.is_some() && parsed.relative_region.is_some() {
            return Err("--region and --relative-region cannot be combined".to_string());
        }

        Ok(Parsed::Run(parsed))
    }

    /// Apply command-line overrides on top of file settings.
    pub fn apply_to(&self, settings: &mut RunSettings) {
        if let Some(region) = self.region {
            settings.use_window = false;
            settings.region = Some(region);
            settings.relative_region = None;
        }
        if let Some(region) = self.relative_region {
            settings.use_window = true;
            settings.relative_region = Some(region);
            settings.region = None;
        }
        if let Some(WindowSelector::Title(title)) = &self.window {
            settings.window_title = Some(title.clone());
        }
        if self.window.is_some() && self.region.is_none() {
            settings.use_window = true;
        }
        if let Some(confidence) = self.confidence {
            settings.confidence = confidence;
        }
        if let Some(interval) = self.interval {
            settings.interval = interval;
        }
        if self.multi {
            settings.multi = true;
        }
        if self.background {
            settings.background = true;
        }
        if self.vision.is_some() {
            settings.debug = true;
        }
        for image in &self.images {
            if !settings.images.contains(image) {
                settings.images.push(image.clone());
            }
        }
    }
}

fn print_help() {
    println!("🖱️ Screen Click Run");
    println!();
    println!("USAGE:");
    println!("    screen-click-run [FLAGS] [IMAGE...]");
    println!();
    println!("FLAGS:");
    println!("    --image=PATH              Add a template image (also accepted positionally)");
    println!("    --region=X,Y,W,H          Capture a fixed screen region (default: full desktop)");
    println!("    --window=TITLE            Track the first window whose title contains TITLE");
    println!("    --window-id=ID            Track a window by id (see --list-windows)");
    println!("    --relative-region=DX,DY,W,H  Capture a region relative to the tracked window");
    println!("    --select=X1,Y1,X2,Y2      Capture region given as drag corners in UI points");
    println!("    --scale=F                 Device pixel scale for --select (default: 1.0)");
    println!("    --confidence=F            Confidence threshold in (0, 1] (default: 0.8)");
    println!("    --interval=SECS           Per-image click cooldown (default: 1.0)");
    println!("    --multi                   Click every matching image in a frame");
    println!("    --background              Click through window messages (Windows only)");
    println!("    --method=ccoeff|ccorr     Matching score (default: ccoeff)");
    println!("    --vision=PATH             Write the latest annotated frame to PATH");
    println!("    --config=PATH             Settings file (default: {})", DEFAULT_SETTINGS_FILE);
    println!("    --save-config=PATH        Write the effective settings to PATH");
    println!("    --list-windows            List selectable windows and exit");
    println!("    --debug                   Enable debug output");
    println!("    --timeout=N               Auto-exit after N seconds");
    println!("    --help, -h                Show this help message");
    println!("    --version, -v             Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    screen-click-run ok_button.png");
    println!("    screen-click-run --window=Notepad --background accept.png");
    println!("    screen-click-run --region=0,0,800,600 --multi a.png b.png");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Args {
        match Args::parse_from(args) {
            Ok(Parsed::Run(args)) => args,
            other => panic!("expected run args, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = run(&[]);
        assert_eq!(args, Args::default());
        assert_eq!(args.config_path, PathBuf::from("clicker_settings.json"));
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(Args::parse_from(["-h"]), Ok(Parsed::Help));
        assert_eq!(Args::parse_from(["--version"]), Ok(Parsed::Version));
    }

    #[test]
    fn test_images_and_region() {
        let args = run(&["a.png", "--image=b.png", "--region=10,20,300,200", "--multi"]);
        assert_eq!(args.images, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert_eq!(args.region, Some([10, 20, 300, 200]));
        assert!(args.multi);
    }

    #[test]
    fn test_window_selectors() {
        assert_eq!(
            run(&["--window=Calc"]).window,
            Some(WindowSelector::Title("Calc".into()))
        );
        assert_eq!(run(&["--window-id=0x1f"]).window, Some(WindowSelector::Id(31)));
        assert_eq!(run(&["--window-id=42"]).window, Some(WindowSelector::Id(42)));
    }

    #[test]
    fn test_selection_is_normalized() {
        let args = run(&["--select=50,80,10,20", "--scale=1.5"]);
        assert_eq!(args.selection, Some(UiRect::new(10.0, 20.0, 40.0, 60.0)));
        assert_eq!(args.scale, 1.5);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Args::parse_from(["--nope"]).is_err());
        assert!(Args::parse_from(["--region=1,2,3"]).is_err());
        assert!(Args::parse_from(["--confidence=high"]).is_err());
        assert!(Args::parse_from(["--method=sqdiff"]).is_err());
        assert!(Args::parse_from(["--region=0,0,5,5", "--relative-region=0,0,5,5"]).is_err());
    }

    #[test]
    fn test_overrides_apply_to_settings() {
        let mut settings = RunSettings {
            region: Some([0, 0, 100, 100]),
            images: vec![PathBuf::from("a.png")],
            ..Default::default()
        };
        let args = run(&[
            "--window=Game",
            "--relative-region=5,5,50,50",
            "--confidence=0.9",
            "--vision=frame.png",
            "a.png",
            "c.png",
        ]);
        args.apply_to(&mut settings);

        assert!(settings.use_window);
        assert_eq!(settings.region, None);
        assert_eq!(settings.relative_region, Some([5, 5, 50, 50]));
        assert_eq!(settings.window_title.as_deref(), Some("Game"));
        assert_eq!(settings.confidence, 0.9);
        assert!(settings.debug);
        assert_eq!(settings.images, vec![PathBuf::from("a.png"), PathBuf::from("c.png")]);
    }
}
