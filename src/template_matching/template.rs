//! Reference images and the ordered set the control loop searches for

use image::{GrayImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use super::types::TemplateId;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to load template {path:?}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Template '{name}' has no pixels")]
    Empty { name: String },
}

/// A named reference image with its decoded pixels.
///
/// `enabled` is the only field that changes after creation and may be flipped
/// by the owner while a control loop reads it.
#[derive(Debug)]
pub struct Template {
    name: String,
    path: Option<PathBuf>,
    enabled: AtomicBool,
    rgb: RgbImage,
    luma: GrayImage,
}

impl Template {
    /// Build a template from already decoded pixels.
    pub fn from_image(name: impl Into<String>, rgb: RgbImage) -> Result<Self, TemplateError> {
        let name = name.into();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(TemplateError::Empty { name });
        }
        let luma = image::DynamicImage::ImageRgb8(rgb.clone()).to_luma8();
        Ok(Self {
            name,
            path: None,
            enabled: AtomicBool::new(true),
            rgb,
            luma,
        })
    }

    /// Decode an image file; the display name is the file name.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| TemplateError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut template = Self::from_image(name, decoded.to_rgb8())?;
        template.path = Some(path.to_path_buf());
        Ok(template)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    pub fn size(&self) -> (u32, u32) {
        (self.rgb.width(), self.rgb.height())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

/// Ordered collection of templates, matched in insertion order.
#[derive(Debug, Default)]
pub struct TemplateSet {
    templates: Vec<Template>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a template and return its identity.
    pub fn push(&mut self, template: Template) -> TemplateId {
        self.templates.push(template);
        TemplateId(self.templates.len() - 1)
    }

    /// Load every readable image, skipping failures and repeated paths.
    ///
    /// Returns the number of templates added.
    pub fn load_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        let mut loaded_count = 0;

        for path in paths {
            let path = path.as_ref();
            if self.templates.iter().any(|t| t.path() == Some(path)) {
                log::debug!("Template {:?} already loaded, skipping", path);
                continue;
            }

            match Template::open(path) {
                Ok(template) => {
                    let (w, h) = template.size();
                    log::info!("Loaded template '{}' ({}x{})", template.name(), w, h);
                    self.push(template);
                    loaded_count += 1;
                }
                Err(e) => log::warn!("{}", e),
            }
        }

        loaded_count
    }

    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id.0)
    }

    /// Flip a template's enable flag; returns false for an unknown id.
    pub fn set_enabled(&self, id: TemplateId, enabled: bool) -> bool {
        match self.get(id) {
            Some(template) => {
                template.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &Template)> {
        self.templates
            .iter()
            .enumerate()
            .map(|(i, t)| (TemplateId(i), t))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.templates
            .iter()
            .filter_map(|t| t.path().map(Path::to_path_buf))
            .collect()
    }
}
