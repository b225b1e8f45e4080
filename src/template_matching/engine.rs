//! Match engine: evaluates every enabled template against one frame

use image::{DynamicImage, GrayImage, RgbImage};

use super::matcher::{self, PreparedFrame};
use super::template::TemplateSet;
use super::types::{MatchMethod, MatchResult};

/// Runs the configured matcher over a template set.
///
/// Read-only with respect to both the frame and the templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchEngine {
    method: MatchMethod,
}

impl MatchEngine {
    pub fn new(method: MatchMethod) -> Self {
        Self { method }
    }

    /// One result per enabled template, in template order.
    ///
    /// Each template's enable flag is read exactly once. Templates larger than
    /// the frame produce a result with no best location. Per-frame work
    /// (integral tables, spectrum, luma) is done once and shared.
    pub fn match_all(&self, frame: &RgbImage, templates: &TemplateSet) -> Vec<MatchResult> {
        let prepared = PreparedFrame::new(frame);
        let mut frame_luma: Option<GrayImage> = None;
        let mut results = Vec::with_capacity(templates.len());

        for (id, template) in templates.iter() {
            if !template.is_enabled() {
                continue;
            }

            let best = match self.method {
                MatchMethod::CorrelationCoefficientNormalized => {
                    matcher::correlation_coefficient(&prepared, template.rgb())
                }
                MatchMethod::CrossCorrelationNormalized => {
                    let luma = frame_luma
                        .get_or_insert_with(|| DynamicImage::ImageRgb8(frame.clone()).to_luma8());
                    matcher::cross_correlation(luma, template.luma())
                }
            };

            if best.is_none() {
                let (w, h) = template.size();
                log::debug!(
                    "⚠️ Template '{}' ({}x{}) does not fit in {}x{} frame",
                    template.name(),
                    w,
                    h,
                    frame.width(),
                    frame.height()
                );
            }

            results.push(MatchResult {
                template: id,
                name: template.name().to_string(),
                best,
                size: template.size(),
            });
        }

        results
    }
}
