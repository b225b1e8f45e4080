/// Template matching module for finding reference images in captured frames
///
/// This module provides:
/// - An ordered, shareable set of reference images with live enable flags
/// - Mean-subtracted color correlation and grayscale cross-correlation scoring
/// - A match engine reporting the single best location per enabled template
pub mod engine;
pub mod matcher;
pub mod template;
pub mod types;

pub use engine::MatchEngine;
pub use template::{Template, TemplateSet};
pub use types::{BestMatch, MatchMethod, MatchResult, TemplateId};
