/// Template matching data types
use std::fmt;

/// Stable identity of a template within its set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub usize);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Scoring used to compare a template with a frame window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMethod {
    /// Mean-subtracted correlation over all three color channels, in [-1, 1]
    #[default]
    CorrelationCoefficientNormalized,
    /// Grayscale normalized cross-correlation, in [0, 1]
    CrossCorrelationNormalized,
}

/// Global maximum of a score surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BestMatch {
    /// X coordinate of the top-left corner in the frame
    pub x: u32,
    /// Y coordinate of the top-left corner in the frame
    pub y: u32,
    /// Correlation score, 1.0 is a perfect match
    pub score: f32,
}

/// Best match of one enabled template in one frame
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub template: TemplateId,
    pub name: String,
    /// `None` when the template could not be matched (larger than the frame)
    pub best: Option<BestMatch>,
    /// Template width and height
    pub size: (u32, u32),
}

impl MatchResult {
    /// Score of the best location, if any
    pub fn score(&self) -> Option<f32> {
        self.best.map(|b| b.score)
    }

    /// Whether the best location reaches `threshold`
    pub fn clears(&self, threshold: f32) -> bool {
        self.score().is_some_and(|s| s >= threshold)
    }

    /// Center of the matched box in frame coordinates
    pub fn center(&self) -> Option<(u32, u32)> {
        self.best
            .map(|b| (b.x + self.size.0 / 2, b.y + self.size.1 / 2))
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best {
            Some(b) => write!(f, "{} at ({},{}) - {:.2}", self.name, b.x, b.y, b.score),
            None => write!(f, "{} - not matched", self.name),
        }
    }
}
