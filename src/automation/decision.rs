//! Decision policy: which matches become clicks this frame

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::config::DispatchConfig;
use crate::platform::ScreenPoint;
use crate::template_matching::{MatchResult, TemplateId};

/// The subset of the dispatch config the decision depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionParams {
    pub threshold: f32,
    pub cooldown: Duration,
    pub allow_multiple: bool,
}

impl From<&DispatchConfig> for DecisionParams {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            threshold: config.confidence_threshold,
            cooldown: config.cooldown,
            allow_multiple: config.allow_multiple_clicks,
        }
    }
}

/// Time of the last click per template, owned by one loop run.
#[derive(Debug, Default, Clone)]
pub struct CooldownTable {
    last_click: HashMap<TemplateId, Instant>,
}

impl CooldownTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `template` clicked less than `cooldown` before `now`.
    pub fn is_cooling(&self, template: TemplateId, now: Instant, cooldown: Duration) -> bool {
        self.last_click
            .get(&template)
            .is_some_and(|&last| now.saturating_duration_since(last) < cooldown)
    }

    pub fn record(&mut self, template: TemplateId, now: Instant) {
        self.last_click.insert(template, now);
    }

    pub fn last_click(&self, template: TemplateId) -> Option<Instant> {
        self.last_click.get(&template).copied()
    }
}

/// A match that will be clicked.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedMatch {
    pub template: TemplateId,
    pub name: String,
    pub score: f32,
    /// Center of the matched box in frame coordinates
    pub frame_point: (u32, u32),
    /// Same point on the desktop
    pub screen_point: ScreenPoint,
}

/// Pick the matches to click, in template order.
///
/// A match clicks when its score reaches the threshold and its template is
/// not cooling down. Without `allow_multiple` evaluation ends at the first
/// click; a match suppressed by cooldown does not end it. Every accepted
/// match is recorded in `table` at `now`.
pub fn decide(
    results: &[MatchResult],
    params: &DecisionParams,
    frame_origin: ScreenPoint,
    now: Instant,
    table: &mut CooldownTable,
) -> Vec<AcceptedMatch> {
    let mut accepted = Vec::new();

    for result in results {
        if !params.allow_multiple && !accepted.is_empty() {
            break;
        }
        let Some(best) = result.best else {
            continue;
        };
        if best.score < params.threshold {
            continue;
        }
        if table.is_cooling(result.template, now, params.cooldown) {
            log::trace!("{} cooling down", result.name);
            continue;
        }
        let Some((cx, cy)) = result.center() else {
            continue;
        };

        table.record(result.template, now);
        accepted.push(AcceptedMatch {
            template: result.template,
            name: result.name.clone(),
            score: best.score,
            frame_point: (cx, cy),
            screen_point: ScreenPoint::new(
                frame_origin.x.saturating_add_unsigned(cx),
                frame_origin.y.saturating_add_unsigned(cy),
            ),
        });
    }

    accepted
}
