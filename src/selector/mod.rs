//! Target selection
//!
//! Resources are ranked by an additive score, lower is better:
//!
//! | term | value |
//! |------|-------|
//! | name matches no keyword | [`NAME_MISMATCH_PENALTY`] |
//! | remaining quota zero or unknown | [`EXHAUSTED_QUOTA_PENALTY`] |
//! | reservation start known | `max(0, start - (now - tolerance))` ms |
//! | only event date known | `max(0, event - now)` ms + [`EVENT_ONLY_OFFSET`] |
//! | neither known | [`UNSCHEDULED_SCORE`] |
//!
//! Each tier is wider than the sum of every tier below it, so a keyword
//! match always wins, then capacity, then the soonest opening.

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::models::Resource;
use crate::utils::error::SelectorError;

pub const NAME_MISMATCH_PENALTY: i64 = 1_000_000_000_000_000;
pub const EXHAUSTED_QUOTA_PENALTY: i64 = 10_000_000_000_000;
pub const UNSCHEDULED_SCORE: i64 = 1_000_000_000_000;
pub const EVENT_ONLY_OFFSET: i64 = 100_000_000_000;

/// Largest time term, keeps far-future dates inside their tier
const MAX_TIME_TERM: i64 = EVENT_ONLY_OFFSET - 1;

/// Scores and picks the resource to acquire
#[derive(Debug, Clone)]
pub struct ResourceSelector {
    keywords: Vec<String>,
    tolerance: Duration,
}

impl ResourceSelector {
    pub fn new(keywords: Vec<String>, tolerance: Duration) -> Self {
        Self {
            keywords,
            tolerance,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.target.keywords.clone(), config.tolerance())
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Whether the resource's name matches the configured keywords
    ///
    /// With no keywords configured every resource is a target.
    pub fn is_target(&self, resource: &Resource) -> bool {
        self.keywords.is_empty() || resource.matches_any(&self.keywords)
    }

    /// Score a resource at `now`; lower is better
    pub fn score(&self, resource: &Resource, now: DateTime<Utc>) -> i64 {
        let mut score = self.time_term(resource, now);

        if !self.is_target(resource) {
            score += NAME_MISMATCH_PENALTY;
        }
        if !resource.has_capacity() {
            score += EXHAUSTED_QUOTA_PENALTY;
        }

        score
    }

    fn time_term(&self, resource: &Resource, now: DateTime<Utc>) -> i64 {
        if let Some(start) = resource.reservation_start {
            let threshold = now - self.tolerance;
            return millis_after(start, threshold);
        }

        if let Some(event_at) = resource.event_at {
            return millis_after(event_at, now) + EVENT_ONLY_OFFSET;
        }

        UNSCHEDULED_SCORE
    }

    /// Resources with their scores, best first
    ///
    /// The sort is stable: equal scores keep listing order.
    pub fn rank<'a>(
        &self,
        resources: &'a [Resource],
        now: DateTime<Utc>,
    ) -> Vec<(i64, &'a Resource)> {
        let mut ranked: Vec<_> = resources.iter().map(|r| (self.score(r, now), r)).collect();
        ranked.sort_by_key(|(score, _)| *score);
        ranked
    }

    /// Pick the best resource; ties go to the earliest listed
    ///
    /// # Errors
    ///
    /// Returns `SelectorError::EmptySet` when `resources` is empty
    pub fn pick<'a>(
        &self,
        resources: &'a [Resource],
        now: DateTime<Utc>,
    ) -> Result<&'a Resource, SelectorError> {
        resources
            .iter()
            .enumerate()
            .min_by_key(|(index, r)| (self.score(r, now), *index))
            .map(|(_, r)| r)
            .ok_or(SelectorError::EmptySet)
    }
}

/// `max(0, at - from)` in milliseconds, capped below the next tier
fn millis_after(at: DateTime<Utc>, from: DateTime<Utc>) -> i64 {
    (at - from).num_milliseconds().clamp(0, MAX_TIME_TERM)
}
