//! Time interval model and the ad-complement engine.
//!
//! All times are seconds relative to the track start. Ad intervals arrive
//! from an external classifier and are untrusted: they may be unsorted,
//! overlapping, outside the track, or malformed. The complement engine
//! sanitizes them and computes the retained (non-ad) intervals.

use std::cmp::Ordering;

use tracing::{debug, warn};

/// A time span on a single audio track, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeInterval {
    pub start: f64,
    pub end: f64,
}

impl TimeInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the interval. Zero-length intervals are legal but
    /// contribute nothing when spliced.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// A well-formed interval has finite endpoints, a non-negative start,
    /// and `end >= start`. Malformed intervals are flagged, never panicked on.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.end >= self.start
    }

    /// Ordering by start, ties broken by end ascending. Non-finite values
    /// sort last so they never interleave with well-formed intervals.
    pub fn cmp_by_start(&self, other: &Self) -> Ordering {
        self.start
            .partial_cmp(&other.start)
            .unwrap_or(Ordering::Greater)
            .then(self.end.partial_cmp(&other.end).unwrap_or(Ordering::Greater))
    }
}

/// Outcome of complementing ad intervals against the full timeline.
///
/// `FullyAdCovered` (retained set empty) is a valid result, reported
/// distinctly from `NoAds` (one retained interval spanning everything).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplementOutcome {
    /// No surviving ad intervals; the whole track is retained.
    NoAds,
    /// Ads found; some audio retained.
    Trimmed,
    /// Merged ads cover the entire timeline; nothing retained.
    FullyAdCovered,
}

/// Result of the complement computation.
#[derive(Debug, Clone)]
pub struct ComplementResult {
    /// Retained intervals, sorted by start, non-overlapping, tiling
    /// `[0, total]` together with `ad_runs`.
    pub retained: Vec<TimeInterval>,
    /// Clamped, merged ad runs, sorted by start.
    pub ad_runs: Vec<TimeInterval>,
    pub outcome: ComplementOutcome,
    /// Count of malformed ad intervals dropped during sanitization.
    pub dropped_invalid: usize,
}

impl ComplementResult {
    /// Total retained duration in seconds.
    pub fn retained_duration(&self) -> f64 {
        self.retained.iter().map(|i| i.duration()).sum()
    }

    /// Total removed (ad) duration in seconds.
    pub fn removed_duration(&self) -> f64 {
        self.ad_runs.iter().map(|i| i.duration()).sum()
    }
}

/// Compute the retained (non-ad) intervals for a track of `total_duration`
/// seconds, given untrusted ad intervals.
///
/// Sanitization: malformed intervals (`start > end`, non-finite) are
/// dropped with a warning; intervals fully outside `[0, total]` are dropped
/// silently; the rest are clamped to the track, sorted, and merged into
/// maximal runs (touching runs count as adjacent and merge). The gaps
/// between runs become the retained intervals.
pub fn complement(total_duration: f64, ad_intervals: &[TimeInterval]) -> ComplementResult {
    let mut dropped_invalid = 0usize;
    let mut clamped: Vec<TimeInterval> = Vec::with_capacity(ad_intervals.len());

    for interval in ad_intervals {
        if !interval.start.is_finite() || !interval.end.is_finite() || interval.end < interval.start
        {
            warn!(
                "Dropping malformed ad interval: start={}, end={}",
                interval.start, interval.end
            );
            dropped_invalid += 1;
            continue;
        }

        // Fully outside the track: not an error, just irrelevant.
        if interval.end <= 0.0 || interval.start >= total_duration {
            debug!(
                "Dropping out-of-range ad interval: [{:.3}, {:.3}] (track is {:.3}s)",
                interval.start, interval.end, total_duration
            );
            continue;
        }

        clamped.push(TimeInterval {
            start: interval.start.max(0.0),
            end: interval.end.min(total_duration),
        });
    }

    clamped.sort_by(TimeInterval::cmp_by_start);

    // Merge overlapping and touching intervals into maximal runs. Without
    // this step overlapping annotations would make the splicer double-skip.
    let mut ad_runs: Vec<TimeInterval> = Vec::new();
    for interval in clamped {
        match ad_runs.last_mut() {
            Some(run) if interval.start <= run.end => {
                run.end = run.end.max(interval.end);
            }
            _ => ad_runs.push(interval),
        }
    }

    // Walk the runs left to right, emitting each positive-length gap.
    let mut retained: Vec<TimeInterval> = Vec::new();
    let mut prev_end = 0.0f64;
    for run in &ad_runs {
        if run.start > prev_end {
            retained.push(TimeInterval::new(prev_end, run.start));
        }
        prev_end = run.end;
    }
    if prev_end < total_duration {
        retained.push(TimeInterval::new(prev_end, total_duration));
    }

    let outcome = if ad_runs.is_empty() {
        ComplementOutcome::NoAds
    } else if retained.is_empty() {
        ComplementOutcome::FullyAdCovered
    } else {
        ComplementOutcome::Trimmed
    };

    ComplementResult {
        retained,
        ad_runs,
        outcome,
        dropped_invalid,
    }
}
