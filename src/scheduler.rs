//! SM-2 spaced-repetition scheduling
//!
//! `schedule` is pure and total: it never fails, touches no I/O, and is
//! safe to call from any thread. The interval constants that differ
//! between the two policies seen in the wild live in [`SchedulerPolicy`]
//! so both run through one code path.
//!
//! Quality ratings (1-5):
//! - 1: Total blackout, no recall
//! - 2: Incorrect, but the answer felt familiar
//! - 3: Correct with serious difficulty
//! - 4: Correct after hesitation
//! - 5: Perfect recall

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::models::Card;

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// How much a lapse depresses the ease factor
const LAPSE_EASE_PENALTY: f64 = 0.2;

/// Sub-day re-queue offsets applied on a lapse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapseRequeue {
    /// Minutes until the card comes back after a total blackout (quality 1)
    pub blackout_minutes: i64,
    /// Minutes until the card comes back after a near miss (quality 2)
    pub partial_minutes: i64,
}

/// Named scheduling constants.
///
/// `Default` is the richer variant: two-day first interval and same-day
/// re-queue of lapsed cards. [`SchedulerPolicy::classic`] selects the older
/// one-day variant with day-granular lapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerPolicy {
    /// Interval after the first successful recall
    pub first_interval_days: i64,
    /// Interval after the second successful recall
    pub second_interval_days: i64,
    /// Interval recorded on a lapse; also the re-queue spacing when
    /// `lapse_requeue` is off
    pub lapse_interval_days: i64,
    /// Same-day re-queue offsets; `None` re-queues after
    /// `lapse_interval_days` instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lapse_requeue: Option<LapseRequeue>,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            first_interval_days: 2,
            second_interval_days: 6,
            lapse_interval_days: 1,
            lapse_requeue: Some(LapseRequeue {
                blackout_minutes: 10,
                partial_minutes: 60,
            }),
        }
    }
}

impl SchedulerPolicy {
    /// The older policy: one-day first interval, lapses come back the
    /// next day rather than the same session
    pub fn classic() -> Self {
        Self {
            first_interval_days: 1,
            lapse_requeue: None,
            ..Self::default()
        }
    }
}

/// Scheduling state computed by [`schedule`], applied to the card by the
/// session manager
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOutcome {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval: i64,
    pub next_review_at: DateTime<Utc>,
    /// The rating actually used, after clamping into 1..=5
    pub quality: i32,
}

/// Clamp a learner's rating into the accepted 1..=5 range
pub fn clamp_quality(quality: i32) -> i32 {
    quality.clamp(1, 5)
}

/// Compute the next scheduling state for one card.
///
/// A success (quality >= 3) walks the first/second/`round(interval × ease)`
/// interval ladder and nudges the ease factor by the SM-2 delta. A lapse
/// resets `repetitions`, records the lapse interval for bookkeeping, drops
/// the ease factor by 0.2, and re-queues the card 10 or 60 minutes out when
/// the policy allows same-day re-queues.
pub fn schedule(
    policy: &SchedulerPolicy,
    card: &Card,
    quality: i32,
    now: DateTime<Utc>,
) -> ScheduleOutcome {
    let quality = clamp_quality(quality);

    if quality >= 3 {
        let repetitions = card.repetitions + 1;
        let interval = match repetitions {
            1 => policy.first_interval_days,
            2 => policy.second_interval_days,
            // Grows from the ease factor as it stood before this review
            _ => (card.interval as f64 * card.ease_factor).round() as i64,
        };

        ScheduleOutcome {
            repetitions,
            ease_factor: next_ease_factor(card.ease_factor, quality),
            interval,
            next_review_at: now + Duration::days(interval),
            quality,
        }
    } else {
        let next_review_at = match policy.lapse_requeue {
            Some(requeue) if quality == 1 => now + Duration::minutes(requeue.blackout_minutes),
            Some(requeue) => now + Duration::minutes(requeue.partial_minutes),
            None => now + Duration::days(policy.lapse_interval_days),
        };

        ScheduleOutcome {
            repetitions: 0,
            ease_factor: (card.ease_factor - LAPSE_EASE_PENALTY).max(MIN_EASE_FACTOR),
            interval: policy.lapse_interval_days,
            next_review_at,
            quality,
        }
    }
}

// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), floored at 1.3
fn next_ease_factor(current: f64, quality: i32) -> f64 {
    let miss = (5 - quality) as f64;
    (current + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR)
}

/// Interval in days each rating 1..=5 would produce, for UI button hints
pub fn preview_intervals(policy: &SchedulerPolicy, card: &Card, now: DateTime<Utc>) -> [i64; 5] {
    let mut days = [0; 5];
    for (slot, quality) in days.iter_mut().zip(1..) {
        *slot = schedule(policy, card, quality, now).interval;
    }
    days
}
