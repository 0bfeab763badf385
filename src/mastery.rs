//! Mastery analytics
//!
//! Folds a unit's session records and card maturity into a single 0-5
//! level plus due counts. Five factors, each normalized into [0,1] by a
//! monotonic step function, combine as a weighted sum:
//!
//! - session count (0.20)
//! - mean per-session success rate (0.30)
//! - fraction of mature cards (0.25)
//! - recent activity (0.15)
//! - study consistency (0.10)
//!
//! Everything here is a pure view over the card store and session log;
//! snapshots are recomputed on demand and never persisted.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::models::Card;
use crate::session::models::SessionRecord;

const WEIGHT_SESSION_COUNT: f64 = 0.20;
const WEIGHT_SUCCESS_RATE: f64 = 0.30;
const WEIGHT_SRS_MATURITY: f64 = 0.25;
const WEIGHT_RECENT_ACTIVITY: f64 = 0.15;
const WEIGHT_CONSISTENCY: f64 = 0.10;

/// A card is mature once it has survived three consecutive successes and
/// carries at least a week's interval
const MATURE_REPETITIONS: u32 = 3;
const MATURE_INTERVAL_DAYS: i64 = 7;

/// The five factor scores, each in [0,1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScores {
    pub session_count: f64,
    pub success_rate: f64,
    pub srs_maturity: f64,
    pub recent_activity: f64,
    pub consistency: f64,
}

impl FactorScores {
    fn weighted_sum(&self) -> f64 {
        WEIGHT_SESSION_COUNT * self.session_count
            + WEIGHT_SUCCESS_RATE * self.success_rate
            + WEIGHT_SRS_MATURITY * self.srs_maturity
            + WEIGHT_RECENT_ACTIVITY * self.recent_activity
            + WEIGHT_CONSISTENCY * self.consistency
    }
}

/// Qualitative reading of a mastery level, keyed by its integer part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MasteryBand {
    Limited,
    Basic,
    Developing,
    Good,
    VeryStrong,
}

impl MasteryBand {
    pub fn from_level(level: f64) -> Self {
        match level.floor() as i64 {
            i64::MIN..=1 => Self::Limited,
            2 => Self::Basic,
            3 => Self::Developing,
            4 => Self::Good,
            _ => Self::VeryStrong,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Limited => "Limited Understanding",
            Self::Basic => "Basic Understanding",
            Self::Developing => "Developing Understanding",
            Self::Good => "Good Understanding",
            Self::VeryStrong => "Very Strong Understanding",
        }
    }
}

/// Point-in-time proficiency view of one study-unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterySnapshot {
    /// 0-5 in steps of 0.2
    pub level: f64,
    pub band: MasteryBand,
    pub factors: FactorScores,
    /// Cards due before tomorrow, overdue included
    pub due_today: usize,
    /// Cards scheduled within the next seven days
    pub due_this_week: usize,
    pub total_cards: usize,
    pub sessions_recorded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_exam: Option<i64>,
}

/// Compute the mastery snapshot for one unit
pub fn snapshot(
    cards: &[Card],
    sessions: &[SessionRecord],
    exam_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> MasterySnapshot {
    let factors = FactorScores {
        session_count: session_count_score(sessions.len()),
        success_rate: success_rate_score(sessions),
        srs_maturity: maturity_score(cards),
        recent_activity: recent_activity_score(sessions, now),
        consistency: consistency_score(sessions),
    };
    let level = round_level(factors.weighted_sum() * 5.0);

    MasterySnapshot {
        level,
        band: MasteryBand::from_level(level),
        factors,
        due_today: due_today(cards, now),
        due_this_week: due_this_week(cards, now),
        total_cards: cards.len(),
        sessions_recorded: sessions.len(),
        days_until_exam: exam_date.map(|date| (date - now.date_naive()).num_days()),
    }
}

// ===== Factor Scores =====

fn session_count_score(count: usize) -> f64 {
    match count {
        0 => 0.0,
        1..=2 => 0.4,
        3..=4 => 0.6,
        5..=9 => 0.8,
        _ => 1.0,
    }
}

fn success_rate_score(sessions: &[SessionRecord]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    let mean = sessions.iter().map(|s| s.success_rate).sum::<f64>() / sessions.len() as f64;
    match mean {
        m if m >= 90.0 => 1.0,
        m if m >= 80.0 => 0.9,
        m if m >= 70.0 => 0.8,
        m if m >= 60.0 => 0.7,
        m if m >= 50.0 => 0.6,
        m if m >= 40.0 => 0.5,
        m if m >= 30.0 => 0.4,
        m if m >= 20.0 => 0.3,
        _ => 0.2,
    }
}

fn maturity_score(cards: &[Card]) -> f64 {
    if cards.is_empty() {
        return 0.0;
    }
    let mature = cards
        .iter()
        .filter(|c| c.repetitions >= MATURE_REPETITIONS && c.interval >= MATURE_INTERVAL_DAYS)
        .count();
    match mature as f64 / cards.len() as f64 {
        f if f >= 0.8 => 1.0,
        f if f >= 0.6 => 0.8,
        f if f >= 0.4 => 0.6,
        f if f >= 0.2 => 0.4,
        _ => 0.2,
    }
}

fn recent_activity_score(sessions: &[SessionRecord], now: DateTime<Utc>) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    let week_ago = now - Duration::days(7);
    let last_week = sessions
        .iter()
        .filter(|s| s.completed_at >= week_ago)
        .count();
    match last_week {
        n if n >= 3 => 1.0,
        2 => 0.8,
        1 => 0.6,
        _ => {
            let month_ago = now - Duration::days(30);
            if sessions.iter().any(|s| s.completed_at >= month_ago) {
                0.4
            } else {
                0.2
            }
        }
    }
}

fn consistency_score(sessions: &[SessionRecord]) -> f64 {
    // Undefined below two sessions
    if sessions.len() < 2 {
        return 0.0;
    }
    let mut stamps: Vec<DateTime<Utc>> = sessions.iter().map(|s| s.completed_at).collect();
    stamps.sort();
    let total_gap_days: f64 = stamps
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_seconds() as f64 / 86_400.0)
        .sum();
    match total_gap_days / (stamps.len() - 1) as f64 {
        g if g <= 3.0 => 1.0,
        g if g <= 7.0 => 0.8,
        g if g <= 14.0 => 0.6,
        g if g <= 30.0 => 0.4,
        _ => 0.2,
    }
}

// ===== Level and Due Windows =====

/// Round a raw 0-5 level to the nearest 0.2 step.
///
/// The weighted sum accumulates tenth- and hundredth-sized terms, so a
/// value meant to sit exactly between two steps can arrive a hair off.
/// Snapping to six decimals first makes the boundary round up
/// deterministically, and dividing back keeps the result equal to the
/// plain decimal literal.
fn round_level(raw: f64) -> f64 {
    let steps = (raw * 5.0 * 1e6).round() / 1e6;
    steps.round() / 5.0
}

fn due_today(cards: &[Card], now: DateTime<Utc>) -> usize {
    let tomorrow = (now + Duration::days(1))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc();
    cards
        .iter()
        .filter(|c| match c.next_review_at {
            None => true,
            Some(at) => at < tomorrow,
        })
        .count()
}

fn due_this_week(cards: &[Card], now: DateTime<Utc>) -> usize {
    let week_ahead = now + Duration::days(7);
    cards
        .iter()
        .filter(|c| match c.next_review_at {
            None => true,
            Some(at) => at >= now && at <= week_ahead,
        })
        .count()
}

// ===== Curriculum Overview =====

/// Mastery of one study-unit within a curriculum overview
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitMastery {
    pub study_unit: String,
    pub snapshot: MasterySnapshot,
}

/// Curriculum-wide rollup of unit snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumOverview {
    pub curriculum: String,
    pub units: Vec<UnitMastery>,
    /// Mean unit level; 0 for an empty curriculum
    pub average_level: f64,
    /// Units at level 3.0 or above
    pub secure_units: usize,
    pub due_today: usize,
}

impl CurriculumOverview {
    pub fn from_units(curriculum: impl Into<String>, units: Vec<UnitMastery>) -> Self {
        let average_level = if units.is_empty() {
            0.0
        } else {
            units.iter().map(|u| u.snapshot.level).sum::<f64>() / units.len() as f64
        };
        let secure_units = units.iter().filter(|u| u.snapshot.level >= 3.0).count();
        let due_today = units.iter().map(|u| u.snapshot.due_today).sum();

        Self {
            curriculum: curriculum.into(),
            units,
            average_level,
            secure_units,
            due_today,
        }
    }
}
