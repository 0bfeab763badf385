//! Session state, summaries, and persisted session records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cards::models::{Card, UnitKey};

/// How a session treats scheduling state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Due cards only; every assessment reschedules and persists its card
    Review,
    /// Every card regardless of due status; assessments touch history only
    Practice,
}

/// Interaction phase of the current card, forward-only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPhase {
    /// Question shown, learner drafting an answer
    Answering,
    /// Draft answer locked in
    Submitted,
    /// Canonical answer shown for comparison
    Revealed,
    /// Rating accepted; the session advances
    Assessed,
}

/// Outcome buckets accumulated over one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Quality 1-2
    pub again: u32,
    /// Quality 3
    pub hard: u32,
    /// Quality 4-5
    pub perfect: u32,
}

impl SessionStats {
    /// Bucket one clamped rating
    pub fn record(&mut self, quality: i32) {
        if quality >= 4 {
            self.perfect += 1;
        } else if quality == 3 {
            self.hard += 1;
        } else {
            self.again += 1;
        }
    }

    pub fn assessed(&self) -> u32 {
        self.again + self.hard + self.perfect
    }

    /// Percent score — perfect counts full, hard counts half; 0 when empty
    pub fn success_rate(&self) -> f64 {
        let assessed = self.assessed();
        if assessed == 0 {
            return 0.0;
        }
        (self.perfect as f64 + 0.5 * self.hard as f64) / assessed as f64 * 100.0
    }
}

/// One study pass over a unit. Held in memory by the session manager and
/// discarded at the end — per-card effects are persisted as they happen.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) unit: UnitKey,
    pub(crate) mode: SessionMode,
    pub(crate) cards: Vec<Card>,
    pub(crate) current: usize,
    pub(crate) phase: CardPhase,
    pub(crate) draft: String,
    pub(crate) stats: SessionStats,
    pub(crate) started_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(unit: UnitKey, mode: SessionMode, cards: Vec<Card>) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit,
            mode,
            cards,
            current: 0,
            phase: CardPhase::Answering,
            draft: String::new(),
            stats: SessionStats::default(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// The current card; a live session always has one
    pub(crate) fn current_card(&self) -> &Card {
        &self.cards[self.current]
    }

    pub(crate) fn is_last_card(&self) -> bool {
        self.current + 1 == self.cards.len()
    }

    /// View of the current card for the UI
    pub fn prompt(&self) -> CardPrompt {
        let card = self.current_card();
        CardPrompt {
            position: self.current + 1,
            total: self.cards.len(),
            question: card.question.clone(),
            tag: card.tag.clone(),
            phase: self.phase,
            draft: self.draft.clone(),
        }
    }

    pub(crate) fn summary(&self, ended_at: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            unit: self.unit.clone(),
            mode: self.mode,
            started_at: self.started_at,
            ended_at,
            cards_drawn: self.cards.len(),
            cards_assessed: self.stats.assessed(),
            stats: self.stats,
            success_rate: self.stats.success_rate(),
        }
    }
}

/// What the UI needs to render the current card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPrompt {
    /// 1-based position within the session
    pub position: usize,
    pub total: usize,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub phase: CardPhase,
    /// Transient draft answer; empty until submitted
    pub draft: String,
}

/// Returned when a session ends, by completion or abort
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub unit: UnitKey,
    pub mode: SessionMode,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub cards_drawn: usize,
    pub cards_assessed: u32,
    pub stats: SessionStats,
    pub success_rate: f64,
}

/// Persisted summary of a finished session, kept per unit (most recent
/// first to drop, see the store's retention cap)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub mode: SessionMode,
    pub completed_at: DateTime<Utc>,
    pub cards_assessed: u32,
    pub stats: SessionStats,
    pub success_rate: f64,
}

impl SessionRecord {
    pub(crate) fn from_summary(summary: &SessionSummary) -> Self {
        Self {
            id: summary.session_id,
            mode: summary.mode,
            completed_at: summary.ended_at,
            cards_assessed: summary.cards_assessed,
            stats: summary.stats,
            success_rate: summary.success_rate,
        }
    }
}

/// Result of asking for a new session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStart {
    /// Session registered under this id, first card in `Answering`
    Started { session_id: Uuid, cards: usize },
    /// Review found nothing due (or Practice found an empty unit); no
    /// session was created. The caller falls back to content generation.
    NothingDue,
}

/// What happened after an assessment was accepted
#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentOutcome {
    /// Moved to the next card's `Answering` phase
    Advanced { position: usize, total: usize },
    /// That was the last card; the session is finished and recorded
    Completed(SessionSummary),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_bucket_by_quality() {
        let mut stats = SessionStats::default();
        for quality in [1, 2, 3, 4, 5] {
            stats.record(quality);
        }

        assert_eq!(stats.again, 2);
        assert_eq!(stats.hard, 1);
        assert_eq!(stats.perfect, 2);
        assert_eq!(stats.assessed(), 5);
    }

    #[test]
    fn test_success_rate_counts_hard_as_half() {
        let stats = SessionStats {
            again: 1,
            hard: 2,
            perfect: 2,
        };
        // (2 + 2*0.5) / 5 = 60%
        assert_eq!(stats.success_rate(), 60.0);
    }

    #[test]
    fn test_success_rate_of_empty_session_is_zero() {
        assert_eq!(SessionStats::default().success_rate(), 0.0);
    }

    #[test]
    fn test_session_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SessionMode::Review).unwrap(), "\"review\"");
        assert_eq!(serde_json::to_string(&SessionMode::Practice).unwrap(), "\"practice\"");
    }

    #[test]
    fn test_prompt_reflects_session_cursor() {
        let cards = vec![
            Card::new("q1".to_string(), "a1".to_string(), Some("biology".to_string())),
            Card::new("q2".to_string(), "a2".to_string(), None),
        ];
        let session = Session::new(UnitKey::new("aqa", "cells"), SessionMode::Review, cards);

        let prompt = session.prompt();
        assert_eq!(prompt.position, 1);
        assert_eq!(prompt.total, 2);
        assert_eq!(prompt.question, "q1");
        assert_eq!(prompt.tag.as_deref(), Some("biology"));
        assert_eq!(prompt.phase, CardPhase::Answering);
        assert!(prompt.draft.is_empty());
    }
}
