//! Card data model and per-card review history

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Maximum review events retained per card; the oldest is evicted first
pub const HISTORY_CAPACITY: usize = 50;

/// Address of one card collection: a study-unit within a curriculum
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitKey {
    pub curriculum: String,
    pub study_unit: String,
}

impl UnitKey {
    pub fn new(curriculum: impl Into<String>, study_unit: impl Into<String>) -> Self {
        Self {
            curriculum: curriculum.into(),
            study_unit: study_unit.into(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.curriculum, self.study_unit)
    }
}

/// Card content as delivered by the external content generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl NewCard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            tag: None,
        }
    }
}

/// One self-assessed recall of a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub timestamp: DateTime<Utc>,
    /// Recall quality, 1 (total blackout) to 5 (perfect)
    pub quality: i32,
}

/// Bounded ring of the most recent review events for one card.
///
/// Pushing past [`HISTORY_CAPACITY`] evicts the oldest event. Serializes as
/// a plain array (oldest first); deserialization re-applies the cap so an
/// oversized document loads back to at most 50 events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReviewLog(VecDeque<ReviewEvent>);

impl ReviewLog {
    pub fn new() -> Self {
        Self(VecDeque::new())
    }

    /// Append an event, dropping the oldest one past capacity
    pub fn push(&mut self, event: ReviewEvent) {
        if self.0.len() == HISTORY_CAPACITY {
            self.0.pop_front();
        }
        self.0.push_back(event);
    }

    /// Most recent assessment, for the "last assessed at X, scored Y" view
    pub fn latest(&self) -> Option<&ReviewEvent> {
        self.0.back()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Events oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ReviewEvent> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for ReviewLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut events = VecDeque::<ReviewEvent>::deserialize(deserializer)?;
        while events.len() > HISTORY_CAPACITY {
            events.pop_front();
        }
        Ok(Self(events))
    }
}

/// A flashcard with its scheduling state and review history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Consecutive successful recalls since the last lapse
    #[serde(default)]
    pub repetitions: u32,
    /// Interval growth multiplier, never below 1.3
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    /// Last computed spacing in days
    #[serde(default)]
    pub interval: i64,
    /// When the card is next due; `None` means immediately due
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: ReviewLog,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_ease_factor() -> f64 {
    2.5
}

impl Card {
    /// Create a fresh, immediately-due card
    pub fn new(question: String, answer: String, tag: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            question,
            answer,
            tag,
            repetitions: 0,
            ease_factor: default_ease_factor(),
            interval: 0,
            next_review_at: None,
            last_reviewed_at: None,
            history: ReviewLog::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A card is due when it has never been scheduled or its schedule has arrived
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_review_at {
            Some(at) => now >= at,
            None => true,
        }
    }

    /// Record an assessed answer in the history ring
    pub fn record_event(&mut self, quality: i32, now: DateTime<Utc>) {
        self.history.push(ReviewEvent {
            timestamp: now,
            quality,
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(quality: i32) -> ReviewEvent {
        ReviewEvent {
            timestamp: Utc::now(),
            quality,
        }
    }

    #[test]
    fn test_fresh_card_is_always_due() {
        let card = Card::new("q".to_string(), "a".to_string(), None);
        assert!(card.is_due(Utc::now()));
        assert!(card.is_due(Utc::now() - Duration::days(365)));
    }

    #[test]
    fn test_scheduled_card_becomes_due() {
        let mut card = Card::new("q".to_string(), "a".to_string(), None);
        let now = Utc::now();
        card.next_review_at = Some(now + Duration::days(3));

        assert!(!card.is_due(now));
        assert!(card.is_due(now + Duration::days(3)));
        assert!(card.is_due(now + Duration::days(10)));
    }

    #[test]
    fn test_history_evicts_oldest_past_capacity() {
        let mut log = ReviewLog::new();
        for quality in 0..(HISTORY_CAPACITY as i32 + 10) {
            log.push(event(quality));
        }

        assert_eq!(log.len(), HISTORY_CAPACITY);
        // The first ten events were dropped
        assert_eq!(log.iter().next().map(|e| e.quality), Some(10));
        assert_eq!(log.latest().map(|e| e.quality), Some(HISTORY_CAPACITY as i32 + 9));
    }

    #[test]
    fn test_history_deserialize_recaps_oversized_document() {
        let mut log = ReviewLog::new();
        for quality in 0..HISTORY_CAPACITY as i32 {
            log.push(event(quality));
        }
        let mut json: Vec<ReviewEvent> = log.iter().cloned().collect();
        // Tampered document with twice the allowed events
        let mut extra = json.clone();
        json.append(&mut extra);
        let text = serde_json::to_string(&json).unwrap();

        let reloaded: ReviewLog = serde_json::from_str(&text).unwrap();
        assert_eq!(reloaded.len(), HISTORY_CAPACITY);
        // Only the tail survives
        assert_eq!(reloaded.iter().next().map(|e| e.quality), Some(0));
        assert_eq!(reloaded.latest().map(|e| e.quality), Some(HISTORY_CAPACITY as i32 - 1));
    }

    #[test]
    fn test_card_loads_with_missing_scheduling_fields() {
        let json = r#"{
            "id": "6f8f3f9e-6a57-4f6a-9d4e-2f8a1b3c5d7e",
            "question": "What is conformity?",
            "answer": "Yielding to group pressure",
            "createdAt": "2026-01-10T09:00:00Z",
            "updatedAt": "2026-01-10T09:00:00Z"
        }"#;

        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.repetitions, 0);
        assert_eq!(card.ease_factor, 2.5);
        assert_eq!(card.interval, 0);
        assert!(card.next_review_at.is_none());
        assert!(card.history.is_empty());
        assert!(card.is_due(Utc::now()));
    }

    #[test]
    fn test_record_event_appends_to_history() {
        let mut card = Card::new("q".to_string(), "a".to_string(), None);
        let now = Utc::now();
        card.record_event(4, now);
        card.record_event(2, now + Duration::minutes(1));

        assert_eq!(card.history.len(), 2);
        let last = card.history.latest().unwrap();
        assert_eq!(last.quality, 2);
        assert_eq!(last.timestamp, now + Duration::minutes(1));
    }
}
