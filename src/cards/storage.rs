//! Persistent card and session-record storage
//!
//! Layout under the data root:
//! ```text
//! <root>/
//!   config.json                      study configuration
//!   units/
//!     <curriculum>/
//!       <study-unit>/
//!         cards.json                 ordered card array
//!         sessions.json              most recent session records
//! ```
//!
//! Loads are forgiving: a missing or malformed document is substituted
//! with an empty collection and logged, so one corrupted unit can never
//! take the rest of the store down. Writes propagate real I/O failures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::cards::models::{Card, NewCard, UnitKey};
use crate::session::models::SessionRecord;

const UNITS_DIR: &str = "units";
const CARDS_FILE: &str = "cards.json";
const SESSIONS_FILE: &str = "sessions.json";
const CONFIG_FILE: &str = "config.json";

/// Session records kept per unit; the oldest is dropped first
pub const SESSION_RETENTION: usize = 20;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid unit key component: {0:?}")]
    InvalidKey(String),

    #[error("Card {0} not found")]
    CardNotFound(Uuid),

    #[error("Invalid card content: {0}")]
    InvalidCard(String),

    #[error("Could not determine data directory")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable keyed collection of cards and session records, one directory
/// per `(curriculum, study-unit)`
pub struct CardStore {
    root: PathBuf,
}

impl CardStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(UNITS_DIR))?;
        Ok(Self { root })
    }

    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self> {
        let dir = Self::default_data_dir().ok_or(StoreError::DataDirNotFound)?;
        Self::new(dir)
    }

    /// Platform-local data directory, e.g. ~/.local/share/mneme
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("mneme"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the study configuration document lives
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    fn unit_dir(&self, unit: &UnitKey) -> Result<PathBuf> {
        validate_component(&unit.curriculum)?;
        validate_component(&unit.study_unit)?;
        Ok(self
            .root
            .join(UNITS_DIR)
            .join(&unit.curriculum)
            .join(&unit.study_unit))
    }

    fn cards_path(&self, unit: &UnitKey) -> Result<PathBuf> {
        Ok(self.unit_dir(unit)?.join(CARDS_FILE))
    }

    fn sessions_path(&self, unit: &UnitKey) -> Result<PathBuf> {
        Ok(self.unit_dir(unit)?.join(SESSIONS_FILE))
    }

    // ===== Card Operations =====

    /// All cards of a unit in stored order; missing or malformed
    /// documents come back empty
    pub fn load_cards(&self, unit: &UnitKey) -> Result<Vec<Card>> {
        self.load_document(&self.cards_path(unit)?, "card")
    }

    pub fn save_cards(&self, unit: &UnitKey, cards: &[Card]) -> Result<()> {
        self.save_document(&self.cards_path(unit)?, cards)
    }

    /// Add a single card; both strings must be non-empty
    pub fn add_card(&self, unit: &UnitKey, draft: NewCard) -> Result<Card> {
        if draft.question.trim().is_empty() {
            return Err(StoreError::InvalidCard("question must not be empty".into()));
        }
        if draft.answer.trim().is_empty() {
            return Err(StoreError::InvalidCard("answer must not be empty".into()));
        }

        let mut cards = self.load_cards(unit)?;
        let card = Card::new(draft.question, draft.answer, draft.tag);
        cards.push(card.clone());
        self.save_cards(unit, &cards)?;
        log::debug!("Added card {} to {}", card.id, unit);
        Ok(card)
    }

    /// Bulk ingestion from the content generator. Drafts with blank text
    /// are skipped with a warning; drafts whose question already exists in
    /// the unit are skipped silently so re-ingesting a batch is harmless.
    /// Returns the cards actually added.
    pub fn add_cards(&self, unit: &UnitKey, drafts: Vec<NewCard>) -> Result<Vec<Card>> {
        let mut cards = self.load_cards(unit)?;
        let mut questions: HashSet<String> = cards
            .iter()
            .map(|c| c.question.trim().to_string())
            .collect();

        let mut added = Vec::new();
        for draft in drafts {
            if draft.question.trim().is_empty() || draft.answer.trim().is_empty() {
                log::warn!("Skipping card with blank question or answer for {}", unit);
                continue;
            }
            if !questions.insert(draft.question.trim().to_string()) {
                log::debug!("Skipping duplicate question for {}", unit);
                continue;
            }
            let card = Card::new(draft.question, draft.answer, draft.tag);
            cards.push(card.clone());
            added.push(card);
        }

        if !added.is_empty() {
            self.save_cards(unit, &cards)?;
            log::info!("Added {} cards to {}", added.len(), unit);
        }
        Ok(added)
    }

    /// Write one card back into its unit document
    pub fn update_card(&self, unit: &UnitKey, card: &Card) -> Result<()> {
        let mut cards = self.load_cards(unit)?;
        match cards.iter_mut().find(|c| c.id == card.id) {
            Some(slot) => *slot = card.clone(),
            None => return Err(StoreError::CardNotFound(card.id)),
        }
        self.save_cards(unit, &cards)
    }

    /// Cards due at `now`, never-reviewed first, then earliest due
    pub fn due_cards(&self, unit: &UnitKey, now: DateTime<Utc>) -> Result<Vec<Card>> {
        let mut due: Vec<Card> = self
            .load_cards(unit)?
            .into_iter()
            .filter(|c| c.is_due(now))
            .collect();
        due.sort_by(|a, b| a.next_review_at.cmp(&b.next_review_at));
        Ok(due)
    }

    // ===== Session Records =====

    /// Retained session records of a unit, oldest first
    pub fn load_sessions(&self, unit: &UnitKey) -> Result<Vec<SessionRecord>> {
        self.load_document(&self.sessions_path(unit)?, "session record")
    }

    /// Append one record, dropping the oldest past [`SESSION_RETENTION`]
    pub fn append_session(&self, unit: &UnitKey, record: SessionRecord) -> Result<()> {
        let mut records = self.load_sessions(unit)?;
        records.push(record);
        if records.len() > SESSION_RETENTION {
            let excess = records.len() - SESSION_RETENTION;
            records.drain(..excess);
        }
        self.save_document(&self.sessions_path(unit)?, &records)
    }

    // ===== Unit Listing =====

    /// Study-units of a curriculum that have a card document, sorted by name
    pub fn list_units(&self, curriculum: &str) -> Result<Vec<String>> {
        validate_component(curriculum)?;
        let dir = self.root.join(UNITS_DIR).join(curriculum);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut units = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() && path.join(CARDS_FILE).exists() {
                if let Some(name) = entry.file_name().to_str() {
                    units.push(name.to_string());
                }
            }
        }
        units.sort();
        Ok(units)
    }

    // ===== Documents =====

    fn load_document<T: DeserializeOwned>(&self, path: &Path, what: &str) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(items) => Ok(items),
            Err(e) => {
                log::warn!(
                    "Malformed {} document at {:?}, substituting empty: {}",
                    what,
                    path,
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn save_document<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(items)?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn validate_component(part: &str) -> Result<()> {
    let ok = !part.trim().is_empty()
        && part != "."
        && part != ".."
        && !part.chars().any(|c| c == '/' || c == '\\');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(part.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::{SessionMode, SessionStats};
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (CardStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = CardStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn unit() -> UnitKey {
        UnitKey::new("aqa-psychology", "social-influence")
    }

    fn record(cards_assessed: u32, completed_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            mode: SessionMode::Review,
            completed_at,
            cards_assessed,
            stats: SessionStats {
                again: 0,
                hard: 0,
                perfect: cards_assessed,
            },
            success_rate: 100.0,
        }
    }

    #[test]
    fn test_missing_unit_loads_empty() {
        let (store, _temp) = create_test_store();
        assert!(store.load_cards(&unit()).unwrap().is_empty());
        assert!(store.load_sessions(&unit()).unwrap().is_empty());
    }

    #[test]
    fn test_add_card_rejects_blank_content() {
        let (store, _temp) = create_test_store();

        let no_question = store.add_card(&unit(), NewCard::new("   ", "an answer"));
        assert!(matches!(no_question, Err(StoreError::InvalidCard(_))));

        let no_answer = store.add_card(&unit(), NewCard::new("a question", ""));
        assert!(matches!(no_answer, Err(StoreError::InvalidCard(_))));

        assert!(store.load_cards(&unit()).unwrap().is_empty());
    }

    #[test]
    fn test_add_cards_skips_blanks_and_duplicates() {
        let (store, _temp) = create_test_store();
        let batch = vec![
            NewCard::new("What is conformity?", "Yielding to group pressure"),
            NewCard::new("", "orphan answer"),
            NewCard::new("What is obedience?", "Following a direct order"),
            NewCard::new("What is conformity?", "Duplicate in the same batch"),
        ];

        let added = store.add_cards(&unit(), batch.clone()).unwrap();
        assert_eq!(added.len(), 2);

        // Re-ingesting the same batch adds nothing
        let again = store.add_cards(&unit(), batch).unwrap();
        assert!(again.is_empty());
        assert_eq!(store.load_cards(&unit()).unwrap().len(), 2);
    }

    #[test]
    fn test_update_card_persists_changes() {
        let (store, _temp) = create_test_store();
        let mut card = store
            .add_card(&unit(), NewCard::new("q", "a"))
            .unwrap();

        card.repetitions = 2;
        card.ease_factor = 2.7;
        card.interval = 6;
        card.next_review_at = Some(Utc::now() + Duration::days(6));
        card.record_event(5, Utc::now());
        store.update_card(&unit(), &card).unwrap();

        let reloaded = store.load_cards(&unit()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0], card);
    }

    #[test]
    fn test_update_unknown_card_errors() {
        let (store, _temp) = create_test_store();
        store.add_card(&unit(), NewCard::new("q", "a")).unwrap();

        let stray = Card::new("other".to_string(), "card".to_string(), None);
        let result = store.update_card(&unit(), &stray);
        assert!(matches!(result, Err(StoreError::CardNotFound(id)) if id == stray.id));
    }

    #[test]
    fn test_due_cards_sorted_never_reviewed_first() {
        let (store, _temp) = create_test_store();
        let now = Utc::now();

        let mut scheduled_out = store.add_card(&unit(), NewCard::new("q1", "a1")).unwrap();
        scheduled_out.next_review_at = Some(now + Duration::hours(1));
        store.update_card(&unit(), &scheduled_out).unwrap();

        let mut overdue_long = store.add_card(&unit(), NewCard::new("q2", "a2")).unwrap();
        overdue_long.next_review_at = Some(now - Duration::hours(2));
        store.update_card(&unit(), &overdue_long).unwrap();

        let mut overdue_short = store.add_card(&unit(), NewCard::new("q3", "a3")).unwrap();
        overdue_short.next_review_at = Some(now - Duration::hours(1));
        store.update_card(&unit(), &overdue_short).unwrap();

        let fresh = store.add_card(&unit(), NewCard::new("q4", "a4")).unwrap();

        let due = store.due_cards(&unit(), now).unwrap();
        let ids: Vec<Uuid> = due.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![fresh.id, overdue_long.id, overdue_short.id]);
    }

    #[test]
    fn test_malformed_cards_document_recovers_empty() {
        let (store, _temp) = create_test_store();
        store.add_card(&unit(), NewCard::new("q", "a")).unwrap();

        let path = store.cards_path(&unit()).unwrap();
        fs::write(&path, "{ not json at all").unwrap();

        assert!(store.load_cards(&unit()).unwrap().is_empty());

        // The unit is usable again after recovery
        store.add_card(&unit(), NewCard::new("q2", "a2")).unwrap();
        assert_eq!(store.load_cards(&unit()).unwrap().len(), 1);
    }

    #[test]
    fn test_session_log_retention_keeps_newest() {
        let (store, _temp) = create_test_store();
        let start = Utc::now();

        for i in 0..(SESSION_RETENTION as u32 + 5) {
            let at = start + Duration::minutes(i as i64);
            store.append_session(&unit(), record(i, at)).unwrap();
        }

        let records = store.load_sessions(&unit()).unwrap();
        assert_eq!(records.len(), SESSION_RETENTION);
        // The five oldest were dropped
        assert_eq!(records[0].cards_assessed, 5);
        assert_eq!(
            records.last().unwrap().cards_assessed,
            SESSION_RETENTION as u32 + 4
        );
    }

    #[test]
    fn test_list_units_sorted() {
        let (store, _temp) = create_test_store();
        store
            .add_card(&UnitKey::new("aqa", "unit-b"), NewCard::new("q", "a"))
            .unwrap();
        store
            .add_card(&UnitKey::new("aqa", "unit-a"), NewCard::new("q", "a"))
            .unwrap();
        store
            .add_card(&UnitKey::new("ocr", "unit-z"), NewCard::new("q", "a"))
            .unwrap();

        assert_eq!(store.list_units("aqa").unwrap(), vec!["unit-a", "unit-b"]);
        assert_eq!(store.list_units("edexcel").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_invalid_unit_key_rejected() {
        let (store, _temp) = create_test_store();

        for bad in ["", "  ", ".", "..", "a/b", "a\\b"] {
            let result = store.load_cards(&UnitKey::new(bad, "unit"));
            assert!(matches!(result, Err(StoreError::InvalidKey(_))), "{bad:?}");
        }
    }

    #[test]
    fn test_cards_roundtrip_between_store_instances() {
        let temp_dir = TempDir::new().unwrap();
        let card = {
            let store = CardStore::new(temp_dir.path()).unwrap();
            let mut card = store.add_card(&unit(), NewCard::new("q", "a")).unwrap();
            card.repetitions = 3;
            card.ease_factor = 2.36;
            card.interval = 15;
            card.next_review_at = Some(Utc::now() + Duration::days(15));
            card.last_reviewed_at = Some(Utc::now());
            card.record_event(4, Utc::now());
            store.update_card(&unit(), &card).unwrap();
            card
        };

        let reopened = CardStore::new(temp_dir.path()).unwrap();
        let cards = reopened.load_cards(&unit()).unwrap();
        assert_eq!(cards, vec![card]);
    }
}
