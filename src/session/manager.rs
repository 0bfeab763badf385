//! Session orchestration
//!
//! [`SessionManager`] is the crate's facade: it owns the card store, the
//! study configuration and the set of live sessions. A session walks its
//! cards through the `Answering → Submitted → Revealed → Assessed` phases;
//! each accepted assessment is persisted before the session advances, so
//! abandoning a session loses at most the draft answer of the current card.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::cards::models::{Card, NewCard, UnitKey};
use crate::cards::storage::{CardStore, StoreError};
use crate::config::StudyConfig;
use crate::mastery::{self, CurriculumOverview, MasterySnapshot, UnitMastery};
use crate::scheduler;
use crate::session::models::{
    AssessmentOutcome, CardPhase, CardPrompt, Session, SessionMode, SessionRecord, SessionStart,
    SessionSummary,
};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Operation requires the {expected:?} phase, but the card is {found:?}")]
    WrongPhase { expected: CardPhase, found: CardPhase },
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Facade over the study core: card ingestion, session orchestration and
/// mastery reads, all driving one [`CardStore`]
pub struct SessionManager {
    store: CardStore,
    config: StudyConfig,
    sessions: HashMap<Uuid, Session>,
}

impl SessionManager {
    /// Open a manager over the given data root, loading the study
    /// configuration stored there (or defaults)
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let store = CardStore::new(root)?;
        let config = StudyConfig::load_or_default(&store.config_path());
        Ok(Self {
            store,
            config,
            sessions: HashMap::new(),
        })
    }

    /// Open a manager in the platform data directory
    pub fn open_default() -> Result<Self> {
        let store = CardStore::open_default()?;
        let config = StudyConfig::load_or_default(&store.config_path());
        Ok(Self {
            store,
            config,
            sessions: HashMap::new(),
        })
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Replace and persist the study configuration
    pub fn set_config(&mut self, config: StudyConfig) -> Result<()> {
        config.save(&self.store.config_path())?;
        self.config = config;
        Ok(())
    }

    // ===== Ingestion =====

    /// Add one card produced by the content generator
    pub fn add_card(&self, unit: &UnitKey, draft: NewCard) -> Result<Card> {
        Ok(self.store.add_card(unit, draft)?)
    }

    /// Bulk ingestion; blank and duplicate drafts are skipped
    pub fn add_cards(&self, unit: &UnitKey, drafts: Vec<NewCard>) -> Result<Vec<Card>> {
        Ok(self.store.add_cards(unit, drafts)?)
    }

    // ===== Reads =====

    /// Cards currently due in a unit, most overdue first
    pub fn due_cards(&self, unit: &UnitKey) -> Result<Vec<Card>> {
        Ok(self.store.due_cards(unit, Utc::now())?)
    }

    /// Recompute the mastery snapshot of one unit
    pub fn mastery_snapshot(&self, unit: &UnitKey) -> Result<MasterySnapshot> {
        self.snapshot_at(unit, Utc::now())
    }

    fn snapshot_at(&self, unit: &UnitKey, now: DateTime<Utc>) -> Result<MasterySnapshot> {
        let cards = self.store.load_cards(unit)?;
        let sessions = self.store.load_sessions(unit)?;
        Ok(mastery::snapshot(
            &cards,
            &sessions,
            self.config.exam_date,
            now,
        ))
    }

    /// Study-units of a curriculum that hold cards
    pub fn list_units(&self, curriculum: &str) -> Result<Vec<String>> {
        Ok(self.store.list_units(curriculum)?)
    }

    /// Snapshot every unit of a curriculum and roll the results up
    pub fn curriculum_overview(&self, curriculum: &str) -> Result<CurriculumOverview> {
        let now = Utc::now();
        let mut units = Vec::new();
        for study_unit in self.store.list_units(curriculum)? {
            let unit = UnitKey::new(curriculum, &study_unit);
            units.push(UnitMastery {
                study_unit,
                snapshot: self.snapshot_at(&unit, now)?,
            });
        }
        Ok(CurriculumOverview::from_units(curriculum, units))
    }

    // ===== Session Lifecycle =====

    /// Start a study pass over a unit.
    ///
    /// Review draws the due cards (most overdue first); Practice draws every
    /// card in stored order. Either way the draw is capped by
    /// `max_cards_per_session` when configured. An empty draw returns
    /// [`SessionStart::NothingDue`] and creates no session.
    pub fn start_session(&mut self, unit: &UnitKey, mode: SessionMode) -> Result<SessionStart> {
        let mut cards = match mode {
            SessionMode::Review => self.store.due_cards(unit, Utc::now())?,
            SessionMode::Practice => self.store.load_cards(unit)?,
        };
        if let Some(cap) = self.config.max_cards_per_session {
            cards.truncate(cap);
        }
        if cards.is_empty() {
            log::info!("No cards to draw for {:?} session on {}", mode, unit);
            return Ok(SessionStart::NothingDue);
        }

        let drawn = cards.len();
        let session = Session::new(unit.clone(), mode, cards);
        let session_id = session.id();
        log::info!(
            "Started {:?} session {} on {} with {} cards",
            mode,
            session_id,
            unit,
            drawn
        );
        self.sessions.insert(session_id, session);
        Ok(SessionStart::Started {
            session_id,
            cards: drawn,
        })
    }

    /// View of the current card of a live session
    pub fn current_card(&self, session_id: Uuid) -> Result<CardPrompt> {
        Ok(self.session(session_id)?.prompt())
    }

    /// Lock in the learner's draft answer (`Answering → Submitted`)
    pub fn submit_answer(&mut self, session_id: Uuid, draft: impl Into<String>) -> Result<()> {
        let session = self.session_mut(session_id)?;
        require_phase(session, CardPhase::Answering)?;
        session.draft = draft.into();
        session.phase = CardPhase::Submitted;
        Ok(())
    }

    /// Show the canonical answer for comparison (`Submitted → Revealed`);
    /// returns the answer text
    pub fn reveal_answer(&mut self, session_id: Uuid) -> Result<String> {
        let session = self.session_mut(session_id)?;
        require_phase(session, CardPhase::Submitted)?;
        session.phase = CardPhase::Revealed;
        Ok(session.current_card().answer.clone())
    }

    /// Discard the draft and return the current card to `Answering`
    pub fn reset_card(&mut self, session_id: Uuid) -> Result<()> {
        let session = self.session_mut(session_id)?;
        session.draft.clear();
        session.phase = CardPhase::Answering;
        Ok(())
    }

    /// Accept a recall rating for the revealed card (`Revealed → Assessed`).
    ///
    /// The rating is clamped into 1..=5 and appended to the card's history.
    /// In Review mode the card is rescheduled first; in Practice mode its
    /// scheduling state is left untouched. The card is persisted before the
    /// session advances. Assessing the last card completes the session and
    /// appends its record to the unit's session log.
    pub fn submit_assessment(
        &mut self,
        session_id: Uuid,
        quality: i32,
    ) -> Result<AssessmentOutcome> {
        let now = Utc::now();
        let (mode, unit, mut card) = {
            let session = self.session_mut(session_id)?;
            require_phase(session, CardPhase::Revealed)?;
            (
                session.mode,
                session.unit.clone(),
                session.current_card().clone(),
            )
        };

        let quality = scheduler::clamp_quality(quality);
        if mode == SessionMode::Review {
            let outcome = scheduler::schedule(&self.config.scheduler, &card, quality, now);
            card.repetitions = outcome.repetitions;
            card.ease_factor = outcome.ease_factor;
            card.interval = outcome.interval;
            card.next_review_at = Some(outcome.next_review_at);
            card.last_reviewed_at = Some(now);
        }
        card.record_event(quality, now);

        self.store.update_card(&unit, &card)?;
        log::debug!("Assessed card {} in session {}: {}", card.id, session_id, quality);

        // Only advance once the card is safely on disk
        let session = self.session_mut(session_id)?;
        session.cards[session.current] = card;
        session.stats.record(quality);
        session.phase = CardPhase::Assessed;

        if session.is_last_card() {
            let summary = session.summary(now);
            self.sessions.remove(&session_id);
            self.record_session(&summary)?;
            Ok(AssessmentOutcome::Completed(summary))
        } else {
            session.current += 1;
            session.phase = CardPhase::Answering;
            session.draft.clear();
            Ok(AssessmentOutcome::Advanced {
                position: session.current + 1,
                total: session.cards.len(),
            })
        }
    }

    /// Abort a live session.
    ///
    /// Already-assessed cards stay persisted. A record is appended only
    /// when at least one card was assessed; a session nobody studied in
    /// leaves no trace.
    pub fn end_session(&mut self, session_id: Uuid) -> Result<SessionSummary> {
        let session = self
            .sessions
            .remove(&session_id)
            .ok_or(SessionError::SessionNotFound(session_id))?;
        let summary = session.summary(Utc::now());
        if summary.cards_assessed > 0 {
            self.record_session(&summary)?;
        }
        log::info!(
            "Ended session {} on {} after {} of {} cards",
            session_id,
            summary.unit,
            summary.cards_assessed,
            summary.cards_drawn
        );
        Ok(summary)
    }

    fn record_session(&self, summary: &SessionSummary) -> Result<()> {
        self.store
            .append_session(&summary.unit, SessionRecord::from_summary(summary))?;
        Ok(())
    }

    fn session(&self, session_id: Uuid) -> Result<&Session> {
        self.sessions
            .get(&session_id)
            .ok_or(SessionError::SessionNotFound(session_id))
    }

    fn session_mut(&mut self, session_id: Uuid) -> Result<&mut Session> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(SessionError::SessionNotFound(session_id))
    }
}

fn require_phase(session: &Session, expected: CardPhase) -> Result<()> {
    if session.phase == expected {
        Ok(())
    } else {
        Err(SessionError::WrongPhase {
            expected,
            found: session.phase,
        })
    }
}
