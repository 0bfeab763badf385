//! Mneme — spaced-repetition scheduling and mastery analytics.
//!
//! The core of a personal study/revision app: a JSON-backed card store
//! keyed by `(curriculum, study-unit)`, an SM-2 scheduler, a session
//! manager driving the per-card answer/reveal/assess flow, and a mastery
//! calculator that folds review history into a 0-5 proficiency level.
//!
//! Everything is driven through [`SessionManager`]:
//!
//! ```no_run
//! use mneme::{NewCard, SessionManager, SessionMode, SessionStart, UnitKey};
//!
//! # fn main() -> Result<(), mneme::SessionError> {
//! let mut manager = SessionManager::open_default()?;
//! let unit = UnitKey::new("aqa-psychology", "memory");
//!
//! manager.add_card(&unit, NewCard::new("What is the duration of STM?", "About 18-30 seconds"))?;
//!
//! match manager.start_session(&unit, SessionMode::Review)? {
//!     SessionStart::Started { session_id, .. } => {
//!         manager.submit_answer(session_id, "around 20 seconds")?;
//!         let answer = manager.reveal_answer(session_id)?;
//!         println!("canonical answer: {answer}");
//!         manager.submit_assessment(session_id, 4)?;
//!     }
//!     SessionStart::NothingDue => {
//!         // Nothing to review; ask the content generator for new cards
//!     }
//! }
//!
//! let snapshot = manager.mastery_snapshot(&unit)?;
//! println!("mastery level: {}", snapshot.level);
//! # Ok(())
//! # }
//! ```

pub mod cards;
pub mod config;
pub mod mastery;
pub mod scheduler;
pub mod session;

pub use cards::models::{Card, NewCard, ReviewEvent, ReviewLog, UnitKey, HISTORY_CAPACITY};
pub use cards::storage::{CardStore, StoreError, SESSION_RETENTION};
pub use config::StudyConfig;
pub use mastery::{CurriculumOverview, FactorScores, MasteryBand, MasterySnapshot, UnitMastery};
pub use scheduler::{
    clamp_quality, preview_intervals, schedule, LapseRequeue, ScheduleOutcome, SchedulerPolicy,
    MIN_EASE_FACTOR,
};
pub use session::manager::{SessionError, SessionManager};
pub use session::models::{
    AssessmentOutcome, CardPhase, CardPrompt, SessionMode, SessionRecord, SessionStart,
    SessionStats, SessionSummary,
};
