//! Data models for the Glosor application.
//!
//! - [`Word`] and [`Answer`]: the vocabulary pair and a recorded response to it
//! - [`Language`]: the two languages the quiz speaks
//! - [`AppState`]: the central state container (phase, vocabulary, quiz session, settings)
//! - [`UserConfig`]: user preferences loaded from `Glosor Settings.yaml`
//!
//! State updates go through [`StateManager`](crate::state::StateManager) so
//! that every mutation emits the matching change events.

pub mod app_state;
pub mod config;
pub mod word;

pub use app_state::{AppPhase, AppState, VocabularyState};
pub use config::{
    DEFAULT_SHEET_URL, LoggingSettings, QuizSettings, SpeechSettings, UserConfig,
    VocabularySettings,
};
pub use word::{Answer, Language, Word};
