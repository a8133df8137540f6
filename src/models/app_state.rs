use crate::models::Word;
use crate::services::quiz::QuizEngine;
use crate::services::summary::QuizSummary;
use std::fmt;

/// Which view of the application is active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppPhase {
    /// Vocabulary is being fetched
    Loading,

    /// Vocabulary could not be loaded; the only way on is a full reload
    Failed(String),

    /// A quiz session is running
    Quiz,

    /// The session is complete and the summary is shown
    Result,
}

impl fmt::Display for AppPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppPhase::Loading => f.write_str("loading"),
            AppPhase::Failed(_) => f.write_str("failed"),
            AppPhase::Quiz => f.write_str("quiz"),
            AppPhase::Result => f.write_str("result"),
        }
    }
}

/// Loading/error/data tri-state published by the vocabulary loader.
///
/// `error` and a non-empty `words` are never set at the same time: a failed
/// load discards any partial list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VocabularyState {
    pub loading: bool,
    pub error: Option<String>,
    pub words: Vec<Word>,
}

impl VocabularyState {
    /// Enter the loading state, clearing any previous error.
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Publish a successfully parsed vocabulary set.
    pub fn succeed(&mut self, words: Vec<Word>) {
        self.words = words;
        self.error = None;
        self.loading = false;
    }

    /// Publish a load failure.
    pub fn fail(&mut self, message: String) {
        self.words.clear();
        self.error = Some(message);
        self.loading = false;
    }

    pub fn is_ready(&self) -> bool {
        !self.loading && self.error.is_none() && !self.words.is_empty()
    }
}

/// Single source of truth for all application state.
///
/// `AppState` is wrapped by [`crate::state::StateManager`], which owns every
/// mutation and emits [`crate::state::StateChange`] events for the
/// presentation shell and the speech bridge.
#[derive(Clone, Debug)]
pub struct AppState {
    pub phase: AppPhase,
    pub vocabulary: VocabularyState,
    pub quiz: QuizEngine,

    /// Summary of the last completed session
    pub summary: Option<QuizSummary>,

    // Settings
    pub read_aloud: bool,
    pub speech_supported: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            phase: AppPhase::Loading,
            vocabulary: VocabularyState::default(),
            quiz: QuizEngine::new(),
            summary: None,
            read_aloud: false,
            speech_supported: false,
        }
    }
}

impl AppState {
    /// Words currently available for a session.
    pub fn words(&self) -> &[Word] {
        &self.vocabulary.words
    }

    /// Read-aloud only has an effect when speech exists on this machine.
    pub fn should_speak(&self) -> bool {
        self.read_aloud && self.speech_supported
    }

    /// Drop session and result state, keeping vocabulary and settings.
    pub fn reset_session(&mut self) {
        self.quiz = QuizEngine::new();
        self.summary = None;
        if self.vocabulary.is_ready() {
            self.phase = AppPhase::Quiz;
        }
    }
}
