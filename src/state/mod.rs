// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for the terminal shell and the speech bridge.

use crate::models::{Answer, AppPhase, AppState, UserConfig, Word};
use crate::services::quiz::{QuizError, StartOutcome};
use crate::services::summary::summarize;
use crate::services::vocabulary::{LoadError, VocabularyLoader, VocabularySource};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// Listeners (the speech bridge, the shell) react to these instead of
/// polling the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The active view changed
    PhaseChanged { phase: AppPhase },

    /// A vocabulary fetch has started
    VocabularyLoading,

    /// The vocabulary set is available
    VocabularyLoaded { count: usize },

    /// The vocabulary could not be loaded; `message` is user-facing
    VocabularyFailed { message: String },

    /// A freshly shuffled session began
    QuizStarted { total: usize },

    /// A word is being shown to the user (emitted explicitly by the shell)
    WordPresented {
        index: usize,
        total: usize,
        swedish: String,
    },

    /// The engine moved to another word
    ProgressUpdated { current: usize, total: usize },

    /// The correct answer was shown before answering
    AnswerRevealed { english: String },

    /// An answer was recorded
    AnswerGraded {
        swedish: String,
        english: String,
        correct: bool,
        manual_correction: bool,
    },

    /// Every word has been answered
    QuizCompleted {
        correct: usize,
        total: usize,
        percentage: u32,
    },

    /// Read-aloud was switched on or off
    ReadAloudChanged { enabled: bool },

    /// The session was thrown away and restarted
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// This is the central state management component that:
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Drives the quiz engine and publishes the result summary
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// The lock is only ever held inside synchronous closures, never across an
/// await point.
///
/// # Related Types
///
/// - [`crate::models::AppState`]: The underlying state structure
/// - [`StateChange`]: Event types emitted on state mutations
/// - [`crate::ui::bridge::EventBridge`]: Speaks words in reaction to events
/// - [`crate::ui::controller::TerminalController`]: Primary driver of mutations
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state and a 100 event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, AppState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a clone of the current state
    pub fn snapshot(&self) -> AppState {
        self.read_lock().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let word = state_manager.read(|state| state.quiz.current_word().cloned());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.read_lock();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, then emits one event per
    /// detected difference. Returns the emitted events.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.write_lock();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = self.detect_changes(&old_state, &state);
        for change in &changes {
            // No listeners is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Like [`update`](Self::update), for fallible mutations.
    ///
    /// The closure's value is returned alongside the emitted events. A
    /// failing closure must leave the state untouched.
    fn try_update<T, F>(&self, update_fn: F) -> Result<(T, Vec<StateChange>), QuizError>
    where
        F: FnOnce(&mut AppState) -> Result<T, QuizError>,
    {
        let mut result = None;
        let changes = self.update(|state| result = Some(update_fn(state)));

        match result {
            Some(Ok(value)) => Ok((value, changes)),
            Some(Err(e)) => {
                tracing::warn!("Rejected quiz operation: {}", e);
                Err(e)
            }
            None => unreachable!("update closure always runs"),
        }
    }

    /// Emit an event that is not derived from a state difference
    fn emit(&self, change: StateChange) -> StateChange {
        let _ = self.state_tx.send(change.clone());
        change
    }

    /// Subscribe to state change events
    ///
    /// Returns a receiver that will get notified of all future state changes.
    /// Multiple subscribers can listen simultaneously.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Detect what changed between two states and generate events
    fn detect_changes(&self, old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.phase != new.phase {
            changes.push(StateChange::PhaseChanged {
                phase: new.phase.clone(),
            });
        }

        // Vocabulary load lifecycle
        if !old.vocabulary.loading && new.vocabulary.loading {
            changes.push(StateChange::VocabularyLoading);
        } else if old.vocabulary.loading && !new.vocabulary.loading {
            match &new.vocabulary.error {
                Some(message) => changes.push(StateChange::VocabularyFailed {
                    message: message.clone(),
                }),
                None => changes.push(StateChange::VocabularyLoaded {
                    count: new.vocabulary.words.len(),
                }),
            }
        }

        // New session
        if old.quiz.session() != new.quiz.session() && new.quiz.is_started() {
            changes.push(StateChange::QuizStarted {
                total: new.quiz.len(),
            });
        }

        if old.quiz.progress() != new.quiz.progress() {
            if let Some(progress) = new.quiz.progress() {
                changes.push(StateChange::ProgressUpdated {
                    current: progress.current,
                    total: progress.total,
                });
            }
        }

        if !old.quiz.is_complete() && new.quiz.is_complete() {
            if let Some(summary) = &new.summary {
                changes.push(StateChange::QuizCompleted {
                    correct: summary.correct_count,
                    total: summary.total_count,
                    percentage: summary.percentage,
                });
            }
        }

        if old.read_aloud != new.read_aloud {
            changes.push(StateChange::ReadAloudChanged {
                enabled: new.read_aloud,
            });
        }

        changes
    }

    // Vocabulary

    /// Enter the loading state
    pub fn begin_loading(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.vocabulary.begin();
            state.phase = AppPhase::Loading;
        })
    }

    /// Publish the outcome of a load.
    ///
    /// Success makes the words available and switches to the quiz view. A
    /// failure discards any previous list and session.
    pub fn finish_loading(&self, result: &Result<Vec<Word>, LoadError>) -> Vec<StateChange> {
        self.update(|state| match result {
            Ok(words) => {
                state.vocabulary.succeed(words.clone());
                state.reset_session();
            }
            Err(e) => {
                let message = e.user_message();
                state.vocabulary.fail(message.clone());
                state.reset_session();
                state.phase = AppPhase::Failed(message);
            }
        })
    }

    /// Run one fetch through `loader` and publish the result.
    ///
    /// Returns the number of words loaded.
    pub async fn load_vocabulary<S: VocabularySource>(
        &self,
        loader: &VocabularyLoader<S>,
    ) -> Result<usize, LoadError> {
        self.begin_loading();
        let result = loader.load().await;
        self.finish_loading(&result);
        result.map(|words| words.len())
    }

    // Quiz

    /// Start a session over the loaded words.
    ///
    /// A session already running over the same words is left alone.
    pub fn start_quiz(&self) -> Result<StartOutcome, QuizError> {
        self.try_update(|state| {
            let words = state.vocabulary.words.clone();
            let outcome = state.quiz.start(words)?;
            if outcome == StartOutcome::Started {
                state.summary = None;
            }
            state.phase = AppPhase::Quiz;
            Ok(outcome)
        })
        .map(|(outcome, _)| outcome)
    }

    /// Announce the word currently awaiting an answer.
    ///
    /// The shell calls this each time it renders a word; listeners use it
    /// to read the Swedish term aloud.
    pub fn present_current_word(&self) -> Option<Word> {
        let (word, index, total) = self.read(|state| {
            let word = state.quiz.current_word()?.clone();
            Some((word, state.quiz.position(), state.quiz.len()))
        })?;

        self.emit(StateChange::WordPresented {
            index,
            total,
            swedish: word.swedish.clone(),
        });
        Some(word)
    }

    /// Grade typed text for the current word.
    pub fn submit_answer(&self, user_text: &str) -> Result<Answer, QuizError> {
        let (answer, _) = self.try_update(|state| {
            let answer = state.quiz.submit_answer(user_text)?;
            Self::finish_if_complete(state)?;
            Ok(answer)
        })?;

        self.emit(Self::graded(&answer));
        Ok(answer)
    }

    /// Reveal the correct answer, keeping `draft` as the text typed so far.
    pub fn reveal_answer(&self, draft: &str) -> Result<Word, QuizError> {
        let (word, _) = self.try_update(|state| {
            let word = state.quiz.reveal_answer()?.clone();
            state.quiz.set_draft(draft);
            Ok(word)
        })?;

        self.emit(StateChange::AnswerRevealed {
            english: word.english.clone(),
        });
        Ok(word)
    }

    /// Record the user's own verdict after a reveal.
    pub fn confirm_manual(&self, was_correct: bool) -> Result<Answer, QuizError> {
        let (answer, _) = self.try_update(|state| {
            let answer = state.quiz.confirm_manual(was_correct)?;
            Self::finish_if_complete(state)?;
            Ok(answer)
        })?;

        self.emit(Self::graded(&answer));
        Ok(answer)
    }

    /// Reshuffle the loaded words and start over.
    pub fn restart_quiz(&self) -> Result<Vec<StateChange>, QuizError> {
        let (_, mut changes) = self.try_update(|state| {
            state.quiz.restart()?;
            state.summary = None;
            state.phase = AppPhase::Quiz;
            Ok(())
        })?;

        changes.push(self.emit(StateChange::StateReset));
        Ok(changes)
    }

    fn finish_if_complete(state: &mut AppState) -> Result<(), QuizError> {
        if state.quiz.is_complete() {
            state.summary = Some(summarize(state.quiz.answers())?);
            state.phase = AppPhase::Result;
        }
        Ok(())
    }

    fn graded(answer: &Answer) -> StateChange {
        StateChange::AnswerGraded {
            swedish: answer.word.swedish.clone(),
            english: answer.word.english.clone(),
            correct: answer.correct,
            manual_correction: answer.manual_correction,
        }
    }

    // Settings

    pub fn set_read_aloud(&self, enabled: bool) -> Vec<StateChange> {
        self.update(|state| state.read_aloud = enabled)
    }

    /// Flip read-aloud and return the new setting
    pub fn toggle_read_aloud(&self) -> bool {
        let mut enabled = false;
        self.update(|state| {
            state.read_aloud = !state.read_aloud;
            enabled = state.read_aloud;
        });
        enabled
    }

    pub fn set_speech_supported(&self, supported: bool) -> Vec<StateChange> {
        self.update(|state| state.speech_supported = supported)
    }

    /// Apply the user's saved preferences
    pub fn load_from_user_config(&self, user_config: &UserConfig) -> Vec<StateChange> {
        self.update(|state| {
            state.read_aloud = user_config.quiz.read_aloud;

            tracing::info!(
                "Loaded user config: read_aloud={}, speech_enabled={}",
                state.read_aloud,
                user_config.speech.enabled
            );
        })
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Clones share the same state and channel
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
