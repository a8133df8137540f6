//! The quiz session state machine.
//!
//! ```text
//! Uninitialized --start--> Presenting(0) --submit/confirm--> Presenting(1) ... --> Complete
//!                               |    ^
//!                        reveal |    | (confirm advances)
//!                               v    |
//!                        ManualCorrection(i)
//! ```
//!
//! The engine does not reject empty or whitespace-only answers; the
//! presentation layer is responsible for not submitting them. Submitted
//! blanks are graded like any other text and normally come out incorrect.

use crate::models::{Answer, Word};
use crate::services::shuffle::shuffle_with_rng;
use rand::Rng;
use std::fmt;
use thiserror::Error;

/// Where the engine is in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Uninitialized,
    Presenting { index: usize },
    ManualCorrection { index: usize },
    Complete,
}

impl fmt::Display for QuizPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizPhase::Uninitialized => f.write_str("uninitialized"),
            QuizPhase::Presenting { index } => write!(f, "presenting word {}", index),
            QuizPhase::ManualCorrection { index } => {
                write!(f, "awaiting manual correction of word {}", index)
            }
            QuizPhase::Complete => f.write_str("complete"),
        }
    }
}

/// Misuse of the engine or summarizer. These are programming errors; the
/// presentation layer is expected to prevent them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("Cannot start a quiz without words")]
    EmptyWordList,

    #[error("Cannot {operation} while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: QuizPhase,
    },

    #[error("Cannot summarize an empty answer list")]
    EmptyResult,
}

/// Outcome of [`QuizEngine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A fresh shuffled session was created
    Started,

    /// The same word list is already being quizzed; nothing changed
    AlreadyRunning,
}

/// Progress through the current session, as shown in the "Ord i av n" bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based number of the word being shown
    pub current: usize,
    pub total: usize,
    pub percent: u32,
}

/// Case- and surrounding-whitespace-insensitive comparison of a typed answer.
///
/// No fuzzy matching and no punctuation normalization.
pub fn is_correct(user_text: &str, expected: &str) -> bool {
    user_text.to_lowercase().trim() == expected.to_lowercase().trim()
}

/// Owns one quiz session: shuffled order, position and collected answers.
///
/// Invariants: `position <= ordered_words.len()` and
/// `answers.len() == position` while a word is waiting for an answer.
#[derive(Debug, Clone)]
pub struct QuizEngine {
    /// Word list the current session was started from, in source order
    source_words: Vec<Word>,
    ordered_words: Vec<Word>,
    position: usize,
    answers: Vec<Answer>,
    phase: QuizPhase,

    /// Text typed for the current word before revealing the answer
    draft: String,

    /// Incremented every time a new shuffled session begins
    session: u64,
}

impl Default for QuizEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEngine {
    pub fn new() -> Self {
        Self {
            source_words: Vec::new(),
            ordered_words: Vec::new(),
            position: 0,
            answers: Vec::new(),
            phase: QuizPhase::Uninitialized,
            draft: String::new(),
            session: 0,
        }
    }

    /// Start a session using the thread-local generator.
    ///
    /// See [`start_with_rng`](Self::start_with_rng).
    pub fn start(&mut self, words: Vec<Word>) -> Result<StartOutcome, QuizError> {
        self.start_with_rng(words, &mut rand::thread_rng())
    }

    /// Start a session over `words`, shuffling them exactly once.
    ///
    /// Calling this again with the same list while the session is still in
    /// progress is a no-op. A different list, or any list once the session
    /// is complete, starts over with a fresh shuffle.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        words: Vec<Word>,
        rng: &mut R,
    ) -> Result<StartOutcome, QuizError> {
        if words.is_empty() {
            return Err(QuizError::EmptyWordList);
        }

        let in_progress = matches!(
            self.phase,
            QuizPhase::Presenting { .. } | QuizPhase::ManualCorrection { .. }
        );
        if in_progress && words == self.source_words {
            tracing::debug!("Quiz already running for this word list, not reshuffling");
            return Ok(StartOutcome::AlreadyRunning);
        }

        self.ordered_words = shuffle_with_rng(&words, rng);
        self.source_words = words;
        self.begin_session();
        Ok(StartOutcome::Started)
    }

    /// Reshuffle the current word list and start over.
    pub fn restart(&mut self) -> Result<(), QuizError> {
        self.restart_with_rng(&mut rand::thread_rng())
    }

    pub fn restart_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), QuizError> {
        if self.source_words.is_empty() {
            return Err(QuizError::InvalidState {
                operation: "restart",
                phase: self.phase,
            });
        }

        self.ordered_words = shuffle_with_rng(&self.source_words, rng);
        self.begin_session();
        Ok(())
    }

    fn begin_session(&mut self) {
        self.position = 0;
        self.answers.clear();
        self.draft.clear();
        self.phase = QuizPhase::Presenting { index: 0 };
        self.session += 1;

        tracing::info!(
            "Quiz session {} started with {} words",
            self.session,
            self.ordered_words.len()
        );
    }

    /// Record the text typed so far for the current word.
    ///
    /// The draft becomes the recorded answer if the user reveals the
    /// solution and corrects manually.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Grade typed text against the current word and advance.
    ///
    /// The answer is stored exactly as typed. Only valid while a word is
    /// being presented.
    pub fn submit_answer(&mut self, user_text: &str) -> Result<Answer, QuizError> {
        let QuizPhase::Presenting { index } = self.phase else {
            return Err(QuizError::InvalidState {
                operation: "submit an answer",
                phase: self.phase,
            });
        };

        let word = self.ordered_words[index].clone();
        let correct = is_correct(user_text, &word.english);
        let answer = Answer {
            word,
            user_answer: user_text.to_string(),
            correct,
            manual_correction: false,
        };

        tracing::debug!(
            "Word {} graded: {:?} -> {}",
            index,
            answer.user_answer,
            if correct { "correct" } else { "incorrect" }
        );

        self.record(answer.clone());
        Ok(answer)
    }

    /// Show the correct English word without recording an answer yet.
    pub fn reveal_answer(&mut self) -> Result<&Word, QuizError> {
        let QuizPhase::Presenting { index } = self.phase else {
            return Err(QuizError::InvalidState {
                operation: "reveal the answer",
                phase: self.phase,
            });
        };

        self.phase = QuizPhase::ManualCorrection { index };
        tracing::debug!("Answer revealed for word {}", index);
        Ok(&self.ordered_words[index])
    }

    /// Record the user's own judgement after a reveal and advance.
    pub fn confirm_manual(&mut self, was_correct: bool) -> Result<Answer, QuizError> {
        let QuizPhase::ManualCorrection { index } = self.phase else {
            return Err(QuizError::InvalidState {
                operation: "confirm a manual correction",
                phase: self.phase,
            });
        };

        let answer = Answer {
            word: self.ordered_words[index].clone(),
            user_answer: std::mem::take(&mut self.draft),
            correct: was_correct,
            manual_correction: true,
        };

        tracing::debug!("Word {} manually marked as {}", index, was_correct);

        self.record(answer.clone());
        Ok(answer)
    }

    fn record(&mut self, answer: Answer) {
        self.answers.push(answer);
        self.position += 1;
        self.draft.clear();

        self.phase = if self.position == self.ordered_words.len() {
            tracing::info!(
                "Quiz session {} complete: {} answers",
                self.session,
                self.answers.len()
            );
            QuizPhase::Complete
        } else {
            QuizPhase::Presenting {
                index: self.position,
            }
        };
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    /// The word awaiting an answer (also during manual correction).
    pub fn current_word(&self) -> Option<&Word> {
        match self.phase {
            QuizPhase::Presenting { index } | QuizPhase::ManualCorrection { index } => {
                self.ordered_words.get(index)
            }
            _ => None,
        }
    }

    /// The English word exposed by a reveal, if one is pending.
    pub fn revealed_answer(&self) -> Option<&str> {
        match self.phase {
            QuizPhase::ManualCorrection { index } => {
                self.ordered_words.get(index).map(|w| w.english.as_str())
            }
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<Progress> {
        let index = match self.phase {
            QuizPhase::Presenting { index } | QuizPhase::ManualCorrection { index } => index,
            _ => return None,
        };
        let total = self.ordered_words.len();
        let current = index + 1;
        let percent = ((current * 200 + total) / (total * 2)) as u32;

        Some(Progress {
            current,
            total,
            percent,
        })
    }

    /// Answers collected so far, in presentation order.
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn ordered_words(&self) -> &[Word] {
        &self.ordered_words
    }

    pub fn source_words(&self) -> &[Word] {
        &self.source_words
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.ordered_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_words.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.phase != QuizPhase::Uninitialized
    }

    pub fn is_complete(&self) -> bool {
        self.phase == QuizPhase::Complete
    }

    /// Identifier of the current shuffled session (0 before the first start).
    pub fn session(&self) -> u64 {
        self.session
    }
}
