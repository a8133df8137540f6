//! Services module - the quiz logic, independent of any presentation.
//!
//! # Components
//!
//! - [`csv`]: Parses the spreadsheet export into [`Word`](crate::models::Word)s.
//!   Malformed rows are skipped, never reported.
//! - [`shuffle`]: Fisher-Yates permutation with an injectable generator.
//! - [`vocabulary`]: One-shot fetch of the word list through a
//!   [`VocabularySource`], surfacing [`LoadError`] on failure.
//! - [`quiz`]: The [`QuizEngine`] session state machine: shuffled order,
//!   grading, reveal and manual correction.
//! - [`summary`]: Aggregates a completed session into a [`QuizSummary`].
//! - [`speech`]: Best-effort text-to-speech behind the [`Speaker`] trait.
//!
//! Everything except [`speech`] and [`vocabulary`] is pure and synchronous.
//!
//! # Usage Example
//!
//! ```ignore
//! use glosor::services::{HttpVocabularySource, QuizEngine, VocabularyLoader, summarize};
//!
//! let loader = VocabularyLoader::new(HttpVocabularySource::new(url, None)?);
//! let words = loader.load().await?;
//!
//! let mut engine = QuizEngine::new();
//! engine.start(words)?;
//! while let Some(word) = engine.current_word().cloned() {
//!     engine.submit_answer(&ask(&word.swedish))?;
//! }
//!
//! let summary = summarize(engine.answers())?;
//! println!("{} av {} rätt", summary.correct_count, summary.total_count);
//! ```

pub mod csv;
pub mod quiz;
pub mod shuffle;
pub mod speech;
pub mod summary;
pub mod vocabulary;

pub use csv::{parse_csv, parse_csv_line};
pub use quiz::{Progress, QuizEngine, QuizError, QuizPhase, StartOutcome, is_correct};
pub use shuffle::{shuffle, shuffle_with_rng};
pub use speech::{Backend, BackendKind, SpeechError, SpeechService, Speaker, Voice, select_voice};
pub use summary::{QuizSummary, summarize};
pub use vocabulary::{HttpVocabularySource, LoadError, RawResponse, VocabularyLoader, VocabularySource};
