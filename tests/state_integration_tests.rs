//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on mutations
//! - Supports multiple subscribers
//! - Drives a complete quiz session through to the result
//! - Handles concurrent access from multiple threads
//! - Leaves state untouched when a quiz operation is rejected

use glosor::services::quiz::QuizError;
use glosor::services::vocabulary::{LoadError, RawResponse, VocabularyLoader, VocabularySource};
use glosor::{AppPhase, StateChange, StateManager, Word};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

struct CannedSource {
    status: u16,
    body: &'static str,
}

impl VocabularySource for CannedSource {
    async fn fetch(&self) -> Result<RawResponse, LoadError> {
        Ok(RawResponse {
            status: self.status,
            body: self.body.to_string(),
        })
    }

    fn describe(&self) -> String {
        "canned".to_string()
    }
}

fn loader(status: u16, body: &'static str) -> VocabularyLoader<CannedSource> {
    VocabularyLoader::new(CannedSource { status, body })
}

async fn next_event(rx: &mut broadcast::Receiver<StateChange>) -> StateChange {
    timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed")
}

fn drain(rx: &mut broadcast::Receiver<StateChange>) -> Vec<StateChange> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Answer the current word correctly, whatever the shuffle put first
fn answer_correctly(state: &StateManager) {
    let word = state
        .read(|s| s.quiz.current_word().cloned())
        .expect("a word should be waiting");
    let answer = state.submit_answer(&word.english).unwrap();
    assert!(answer.correct);
}

#[tokio::test]
async fn test_load_events_emitted() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    let count = state
        .load_vocabulary(&loader(200, "sv,en\nhund,dog\nkatt,cat"))
        .await
        .unwrap();
    assert_eq!(count, 2);

    assert_eq!(next_event(&mut rx).await, StateChange::VocabularyLoading);
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::PhaseChanged {
            phase: AppPhase::Quiz
        }
    );
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::VocabularyLoaded { count: 2 }
    );
}

#[tokio::test]
async fn test_failed_load_switches_to_failed_view() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    let result = state.load_vocabulary(&loader(404, "Not Found")).await;
    assert!(matches!(
        result,
        Err(LoadError::Network {
            status: Some(404),
            ..
        })
    ));

    let events = drain(&mut rx);
    let message = "Kunde inte ladda glosor: 404".to_string();
    assert!(events.contains(&StateChange::PhaseChanged {
        phase: AppPhase::Failed(message.clone())
    }));
    assert!(events.contains(&StateChange::VocabularyFailed { message }));

    let snapshot = state.snapshot();
    assert!(snapshot.words().is_empty());
    assert!(!snapshot.quiz.is_started());
}

#[tokio::test]
async fn test_header_only_document_is_empty_data() {
    let state = StateManager::new();

    let result = state.load_vocabulary(&loader(200, "sv,en\n")).await;
    assert_eq!(result, Err(LoadError::EmptyData));
    assert_eq!(
        state.read(|s| s.phase.clone()),
        AppPhase::Failed("Inga glosor hittades i dokumentet".to_string())
    );
}

#[tokio::test]
async fn test_reload_after_failure_recovers() {
    let state = StateManager::new();

    assert!(state.load_vocabulary(&loader(500, "")).await.is_err());
    assert!(state.load_vocabulary(&loader(200, "sv,en\nhund,dog")).await.is_ok());

    let snapshot = state.snapshot();
    assert_eq!(snapshot.phase, AppPhase::Quiz);
    assert!(snapshot.vocabulary.error.is_none());
    assert_eq!(snapshot.words(), [Word::new("hund", "dog")]);
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = StateManager::new();
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();
    let mut rx3 = state.subscribe();

    state.set_read_aloud(true);

    for rx in [&mut rx1, &mut rx2, &mut rx3] {
        assert_eq!(
            next_event(rx).await,
            StateChange::ReadAloudChanged { enabled: true }
        );
    }
}

#[tokio::test]
async fn test_complete_session_reaches_result() {
    let state = StateManager::new();
    state
        .load_vocabulary(&loader(200, "sv,en\nhund,dog\nkatt,cat"))
        .await
        .unwrap();

    let mut rx = state.subscribe();
    state.start_quiz().unwrap();
    assert_eq!(next_event(&mut rx).await, StateChange::QuizStarted { total: 2 });
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::ProgressUpdated {
            current: 1,
            total: 2
        }
    );

    answer_correctly(&state);
    answer_correctly(&state);

    let events = drain(&mut rx);
    assert!(events.contains(&StateChange::PhaseChanged {
        phase: AppPhase::Result
    }));
    assert!(events.contains(&StateChange::QuizCompleted {
        correct: 2,
        total: 2,
        percentage: 100
    }));
    let graded = events
        .iter()
        .filter(|e| matches!(e, StateChange::AnswerGraded { correct: true, .. }))
        .count();
    assert_eq!(graded, 2);

    let summary = state.read(|s| s.summary.clone()).unwrap();
    assert!(summary.all_correct());
    assert_eq!(summary.answers.len(), 2);
}

#[tokio::test]
async fn test_reveal_then_manual_verdict() {
    let state = StateManager::new();
    state
        .load_vocabulary(&loader(200, "sv,en\nspringa,run"))
        .await
        .unwrap();
    state.start_quiz().unwrap();

    let mut rx = state.subscribe();
    let revealed = state.reveal_answer("rn").unwrap();
    assert_eq!(revealed, Word::new("springa", "run"));
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::AnswerRevealed {
            english: "run".to_string()
        }
    );

    let answer = state.confirm_manual(true).unwrap();
    assert!(answer.correct);
    assert!(answer.manual_correction);
    assert_eq!(answer.user_answer, "rn");

    let summary = state.read(|s| s.summary.clone()).unwrap();
    assert_eq!(summary.percentage, 100);
    assert_eq!(summary.manual_count(), 1);
}

#[tokio::test]
async fn test_restart_reshuffles_and_resets() {
    let state = StateManager::new();
    state
        .load_vocabulary(&loader(200, "sv,en\nhund,dog"))
        .await
        .unwrap();
    state.start_quiz().unwrap();
    state.submit_answer("cat").unwrap();
    assert_eq!(state.read(|s| s.phase.clone()), AppPhase::Result);

    let changes = state.restart_quiz().unwrap();

    assert!(changes.contains(&StateChange::QuizStarted { total: 1 }));
    assert!(changes.contains(&StateChange::PhaseChanged {
        phase: AppPhase::Quiz
    }));
    assert_eq!(changes.last(), Some(&StateChange::StateReset));

    let snapshot = state.snapshot();
    assert!(snapshot.summary.is_none());
    assert!(snapshot.quiz.answers().is_empty());
    assert_eq!(snapshot.quiz.position(), 0);
}

#[tokio::test]
async fn test_repeat_start_keeps_session() {
    let state = StateManager::new();
    state
        .load_vocabulary(&loader(200, "sv,en\nhund,dog\nkatt,cat"))
        .await
        .unwrap();
    state.start_quiz().unwrap();
    answer_correctly(&state);

    let before = state.snapshot();
    state.start_quiz().unwrap();
    let after = state.snapshot();

    assert_eq!(after.quiz.session(), before.quiz.session());
    assert_eq!(after.quiz.position(), 1);
    assert_eq!(after.quiz.ordered_words(), before.quiz.ordered_words());
}

#[test]
fn test_rejected_operation_leaves_state_untouched() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    let result = state.submit_answer("dog");
    assert!(matches!(result, Err(QuizError::InvalidState { .. })));
    assert!(matches!(state.confirm_manual(true), Err(QuizError::InvalidState { .. })));
    assert_eq!(state.start_quiz(), Err(QuizError::EmptyWordList));

    assert!(drain(&mut rx).is_empty());
    assert_eq!(state.read(|s| s.phase.clone()), AppPhase::Loading);
}

#[test]
fn test_concurrent_reads_and_toggles() {
    let state = Arc::new(StateManager::new());
    let mut handles = Vec::new();

    for _ in 0..8 {
        let state = Arc::clone(&state);
        handles.push(std::thread::spawn(move || {
            for _ in 0..50 {
                state.toggle_read_aloud();
                let _ = state.read(|s| s.read_aloud);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // An even number of toggles in total
    assert!(!state.read(|s| s.read_aloud));
}

#[test]
fn test_clones_share_state() {
    let state = StateManager::new();
    let clone = state.clone();

    clone.set_read_aloud(true);
    assert!(state.read(|s| s.read_aloud));
}
