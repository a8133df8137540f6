// EventBridge - Turns state change events into side effects
//
// The quiz logic never speaks or counts anything itself. This bridge listens
// on the StateManager broadcast channel from a tokio task and:
// - reads the Swedish word aloud when it is presented
// - reads the English word aloud when it is graded or revealed
// - silences speech when read-aloud is switched off or the session restarts
// - records quiz metrics

use crate::metrics::Metrics;
use crate::models::Language;
use crate::services::speech::Speaker;
use crate::state::{StateChange, StateManager};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Background listener that applies speech and metrics side effects
///
/// # Example
/// ```ignore
/// let bridge = EventBridge::spawn(state_manager.clone(), speaker, metrics);
/// // ... run the quiz ...
/// bridge.shutdown().await;
/// ```
pub struct EventBridge {
    handle: JoinHandle<()>,
}

impl EventBridge {
    /// Subscribe to `state_manager` and start handling events on the
    /// current tokio runtime.
    ///
    /// The subscription is taken before this returns, so no event emitted
    /// afterwards is missed.
    pub fn spawn(
        state_manager: StateManager,
        speaker: Arc<dyn Speaker>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let mut rx = state_manager.subscribe();

        let handle = tokio::spawn(async move {
            tracing::debug!("Event bridge started");

            loop {
                match rx.recv().await {
                    Ok(change) => {
                        tracing::trace!("State change received: {:?}", change);
                        handle_change(&change, &state_manager, speaker.as_ref(), &metrics);
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("State broadcast channel closed - stopping event bridge");
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Event bridge lagged - {} events were skipped",
                            skipped
                        );
                    }
                }
            }

            tracing::debug!("Event bridge terminated");
        });

        Self { handle }
    }

    /// Stop listening. Speech already started keeps running until it ends or
    /// is interrupted.
    pub async fn shutdown(self) {
        self.handle.abort();
        match self.handle.await {
            Err(e) if e.is_panic() => tracing::error!("Event bridge panicked: {}", e),
            _ => tracing::debug!("Event bridge shut down"),
        }
    }
}

/// Apply the side effects of one event.
///
/// Whether to speak is decided from the current state at the time the event
/// is handled.
pub fn handle_change(
    change: &StateChange,
    state_manager: &StateManager,
    speaker: &dyn Speaker,
    metrics: &Metrics,
) {
    let should_speak = || state_manager.read(|state| state.should_speak());

    match change {
        StateChange::WordPresented { swedish, .. } => {
            if should_speak() {
                speaker.speak(swedish, Language::Sv);
            }
        }

        StateChange::AnswerRevealed { english } => {
            if should_speak() {
                speaker.speak(english, Language::En);
            }
        }

        StateChange::AnswerGraded {
            english,
            correct,
            manual_correction,
            ..
        } => {
            metrics.record_answer(*correct, *manual_correction);

            // A manual verdict follows a reveal, which already spoke the answer
            if !manual_correction && should_speak() {
                speaker.speak(english, Language::En);
            }
        }

        StateChange::QuizStarted { total } => {
            tracing::debug!("Session of {} words started", total);
            metrics.record_session_started();
        }

        StateChange::QuizCompleted {
            correct,
            total,
            percentage,
        } => {
            tracing::info!("Session finished: {}/{} ({}%)", correct, total, percentage);
            metrics.record_session_completed();
        }

        StateChange::ReadAloudChanged { enabled: false } | StateChange::StateReset => {
            speaker.stop();
        }

        _ => {}
    }
}
