// Performance metrics module
//
// Lightweight counters for quiz activity, speech and vocabulary loading

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide quiz metrics
///
/// Uses atomic operations for thread-safe tracking without locks. Counters
/// are bumped by the event bridge and the speech service and logged once on
/// shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Quiz sessions started (including restarts)
    pub sessions_started: AtomicUsize,

    /// Quiz sessions answered through to the end
    pub sessions_completed: AtomicUsize,

    pub answers_correct: AtomicUsize,
    pub answers_incorrect: AtomicUsize,

    /// Answers judged by the user after revealing
    pub manual_corrections: AtomicUsize,

    /// Utterances requested from the speech backend
    pub speech_requests: AtomicU64,

    /// Utterances that could not be started
    pub speech_failures: AtomicU64,

    /// Vocabulary fetch attempts
    pub vocabulary_loads: AtomicU64,

    pub vocabulary_load_failures: AtomicU64,

    /// Total vocabulary fetch time in milliseconds
    pub total_fetch_time_ms: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicUsize::new(0),
            sessions_completed: AtomicUsize::new(0),
            answers_correct: AtomicUsize::new(0),
            answers_incorrect: AtomicUsize::new(0),
            manual_corrections: AtomicUsize::new(0),
            speech_requests: AtomicU64::new(0),
            speech_failures: AtomicU64::new(0),
            vocabulary_loads: AtomicU64::new(0),
            vocabulary_load_failures: AtomicU64::new(0),
            total_fetch_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one graded answer
    pub fn record_answer(&self, correct: bool, manual_correction: bool) {
        if correct {
            self.answers_correct.fetch_add(1, Ordering::Relaxed);
        } else {
            self.answers_incorrect.fetch_add(1, Ordering::Relaxed);
        }
        if manual_correction {
            self.manual_corrections.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_speech_request(&self) {
        self.speech_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_speech_failure(&self) {
        self.speech_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished vocabulary fetch, successful or not
    pub fn record_vocabulary_load(&self, duration: Duration, success: bool) {
        self.vocabulary_loads.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.vocabulary_load_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_fetch_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average vocabulary fetch time in milliseconds
    pub fn avg_fetch_time_ms(&self) -> f64 {
        let total = self.total_fetch_time_ms.load(Ordering::Relaxed);
        let count = self.vocabulary_loads.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Share of all graded answers that were correct, 0-100
    pub fn accuracy_percent(&self) -> f64 {
        let correct = self.answers_correct.load(Ordering::Relaxed);
        let total = correct + self.answers_incorrect.load(Ordering::Relaxed);
        if total > 0 {
            correct as f64 * 100.0 / total as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        let uptime = self.uptime();
        tracing::info!("=== Quiz Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", uptime.as_secs_f64());
        tracing::info!(
            "Sessions: {} started, {} completed",
            self.sessions_started.load(Ordering::Relaxed),
            self.sessions_completed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Answers: {} correct, {} incorrect, {} manual ({:.1}% accuracy)",
            self.answers_correct.load(Ordering::Relaxed),
            self.answers_incorrect.load(Ordering::Relaxed),
            self.manual_corrections.load(Ordering::Relaxed),
            self.accuracy_percent()
        );
        tracing::info!(
            "Speech: {} requests, {} failures",
            self.speech_requests.load(Ordering::Relaxed),
            self.speech_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Vocabulary: {} loads, {} failed, avg fetch {:.0}ms",
            self.vocabulary_loads.load(Ordering::Relaxed),
            self.vocabulary_load_failures.load(Ordering::Relaxed),
            self.avg_fetch_time_ms()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
