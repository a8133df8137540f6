// Glosor - Swedish/English vocabulary flashcards
//
// This is the library crate containing the quiz logic, state management and
// terminal presentation. The binary crate (main.rs) wires them to stdin/stdout.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{Answer, AppPhase, AppState, Language, UserConfig, Word};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
