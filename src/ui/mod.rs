// UI module - terminal presentation and side-effect bridge
//
// This module contains:
// - EventBridge: Listens to state changes and speaks words / records metrics
// - TerminalController: Reads user input and renders the quiz views

pub mod bridge;
pub mod controller;

pub use bridge::EventBridge;
pub use controller::{QuizInput, TerminalController, parse_quiz_input, parse_verdict, write_word_list};
