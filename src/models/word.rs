use serde::{Deserialize, Serialize};
use std::fmt;

/// One Swedish/English translation pair.
///
/// Words are immutable once parsed and compare by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word {
    pub swedish: String,
    pub english: String,
}

impl Word {
    pub fn new(swedish: impl Into<String>, english: impl Into<String>) -> Self {
        Self {
            swedish: swedish.into(),
            english: english.into(),
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.swedish, self.english)
    }
}

/// A recorded response to one [`Word`].
///
/// `manual_correction` is true when the user judged the answer themselves
/// after revealing it, false when the engine graded the typed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub word: Word,
    pub user_answer: String,
    pub correct: bool,
    pub manual_correction: bool,
}

/// Languages the quiz can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Sv,
    En,
}

impl Language {
    /// Short tag used for voice matching ("sv" / "en").
    pub fn code(self) -> &'static str {
        match self {
            Language::Sv => "sv",
            Language::En => "en",
        }
    }

    /// Regional tag used when no better voice is known.
    pub fn fallback_tag(self) -> &'static str {
        match self {
            Language::Sv => "sv-SE",
            Language::En => "en-GB",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
