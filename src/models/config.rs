use crate::models::Language;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Published CSV export of the weekly vocabulary spreadsheet.
pub const DEFAULT_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vSGyTUbefM_SCBRSi-oaA1mUu9OoMocErw-iW3LwKcW5YjRgL16WwF3WtymFcANjomFGcgLtfEzNQw6/pub?output=csv";

/// User configuration from `Glosor Settings.yaml`
///
/// Every section falls back to its defaults when missing, so a partial file
/// (or no file at all) is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub vocabulary: VocabularySettings,
    pub quiz: QuizSettings,
    pub speech: SpeechSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularySettings {
    pub sheet_url: String,

    /// No timeout is applied when unset; the platform limits apply.
    pub request_timeout_secs: Option<u64>,
}

impl Default for VocabularySettings {
    fn default() -> Self {
        Self {
            sheet_url: DEFAULT_SHEET_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    /// Read words aloud when presented and graded.
    pub read_aloud: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub enabled: bool,

    /// Explicit TTS command; discovered on PATH when unset.
    pub command: Option<String>,

    /// Speaking rate relative to the backend's normal rate.
    pub rate: f32,

    /// Voice name fragments preferred per language code (`sv`, `en`), best
    /// first.
    pub preferred_voices: IndexMap<String, Vec<String>>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        let mut preferred_voices = IndexMap::new();
        preferred_voices.insert(
            Language::Sv.code().to_string(),
            vec!["Alva".to_string(), "Premium".to_string()],
        );
        preferred_voices.insert(
            Language::En.code().to_string(),
            vec![
                "Daniel".to_string(),
                "Kate".to_string(),
                "Oliver".to_string(),
                "Premium".to_string(),
            ],
        );

        Self {
            enabled: true,
            command: None,
            rate: 0.9,
            preferred_voices,
        }
    }
}

impl SpeechSettings {
    /// Preferred voice name fragments for a language (empty if none configured)
    pub fn preferred_for(&self, lang: Language) -> &[String] {
        self.preferred_voices
            .get(lang.code())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: Utf8PathBuf,
    pub debug_mode: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: Utf8PathBuf::from("logs"),
            debug_mode: false,
        }
    }
}
