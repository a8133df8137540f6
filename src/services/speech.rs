//! Text-to-speech through the platform's speech command.
//!
//! The first of `say`, `espeak-ng` and `espeak` found on `PATH` is used
//! unless a command is configured. Speaking is fire-and-forget: at most one
//! utterance is active, and starting a new one interrupts the previous child
//! process. Failures are logged and never reach the quiz flow.

use crate::metrics::Metrics;
use crate::models::{Language, SpeechSettings};
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;
use tokio::process::{Child, Command};

/// Words per minute the backends treat as normal speed
const NORMAL_WPM: f32 = 175.0;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("No speech backend available")]
    Unavailable,

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Something that can read a word aloud.
///
/// Implementations must never block the caller for the duration of the
/// utterance.
#[cfg_attr(test, mockall::automock)]
pub trait Speaker: Send + Sync {
    /// Speak `text` in `lang`, interrupting anything currently being spoken.
    fn speak(&self, text: &str, lang: Language);

    fn stop(&self);

    fn is_supported(&self) -> bool;

    fn is_speaking(&self) -> bool;
}

/// Command-line interface family of a speech program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// macOS `say`
    Say,

    /// `espeak-ng` or `espeak`
    Espeak,
}

impl BackendKind {
    /// Guess the interface from the program name; anything that is not
    /// `say` is driven with espeak arguments.
    fn from_program(program: &Path) -> Self {
        match program.file_stem().and_then(|s| s.to_str()) {
            Some("say") => BackendKind::Say,
            _ => BackendKind::Espeak,
        }
    }

    fn voice_list_args(self) -> &'static [&'static str] {
        match self {
            BackendKind::Say => &["-v", "?"],
            BackendKind::Espeak => &["--voices"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub kind: BackendKind,
    pub program: PathBuf,
}

impl Backend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        Self {
            kind: BackendKind::from_program(&program),
            program,
        }
    }

    /// Arguments for one utterance.
    ///
    /// `voice` is the catalogue id of the chosen voice. Without one, `say`
    /// uses the system voice and espeak is given the language tag.
    pub fn speak_args(&self, text: &str, lang: Language, voice: Option<&str>, rate: f32) -> Vec<String> {
        let wpm = (NORMAL_WPM * rate.clamp(0.1, 4.0)).round() as u32;
        let mut args = Vec::with_capacity(5);

        match self.kind {
            BackendKind::Say => {
                args.push("-r".to_string());
                args.push(wpm.to_string());
                if let Some(voice) = voice {
                    args.push("-v".to_string());
                    args.push(voice.to_string());
                }
            }
            BackendKind::Espeak => {
                args.push("-s".to_string());
                args.push(wpm.to_string());
                args.push("-v".to_string());
                args.push(voice.map(str::to_string).unwrap_or_else(|| espeak_language(lang)));
            }
        }

        args.push(text.to_string());
        args
    }
}

/// espeak's spelling of the fallback language tag
fn espeak_language(lang: Language) -> String {
    match lang {
        Language::Sv => lang.code().to_string(),
        Language::En => lang.fallback_tag().to_lowercase(),
    }
}

/// An installed voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,

    /// BCP 47 style tag, e.g. `sv-SE` or `en-GB`
    pub lang: String,

    /// What to pass to the backend's voice option
    pub id: String,
}

/// Normalize `en_gb`, `en-gb` or `EN_GB` to `en-GB`.
pub fn normalize_language_tag(tag: &str) -> String {
    let mut parts = tag.split(['-', '_']);
    let mut normalized = parts.next().unwrap_or_default().to_lowercase();

    for part in parts {
        normalized.push('-');
        if part.len() == 2 {
            normalized.push_str(&part.to_uppercase());
        } else {
            normalized.push_str(part);
        }
    }

    normalized
}

fn say_voice_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>.+?)\s+(?P<lang>[a-z]{2,3}[_-][A-Za-z0-9]+)\s+#")
            .expect("Invalid say voice regex")
    })
}

fn espeak_voice_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*\d+\s+(?P<lang>\S+)\s+\S+\s+(?P<name>\S+)\s+(?P<file>\S+)")
            .expect("Invalid espeak voice regex")
    })
}

/// Parse the output of `say -v ?`.
///
/// Lines look like `Alva                sv_SE    # Hej! Jag heter Alva.`;
/// names may contain spaces.
pub fn parse_say_voices(output: &str) -> Vec<Voice> {
    let pattern = say_voice_pattern();
    let voices = output.lines().filter_map(|line| {
        let caps = pattern.captures(line)?;
        let name = caps["name"].trim().to_string();
        Some(Voice {
            id: name.clone(),
            lang: normalize_language_tag(&caps["lang"]),
            name,
        })
    });
    dedup_by_name(voices)
}

/// Parse the output of `espeak --voices` / `espeak-ng --voices`.
///
/// The header row has no leading priority number and is skipped by the
/// pattern itself.
pub fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    let pattern = espeak_voice_pattern();
    let voices = output.lines().filter_map(|line| {
        let caps = pattern.captures(line)?;
        Some(Voice {
            name: caps["name"].replace('_', " "),
            lang: normalize_language_tag(&caps["lang"]),
            id: caps["lang"].to_string(),
        })
    });
    dedup_by_name(voices)
}

/// Keep the first voice of each name, in catalogue order
fn dedup_by_name(voices: impl Iterator<Item = Voice>) -> Vec<Voice> {
    let mut unique: IndexMap<String, Voice> = IndexMap::new();
    for voice in voices {
        unique.entry(voice.name.clone()).or_insert(voice);
    }
    unique.into_values().collect()
}

/// Pick the best installed voice for `lang`.
///
/// Swedish: a `sv*` voice whose name contains a preferred fragment, else any
/// `sv*` voice. English: an `en-GB` voice with a preferred name, else any
/// `en-GB`, else any `en*`. Returns `None` when nothing fits.
pub fn select_voice<'a>(voices: &'a [Voice], lang: Language, preferred: &[String]) -> Option<&'a Voice> {
    let is_preferred = |voice: &Voice| preferred.iter().any(|p| voice.name.contains(p.as_str()));

    match lang {
        Language::Sv => {
            let swedish = |voice: &&Voice| voice.lang.starts_with(lang.code());
            voices
                .iter()
                .filter(swedish)
                .find(|v| is_preferred(*v))
                .or_else(|| voices.iter().find(swedish))
        }
        Language::En => {
            let british = |voice: &&Voice| voice.lang == lang.fallback_tag();
            voices
                .iter()
                .filter(british)
                .find(|v| is_preferred(*v))
                .or_else(|| voices.iter().find(british))
                .or_else(|| voices.iter().find(|v| v.lang.starts_with(lang.code())))
        }
    }
}

/// Locate an executable by name on `PATH`
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Resolve the backend: the configured command if set, otherwise the first
/// known speech program on `PATH`.
pub fn discover_backend(configured: Option<&str>) -> Option<Backend> {
    if let Some(command) = configured {
        let as_path = Path::new(command);
        let program = if as_path.components().count() > 1 {
            as_path.is_file().then(|| as_path.to_path_buf())
        } else {
            find_on_path(command)
        };

        if program.is_none() {
            tracing::warn!("Configured speech command not found: {}", command);
        }
        return program.map(Backend::new);
    }

    ["say", "espeak-ng", "espeak"]
        .into_iter()
        .find_map(find_on_path)
        .map(Backend::new)
}

fn query_voices(backend: &Backend) -> Vec<Voice> {
    let output = std::process::Command::new(&backend.program)
        .args(backend.kind.voice_list_args())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let voices = match backend.kind {
                BackendKind::Say => parse_say_voices(&stdout),
                BackendKind::Espeak => parse_espeak_voices(&stdout),
            };
            tracing::info!("Found {} voices for {}", voices.len(), backend.program.display());
            voices
        }
        Ok(output) => {
            tracing::warn!(
                "Voice listing from {} exited with {}",
                backend.program.display(),
                output.status
            );
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Failed to list voices from {}: {}", backend.program.display(), e);
            Vec::new()
        }
    }
}

/// Speech through a platform command.
pub struct SpeechService {
    backend: Option<Backend>,
    settings: SpeechSettings,
    current: Mutex<Option<Child>>,

    /// Filled by [`SpeechService::voices`]; empty until then
    catalogue: OnceLock<Vec<Voice>>,
    metrics: Option<Arc<Metrics>>,
}

impl SpeechService {
    /// Discover a backend according to `settings`.
    pub fn new(settings: SpeechSettings) -> Self {
        let backend = if settings.enabled {
            discover_backend(settings.command.as_deref())
        } else {
            None
        };

        match &backend {
            Some(backend) => tracing::info!(
                "Speech backend: {} ({:?})",
                backend.program.display(),
                backend.kind
            ),
            None if settings.enabled => tracing::info!("No speech backend found, read-aloud unavailable"),
            None => tracing::info!("Speech disabled by configuration"),
        }

        Self::with_backend(backend, settings)
    }

    /// A service that never speaks.
    pub fn disabled() -> Self {
        Self::with_backend(None, SpeechSettings::default())
    }

    pub fn with_backend(backend: Option<Backend>, settings: SpeechSettings) -> Self {
        Self {
            backend,
            settings,
            current: Mutex::new(None),
            catalogue: OnceLock::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    /// Installed voices. The first call runs the backend's voice listing and
    /// blocks until it finishes, so call it from a blocking thread.
    pub fn voices(&self) -> &[Voice] {
        match &self.backend {
            Some(backend) => self.catalogue.get_or_init(|| query_voices(backend)).as_slice(),
            None => &[],
        }
    }

    /// Voices listed so far, without querying the backend.
    pub fn cached_voices(&self) -> &[Voice] {
        self.catalogue.get().map(Vec::as_slice).unwrap_or_default()
    }

    /// Start speaking, returning why nothing could be started.
    ///
    /// Never waits for the voice listing: until [`SpeechService::voices`] has
    /// completed, the backend's default voice for `lang` is used. Must be
    /// called from within a tokio runtime.
    pub fn try_speak(&self, text: &str, lang: Language) -> Result<(), SpeechError> {
        let Some(backend) = &self.backend else {
            return Err(SpeechError::Unavailable);
        };

        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let voice = select_voice(self.cached_voices(), lang, self.settings.preferred_for(lang));
        let args = backend.speak_args(text, lang, voice.map(|v| v.id.as_str()), self.settings.rate);

        tracing::debug!(
            "Speaking {:?} ({}) with voice {}",
            text,
            lang,
            voice.map(|v| v.name.as_str()).unwrap_or("<default>")
        );

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        interrupt(&mut current);

        let child = Command::new(&backend.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: backend.program.display().to_string(),
                source,
            })?;

        *current = Some(child);
        Ok(())
    }
}

/// Kill the in-flight utterance, if any
fn interrupt(current: &mut Option<Child>) {
    if let Some(mut child) = current.take() {
        if let Err(e) = child.start_kill() {
            // Already exited
            tracing::trace!("Previous utterance not killed: {}", e);
        }
    }
}

impl Speaker for SpeechService {
    fn speak(&self, text: &str, lang: Language) {
        if !self.is_supported() {
            return;
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_speech_request();
        }

        if let Err(e) = self.try_speak(text, lang) {
            tracing::warn!("Speech failed: {}", e);
            if let Some(metrics) = &self.metrics {
                metrics.record_speech_failure();
            }
        }
    }

    fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        interrupt(&mut current);
    }

    fn is_supported(&self) -> bool {
        self.backend.is_some()
    }

    fn is_speaking(&self) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAY_OUTPUT: &str = "\
Alex                en_US    # Most people recognize me by my voice.
Alva                sv_SE    # Hej! Jag heter Alva.
Daniel              en_GB    # Hello! My name is Daniel.
Eddy (English (UK)) en_GB    # Hello! My name is Eddy.
Klara               sv_SE    # Hej! Jag heter Klara.
Alva                sv_SE    # Hej! Jag heter Alva.
";

    const ESPEAK_OUTPUT: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  en-gb           --/M      English_(Great_Britain) gmw/en               (en 2)
 2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  sv              --/M      Swedish            gmw/sv
";

    fn names(voices: &[Voice]) -> Vec<&str> {
        voices.iter().map(|v| v.name.as_str()).collect()
    }

    fn prefs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_say_voices() {
        let voices = parse_say_voices(SAY_OUTPUT);

        assert_eq!(names(&voices), ["Alex", "Alva", "Daniel", "Eddy (English (UK))", "Klara"]);
        assert_eq!(voices[1].lang, "sv-SE");
        assert_eq!(voices[3].lang, "en-GB");
        assert_eq!(voices[3].id, "Eddy (English (UK))");
    }

    #[test]
    fn test_parse_espeak_voices() {
        let voices = parse_espeak_voices(ESPEAK_OUTPUT);

        assert_eq!(voices.len(), 3);
        assert_eq!(voices[0].name, "English (Great Britain)");
        assert_eq!(voices[0].lang, "en-GB");
        assert_eq!(voices[0].id, "en-gb");
        assert_eq!(voices[2].lang, "sv");
    }

    #[test]
    fn test_normalize_language_tag() {
        assert_eq!(normalize_language_tag("en_gb"), "en-GB");
        assert_eq!(normalize_language_tag("SV_se"), "sv-SE");
        assert_eq!(normalize_language_tag("sv"), "sv");
        assert_eq!(normalize_language_tag("zh-yue"), "zh-yue");
    }

    #[test]
    fn test_select_swedish_prefers_premium_name() {
        let voices = parse_say_voices(SAY_OUTPUT);
        let preferred = prefs(&["Alva", "Premium"]);

        let voice = select_voice(&voices, Language::Sv, &preferred).unwrap();
        assert_eq!(voice.name, "Alva");

        let voice = select_voice(&voices, Language::Sv, &[]).unwrap();
        assert_eq!(voice.name, "Alva");

        let without_alva: Vec<Voice> = voices.into_iter().filter(|v| v.name != "Alva").collect();
        let voice = select_voice(&without_alva, Language::Sv, &preferred).unwrap();
        assert_eq!(voice.name, "Klara");
    }

    #[test]
    fn test_select_english_prefers_british() {
        let voices = parse_say_voices(SAY_OUTPUT);
        let preferred = prefs(&["Daniel", "Kate", "Oliver", "Premium"]);

        let voice = select_voice(&voices, Language::En, &preferred).unwrap();
        assert_eq!(voice.name, "Daniel");

        // No preferred name: first en-GB voice, not the en-US one listed before it
        let voice = select_voice(&voices, Language::En, &prefs(&["Kate"])).unwrap();
        assert_eq!(voice.name, "Daniel");

        let american_only: Vec<Voice> = voices.into_iter().filter(|v| v.lang != "en-GB").collect();
        let voice = select_voice(&american_only, Language::En, &preferred).unwrap();
        assert_eq!(voice.name, "Alex");
    }

    #[test]
    fn test_select_voice_none_available() {
        assert!(select_voice(&[], Language::Sv, &[]).is_none());

        let english = parse_espeak_voices(ESPEAK_OUTPUT)
            .into_iter()
            .filter(|v| v.lang.starts_with("en"))
            .collect::<Vec<_>>();
        assert!(select_voice(&english, Language::Sv, &[]).is_none());
    }

    #[test]
    fn test_backend_kind_from_program() {
        assert_eq!(Backend::new("/usr/bin/say").kind, BackendKind::Say);
        assert_eq!(Backend::new("/usr/bin/espeak-ng").kind, BackendKind::Espeak);
        assert_eq!(Backend::new("espeak").kind, BackendKind::Espeak);
    }

    #[test]
    fn test_speak_args() {
        let say = Backend::new("say");
        assert_eq!(
            say.speak_args("hund", Language::Sv, Some("Alva"), 0.8),
            ["-r", "140", "-v", "Alva", "hund"]
        );
        assert_eq!(say.speak_args("dog", Language::En, None, 1.0), ["-r", "175", "dog"]);

        let espeak = Backend::new("espeak-ng");
        assert_eq!(
            espeak.speak_args("dog", Language::En, None, 0.8),
            ["-s", "140", "-v", "en-gb", "dog"]
        );
        assert_eq!(
            espeak.speak_args("hund", Language::Sv, None, 1.0),
            ["-s", "175", "-v", "sv", "hund"]
        );
    }

    #[test]
    fn test_disabled_service() {
        let service = SpeechService::disabled();

        assert!(!service.is_supported());
        assert!(!service.is_speaking());
        assert!(service.voices().is_empty());
        assert!(matches!(
            service.try_speak("hund", Language::Sv),
            Err(SpeechError::Unavailable)
        ));

        // No-ops rather than errors
        service.speak("hund", Language::Sv);
        service.stop();
    }

    #[test]
    fn test_disabled_by_settings_skips_discovery() {
        let settings = SpeechSettings {
            enabled: false,
            ..SpeechSettings::default()
        };
        let service = SpeechService::new(settings);
        assert!(service.backend().is_none());
    }

    #[test]
    fn test_missing_configured_command() {
        assert!(discover_backend(Some("/definitely/not/a/speech/program")).is_none());
        assert!(discover_backend(Some("glosor-no-such-tts-binary")).is_none());
    }

    /// Whether `pid` is alive and not a zombie
    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit_once(')')
                .is_some_and(|(_, rest)| !rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    async fn wait_until_stopped(pid: u32) -> bool {
        for _ in 0..100 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        false
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_new_utterance_interrupts_previous() {
        use std::os::unix::fs::PermissionsExt;

        // Speaks forever and would take as long to list its voices
        let dir = tempfile::TempDir::new().unwrap();
        let program = dir.path().join("slow-tts");
        std::fs::write(&program, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let service = SpeechService::with_backend(Some(Backend::new(&program)), SpeechSettings::default());
        let current_pid = || service.current.lock().unwrap().as_ref().and_then(Child::id).unwrap();

        let started = std::time::Instant::now();
        service.try_speak("hund", Language::Sv).unwrap();
        let first = current_pid();
        assert!(service.is_speaking());

        service.try_speak("dog", Language::En).unwrap();
        let second = current_pid();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert!(service.cached_voices().is_empty());

        assert_ne!(first, second);
        assert!(wait_until_stopped(first).await, "first utterance still running");
        assert!(is_running(second));
        assert!(service.is_speaking());

        service.stop();
        assert!(!service.is_speaking());
        assert!(wait_until_stopped(second).await, "stopped utterance still running");
    }

    #[test]
    fn test_voices_cached_per_service() {
        let service = SpeechService::with_backend(
            Some(Backend::new("/definitely/not/a/speech/program")),
            SpeechSettings::default(),
        );

        assert!(service.cached_voices().is_empty());
        // A failed listing caches an empty catalogue
        assert!(service.voices().is_empty());
        assert!(service.cached_voices().is_empty());
        assert!(service.catalogue.get().is_some());
    }

    #[test]
    fn test_mock_speaker() {
        let mut speaker = MockSpeaker::new();
        speaker.expect_is_supported().return_const(true);
        speaker
            .expect_speak()
            .with(mockall::predicate::eq("hund"), mockall::predicate::eq(Language::Sv))
            .times(1)
            .return_const(());

        assert!(speaker.is_supported());
        speaker.speak("hund", Language::Sv);
    }
}
