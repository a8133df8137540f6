// Terminal Controller - Drives the quiz from line-based input
//
// This module contains the TerminalController which coordinates between:
// - an input stream of lines (stdin in the binary, byte slices in tests)
// - an output sink for the Swedish UI texts
// - StateManager (application state and quiz engine)
// - the Speaker for replaying words on request
//
// Side effects of state changes (automatic read-aloud, metrics) live in the
// EventBridge; this controller only turns input into state mutations and
// renders the current view.

use crate::metrics::Metrics;
use crate::models::{AppPhase, Language, Word};
use crate::services::speech::Speaker;
use crate::services::vocabulary::{VocabularyLoader, VocabularySource};
use crate::state::StateManager;
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// What the user asked for while a word is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizInput {
    /// Blank line, ignored
    Empty,

    /// Text to grade, exactly as typed
    Answer(String),

    /// Show the correct answer, keeping the draft exactly as typed
    Reveal { draft: String },

    /// Replay the word in a language
    Speak(Language),

    ToggleReadAloud,

    /// Show the whole word list
    ShowList,

    Quit,
}

/// Interpret one input line typed while a word is shown.
///
/// A lone `?` or `:visa` reveals the answer; `:visa <text>` reveals and
/// keeps `<text>` as the draft. Other lines starting with `:` are commands;
/// unknown commands and everything else are graded as answers, so an answer
/// may itself end in `?`.
pub fn parse_quiz_input(line: &str) -> QuizInput {
    let trimmed = line.trim();

    match trimmed {
        "" => QuizInput::Empty,
        ":q" | ":quit" => QuizInput::Quit,
        ":sv" => QuizInput::Speak(Language::Sv),
        ":en" => QuizInput::Speak(Language::En),
        ":read" => QuizInput::ToggleReadAloud,
        ":list" => QuizInput::ShowList,
        "?" | ":visa" => QuizInput::Reveal {
            draft: String::new(),
        },
        _ => match line.trim_start().strip_prefix(":visa ") {
            Some(draft) => QuizInput::Reveal {
                draft: draft.to_string(),
            },
            None => QuizInput::Answer(line.to_string()),
        },
    }
}

/// Interpret the answer to "Kunde du det här ordet?".
pub fn parse_verdict(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "j" | "ja" | "y" | "yes" => Some(true),
        "n" | "nej" | "no" => Some(false),
        _ => None,
    }
}

/// Print the "Veckans ord" list.
pub fn write_word_list<W: Write>(output: &mut W, words: &[Word]) -> std::io::Result<()> {
    writeln!(output, "Veckans ord ({} st)", words.len())?;
    let width = words
        .iter()
        .map(|w| w.swedish.chars().count())
        .max()
        .unwrap_or(0);

    for word in words {
        writeln!(output, "  {:<width$}  {}", word.swedish, word.english, width = width)?;
    }
    Ok(())
}

/// Where the main loop goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Reload,
    Quit,
}

/// Terminal controller that wires input and output to the application state
///
/// # Example
/// ```ignore
/// let stdin = tokio::io::BufReader::new(tokio::io::stdin());
/// let mut controller = TerminalController::new(
///     stdin,
///     std::io::stdout(),
///     state_manager,
///     speaker,
///     metrics,
/// );
/// controller.run(&loader).await?;
/// ```
pub struct TerminalController<R, W> {
    lines: Lines<R>,
    output: W,
    state_manager: StateManager,
    speaker: Arc<dyn Speaker>,
    metrics: Arc<Metrics>,
}

impl<R, W> TerminalController<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(
        input: R,
        output: W,
        state_manager: StateManager,
        speaker: Arc<dyn Speaker>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            lines: input.lines(),
            output,
            state_manager,
            speaker,
            metrics,
        }
    }

    /// Give back the output sink, e.g. to inspect what was printed
    pub fn into_output(self) -> W {
        self.output
    }

    /// Load the vocabulary and run quiz sessions until the user quits or
    /// input ends.
    pub async fn run<S: VocabularySource>(&mut self, loader: &VocabularyLoader<S>) -> Result<()> {
        tracing::info!("Terminal controller started");
        writeln!(self.output, "Glosor")?;

        self.load(loader).await?;

        loop {
            let phase = self.state_manager.read(|state| state.phase.clone());
            tracing::debug!("Showing {} view", phase);

            let flow = match phase {
                AppPhase::Loading => Flow::Reload,
                AppPhase::Failed(message) => self.failed_view(&message).await?,
                AppPhase::Quiz => self.quiz_view().await?,
                AppPhase::Result => self.result_view().await?,
            };

            match flow {
                Flow::Continue => {}
                Flow::Reload => self.load(loader).await?,
                Flow::Quit => break,
            }
        }

        writeln!(self.output, "Hej då!")?;
        self.output.flush()?;
        tracing::info!("Terminal controller finished");
        Ok(())
    }

    async fn load<S: VocabularySource>(&mut self, loader: &VocabularyLoader<S>) -> Result<()> {
        writeln!(self.output, "Laddar glosor...")?;
        self.output.flush()?;

        let started = Instant::now();
        let result = self.state_manager.load_vocabulary(loader).await;
        self.metrics
            .record_vocabulary_load(started.elapsed(), result.is_ok());

        if let Ok(count) = result {
            writeln!(self.output, "{} glosor laddade.", count)?;
            self.state_manager
                .start_quiz()
                .context("Failed to start quiz after loading vocabulary")?;
        }
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        self.output.flush()?;
        let line = self
            .lines
            .next_line()
            .await
            .context("Failed to read input")?;
        if line.is_none() {
            tracing::debug!("Input closed");
        }
        Ok(line)
    }

    fn prompt(&mut self) -> Result<()> {
        write!(self.output, "> ")?;
        Ok(())
    }

    async fn failed_view(&mut self, message: &str) -> Result<Flow> {
        writeln!(self.output, "{}", message)?;
        writeln!(self.output, "Skriv r för att försöka igen eller q för att avsluta.")?;

        loop {
            self.prompt()?;
            let Some(line) = self.next_line().await? else {
                return Ok(Flow::Quit);
            };
            match line.trim() {
                "r" | "R" => return Ok(Flow::Reload),
                "q" | "Q" | ":q" => return Ok(Flow::Quit),
                _ => writeln!(self.output, "Skriv r eller q.")?,
            }
        }
    }

    async fn quiz_view(&mut self) -> Result<Flow> {
        while let Some(word) = self.state_manager.present_current_word() {
            if let Some(progress) = self.state_manager.read(|state| state.quiz.progress()) {
                writeln!(self.output)?;
                writeln!(
                    self.output,
                    "Ord {} av {} ({}%)",
                    progress.current, progress.total, progress.percent
                )?;
            }
            writeln!(self.output, "  {}", word.swedish)?;

            if self.ask_word(&word).await? == Flow::Quit {
                return Ok(Flow::Quit);
            }
        }

        Ok(Flow::Continue)
    }

    /// Read input for one word until it has been answered.
    async fn ask_word(&mut self, word: &Word) -> Result<Flow> {
        loop {
            self.prompt()?;
            let Some(line) = self.next_line().await? else {
                return Ok(Flow::Quit);
            };

            match parse_quiz_input(&line) {
                QuizInput::Empty => {}
                QuizInput::Quit => return Ok(Flow::Quit),
                QuizInput::Speak(lang) => self.replay(word, lang, false)?,
                QuizInput::ToggleReadAloud => self.toggle_read_aloud()?,
                QuizInput::ShowList => {
                    let words = self.state_manager.read(|state| state.words().to_vec());
                    write_word_list(&mut self.output, &words)?;
                }
                QuizInput::Answer(text) => {
                    let answer = self.state_manager.submit_answer(&text)?;
                    if answer.correct {
                        writeln!(self.output, "RÄTT! Snyggt jobbat!")?;
                    } else {
                        writeln!(self.output, "Nästan! Försök igen nästa gång")?;
                        writeln!(self.output, "Rätt svar: {}", answer.word.english)?;
                    }
                    return self.wait_for_next(word).await;
                }
                QuizInput::Reveal { draft } => {
                    let revealed = self.state_manager.reveal_answer(&draft)?;
                    writeln!(self.output, "Rätt svar är: {}", revealed.english)?;
                    return self.ask_verdict(word).await;
                }
            }
        }
    }

    /// After a typed answer the feedback stays until the user moves on.
    async fn wait_for_next(&mut self, word: &Word) -> Result<Flow> {
        let last = self.state_manager.read(|state| state.quiz.is_complete());
        let next = if last { "att se resultatet" } else { "nästa ord" };
        writeln!(self.output, "Tryck Enter för {}.", next)?;

        loop {
            let Some(line) = self.next_line().await? else {
                return Ok(Flow::Quit);
            };
            match parse_quiz_input(&line) {
                QuizInput::Quit => return Ok(Flow::Quit),
                QuizInput::Speak(lang) => self.replay(word, lang, true)?,
                QuizInput::ToggleReadAloud => self.toggle_read_aloud()?,
                _ => return Ok(Flow::Continue),
            }
        }
    }

    async fn ask_verdict(&mut self, word: &Word) -> Result<Flow> {
        writeln!(self.output, "Kunde du det här ordet? (j/n)")?;

        loop {
            self.prompt()?;
            let Some(line) = self.next_line().await? else {
                return Ok(Flow::Quit);
            };

            if let Some(knew_it) = parse_verdict(&line) {
                self.state_manager.confirm_manual(knew_it)?;
                return Ok(Flow::Continue);
            }

            match parse_quiz_input(&line) {
                QuizInput::Quit => return Ok(Flow::Quit),
                QuizInput::Speak(lang) => self.replay(word, lang, true)?,
                QuizInput::ToggleReadAloud => self.toggle_read_aloud()?,
                _ => writeln!(self.output, "Svara j (ja) eller n (nej).")?,
            }
        }
    }

    fn replay(&mut self, word: &Word, lang: Language, answered: bool) -> Result<()> {
        if !self.speaker.is_supported() {
            writeln!(self.output, "Uppläsning stöds inte på den här datorn.")?;
            return Ok(());
        }

        match lang {
            Language::Sv => self.speaker.speak(&word.swedish, Language::Sv),
            Language::En if answered => self.speaker.speak(&word.english, Language::En),
            Language::En => writeln!(self.output, "Det engelska ordet läses upp när du har svarat.")?,
        }
        Ok(())
    }

    fn toggle_read_aloud(&mut self) -> Result<()> {
        if !self.speaker.is_supported() {
            writeln!(self.output, "Uppläsning stöds inte på den här datorn.")?;
            return Ok(());
        }

        let enabled = self.state_manager.toggle_read_aloud();
        let status = if enabled { "på" } else { "av" };
        writeln!(self.output, "Läs upp: {}", status)?;
        Ok(())
    }

    async fn result_view(&mut self) -> Result<Flow> {
        let Some(summary) = self.state_manager.read(|state| state.summary.clone()) else {
            // Result without a summary cannot be shown; start over instead
            tracing::warn!("Result view without a summary, restarting");
            self.state_manager.restart_quiz()?;
            return Ok(Flow::Continue);
        };

        writeln!(self.output)?;
        writeln!(self.output, "Resultat")?;
        writeln!(
            self.output,
            "{} av {} rätt ({}%)",
            summary.correct_count, summary.total_count, summary.percentage
        )?;
        if summary.all_correct() {
            writeln!(self.output, "Fantastiskt! Alla rätt!")?;
        }
        writeln!(self.output)?;

        for answer in &summary.answers {
            let mark = if answer.correct { '✓' } else { '✗' };
            write!(
                self.output,
                "{} {}: {}",
                mark, answer.word.swedish, answer.word.english
            )?;
            if !answer.user_answer.trim().is_empty() {
                write!(self.output, " (ditt svar: {})", answer.user_answer.trim())?;
            }
            if answer.manual_correction {
                write!(self.output, " [självrättad]")?;
            }
            writeln!(self.output)?;
        }

        writeln!(self.output)?;
        writeln!(self.output, "Skriv r för att försöka igen eller q för att avsluta.")?;

        loop {
            self.prompt()?;
            let Some(line) = self.next_line().await? else {
                return Ok(Flow::Quit);
            };
            match line.trim() {
                "r" | "R" => {
                    self.state_manager.restart_quiz()?;
                    return Ok(Flow::Continue);
                }
                "q" | "Q" | ":q" => return Ok(Flow::Quit),
                ":list" => {
                    let words = self.state_manager.read(|state| state.words().to_vec());
                    write_word_list(&mut self.output, &words)?;
                }
                _ => writeln!(self.output, "Skriv r eller q.")?,
            }
        }
    }
}
