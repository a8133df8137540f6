//! Glosor - Swedish/English vocabulary flashcards in the terminal
//!
//! # Overview
//!
//! This binary wires the library to stdin/stdout. It initializes:
//! - Configuration loading ([`ConfigManager`]) from `Glosor Data/`
//! - Logging infrastructure (daily log files, optional stderr output)
//! - Tokio runtime (HTTP fetch, stdin, speech subprocesses)
//! - State management ([`StateManager`])
//! - Speech ([`SpeechService`]) and the [`EventBridge`] that drives it
//! - The [`TerminalController`] running the quiz
//!
//! # Execution Flow
//!
//! 1. Parse command line, load `Glosor Data/Glosor Settings.yaml` + `GLOSOR_*` overrides
//! 2. Initialize logging → logs/glosor.<date>
//! 3. Create tokio runtime
//! 4. Fetch the vocabulary once and run quiz sessions until the user quits
//! 5. Log the metrics summary and shut the runtime down with a timeout
//!
//! With `--list` the word list is printed instead and no quiz is run.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use glosor::services::speech::{SpeechService, Speaker};
use glosor::services::vocabulary::{HttpVocabularySource, VocabularyLoader};
use glosor::ui::{EventBridge, TerminalController, write_word_list};
use glosor::{APP_NAME, ConfigManager, Metrics, StateManager, UserConfig, VERSION};
use std::sync::Arc;
use std::time::Duration;

/// Command-line arguments for glosor
#[derive(Parser, Debug)]
#[command(name = "glosor")]
#[command(about = "Practise the week's Swedish/English vocabulary")]
#[command(version)]
struct Args {
    /// CSV export to load the words from (overrides the settings file)
    #[arg(long)]
    url: Option<String>,

    /// Directory holding Glosor Settings.yaml
    #[arg(long, default_value = "Glosor Data", env = "GLOSOR_CONFIG_DIR")]
    config_dir: Utf8PathBuf,

    /// Read words aloud from the start
    #[arg(long)]
    read_aloud: bool,

    /// Never use text-to-speech
    #[arg(long)]
    no_speech: bool,

    /// Debug level logging, also echoed to stderr
    #[arg(long)]
    debug: bool,

    /// Print the word list and exit
    #[arg(long)]
    list: bool,
}

/// Apply command-line overrides on top of the loaded settings
fn apply_args(mut config: UserConfig, args: &Args) -> UserConfig {
    if let Some(url) = &args.url {
        config.vocabulary.sheet_url = url.clone();
    }
    if args.read_aloud {
        config.quiz.read_aloud = true;
    }
    if args.no_speech {
        config.speech.enabled = false;
    }
    if args.debug {
        config.logging.debug_mode = true;
    }
    config
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let user_config = apply_args(config_manager.load_user_config()?, &args);

    let debug = user_config.logging.debug_mode;
    let _log_guard = glosor::logging::setup_logging_with_console(
        &user_config.logging.directory,
        APP_NAME,
        debug,
        debug,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("glosor-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let result = runtime.block_on(run(user_config, args.list));

    // stdin is read on a blocking thread that cannot be cancelled, so do not
    // wait for it indefinitely
    runtime.shutdown_timeout(Duration::from_secs(2));
    tracing::info!("Application shutdown complete");

    result.inspect_err(|e| tracing::error!("Fatal error: {:#}", e))
}

async fn run(user_config: UserConfig, list_only: bool) -> Result<()> {
    let timeout = user_config.vocabulary.request_timeout_secs.map(Duration::from_secs);
    let source = HttpVocabularySource::new(&user_config.vocabulary.sheet_url, timeout)
        .context("Failed to set up vocabulary source")?;
    let loader = VocabularyLoader::new(source);

    if list_only {
        let words = loader.load().await.map_err(|e| anyhow::anyhow!(e.user_message()))?;
        write_word_list(&mut std::io::stdout(), &words)?;
        return Ok(());
    }

    let metrics = Arc::new(Metrics::new());
    let state_manager = StateManager::new();
    state_manager.load_from_user_config(&user_config);

    let speech = Arc::new(SpeechService::new(user_config.speech.clone()).with_metrics(metrics.clone()));
    state_manager.set_speech_supported(speech.is_supported());
    if speech.is_supported() {
        // Query the voice catalogue off the async workers before the first word
        let warm = speech.clone();
        tokio::task::spawn_blocking(move || warm.voices().len());
    }

    let speaker: Arc<dyn Speaker> = speech.clone();
    let bridge = EventBridge::spawn(state_manager.clone(), speaker.clone(), metrics.clone());

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut controller = TerminalController::new(
        stdin,
        std::io::stdout(),
        state_manager,
        speaker,
        metrics.clone(),
    );
    let result = controller.run(&loader).await;

    speech.stop();
    bridge.shutdown().await;
    metrics.log_summary();

    result
}
