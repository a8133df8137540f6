//! Fetching the vocabulary spreadsheet.
//!
//! The loader performs exactly one fetch per load. There is no automatic
//! retry; recovering from a failure means running a fresh load.

use crate::models::Word;
use crate::services::csv::parse_csv;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that end a vocabulary load
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Transport failure (`status` is `None`) or a non-success HTTP status
    #[error("Network error: {message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// The document parsed into zero usable rows
    #[error("No vocabulary rows found in the document")]
    EmptyData,
}

impl LoadError {
    /// Message shown to the user next to the reload affordance.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Network {
                status: Some(status),
                ..
            } => format!("Kunde inte ladda glosor: {}", status),
            LoadError::Network {
                status: None,
                message,
            } => format!("Kunde inte ladda glosor: {}", message),
            LoadError::EmptyData => "Inga glosor hittades i dokumentet".to_string(),
        }
    }
}

/// A response from a vocabulary source, before status handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Somewhere the raw CSV text can be fetched from.
///
/// Transport failures are reported as [`LoadError::Network`] without a
/// status; any response that arrives, successful or not, is returned as a
/// [`RawResponse`].
pub trait VocabularySource {
    fn fetch(&self) -> impl Future<Output = Result<RawResponse, LoadError>> + Send;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// HTTP GET of a fixed URL (the published spreadsheet export).
#[derive(Debug, Clone)]
pub struct HttpVocabularySource {
    client: reqwest::Client,
    url: String,
}

impl HttpVocabularySource {
    /// Build a source for `url`.
    ///
    /// No request timeout is applied unless one is given.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, LoadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| LoadError::Network {
            status: None,
            message: format!("failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl VocabularySource for HttpVocabularySource {
    async fn fetch(&self) -> Result<RawResponse, LoadError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LoadError::Network {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| LoadError::Network {
            status: Some(status),
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(RawResponse { status, body })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Loads the vocabulary set from a [`VocabularySource`].
#[derive(Debug, Clone)]
pub struct VocabularyLoader<S> {
    source: S,
}

impl<S: VocabularySource> VocabularyLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch once, check the status, parse, and reject an empty result.
    pub async fn load(&self) -> Result<Vec<Word>, LoadError> {
        let started = Instant::now();
        tracing::info!("Loading vocabulary from {}", self.source.describe());

        let response = self.source.fetch().await.inspect_err(|e| {
            tracing::error!("Vocabulary fetch failed: {}", e);
        })?;

        if !response.is_success() {
            tracing::error!("Vocabulary fetch returned HTTP {}", response.status);
            return Err(LoadError::Network {
                status: Some(response.status),
                message: format!("unexpected status {}", response.status),
            });
        }

        let words = parse_csv(&response.body);
        if words.is_empty() {
            tracing::warn!(
                "Vocabulary document ({} bytes) contained no usable rows",
                response.body.len()
            );
            return Err(LoadError::EmptyData);
        }

        tracing::info!(
            "Loaded {} words in {:.2}s",
            words.len(),
            started.elapsed().as_secs_f32()
        );
        Ok(words)
    }
}
