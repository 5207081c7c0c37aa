//! # Wordstock Vocabulary Corpus Builder
//!
//! ## Overview
//! This library builds and maintains a personal vocabulary corpus for
//! spaced-repetition flashcards, sourced from e-reader highlights and movie
//! subtitles. Dictionary pages are scraped into structured entries and
//! reconciled with the previously saved corpus without duplicating sentence
//! examples or grammatical senses.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `dictionary`: Section extraction, redirect resolution and entry assembly
//! - `fetch`: Page fetcher abstraction and HTTP implementation
//! - `merge`: Record reconciliation and deduplication engine
//! - `snapshot`: Dated corpus snapshot persistence
//! - `flashcard`: Flashcard store interface and example rendering
//! - `lemma`: Lemmatizer interface used to seed query words
//! - `pipeline`: Sequential run orchestration
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Highlighted words with their containing sentences, raw
//!   dictionary-entry HTML
//! - **Output**: A merged corpus of vocabulary records, persisted as one
//!   dated JSON snapshot per run
//!
//! ## Usage
//! ```rust,no_run
//! use wordstock::{Config, pipeline::HarvestPipeline};
//! use wordstock::fetch::HttpPageFetcher;
//! use wordstock::lemma::PassthroughLemmatizer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let fetcher = HttpPageFetcher::new(&config.dictionary)?;
//!     let mut pipeline = HarvestPipeline::new(config, fetcher);
//!     let stats = pipeline.run(Vec::new(), &PassthroughLemmatizer, None).await?;
//!     println!("Resolved {} words", stats.resolved);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod dictionary;
pub mod fetch;
pub mod merge;
pub mod snapshot;
pub mod flashcard;
pub mod lemma;
pub mod pipeline;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{HarvestError, Result};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One pronunciation variant of a headword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pronunciation {
    /// Phonetic transcription as printed on the page
    pub phonetic: String,
    /// Absolute URL of the pronunciation audio, empty if none
    pub audio_url: String,
}

/// One definition: the English gloss and its local-language translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Definition {
    pub english: String,
    pub translation: String,
}

/// One grammatical sense of a headword, as extracted from a single sense
/// sub-region of a dictionary page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenseBlock {
    /// Free-text part-of-speech label, e.g. "noun"; may be empty
    pub part_of_speech: String,
    /// The headword as printed on the page; empty means "unresolved"
    pub canonical_form: String,
    /// Pronunciations keyed by region tag ("uk", "us")
    pub pronunciations: BTreeMap<String, Pronunciation>,
    /// Definitions in document order
    pub definitions: Vec<Definition>,
    /// Phrase headings in document order
    pub phrases: Vec<String>,
    /// Phrase definitions, parallel by index to `phrases`
    pub phrase_definitions: Vec<Definition>,
}

impl SenseBlock {
    /// A block is meaningful iff it has a canonical form, at least one
    /// definition, or at least one phrase. Empty blocks must never be
    /// persisted or merged.
    pub fn is_meaningful(&self) -> bool {
        !self.canonical_form.is_empty() || !self.definitions.is_empty() || !self.phrases.is_empty()
    }

    /// Structural fingerprint used to detect duplicate senses. Definition
    /// and phrase order is irrelevant to identity.
    pub fn signature(&self) -> SenseSignature {
        let pair =
            |d: &Definition| (d.english.trim().to_string(), d.translation.trim().to_string());
        SenseSignature {
            part_of_speech: self.part_of_speech.trim().to_string(),
            canonical_form: self.canonical_form.trim().to_string(),
            definitions: self.definitions.iter().map(pair).collect(),
            phrases: self.phrases.iter().map(|p| p.trim().to_string()).collect(),
            phrase_definitions: self.phrase_definitions.iter().map(pair).collect(),
        }
    }
}

/// Structural fingerprint of a [`SenseBlock`]. Two blocks with equal
/// signatures are considered the same sense.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SenseSignature {
    part_of_speech: String,
    canonical_form: String,
    definitions: BTreeSet<(String, String)>,
    phrases: BTreeSet<String>,
    phrase_definitions: BTreeSet<(String, String)>,
}

/// Result of resolving one query word against the dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryEntry {
    /// URL the entry was extracted from; empty for manual placeholders
    pub source_url: String,
    /// Sense blocks in document order
    pub senses: Vec<SenseBlock>,
}

impl DictionaryEntry {
    /// The documented "unresolved" sentinel: empty source URL plus one empty
    /// sense block. Downstream tooling treats it as "needs manual attention".
    pub fn placeholder() -> Self {
        Self {
            source_url: String::new(),
            senses: vec![SenseBlock::default()],
        }
    }

    /// True when any sense still lacks a canonical form, i.e. the entry has
    /// an unresolved slot the merge engine may later heal.
    pub fn has_unresolved_sense(&self) -> bool {
        self.senses.iter().any(|s| s.canonical_form.is_empty())
    }
}

/// Where a highlighted sentence came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceSource {
    /// Book or media title
    pub title: String,
    /// Chapter or location within the source
    pub chapter: String,
}

/// One highlighted or collected usage of a word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentence {
    /// The literal token or phrase as it appeared
    pub surface_text: String,
    /// The full sentence containing it, whitespace-normalized.
    /// This is the identity used for example deduplication.
    pub context: String,
    pub source: SentenceSource,
    pub collected_on: Option<NaiveDate>,
}

/// One corpus entry: a resolved dictionary entry plus every collected usage.
/// The unit of merge and snapshot storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyRecord {
    pub entry: DictionaryEntry,
    pub examples: Vec<Sentence>,
}

impl VocabularyRecord {
    /// Canonical key used to match records during a merge: the lowercased,
    /// trimmed canonical form of the first sense when present, otherwise the
    /// lowercased, trimmed surface text of the first example.
    ///
    /// Known limitation inherited from the fallback: two genuinely different
    /// words whose records both lack a canonical form and share one example
    /// surface text will collide under this key.
    pub fn merge_key(&self) -> Option<String> {
        if let Some(first) = self.entry.senses.first() {
            let form = first.canonical_form.trim();
            if !form.is_empty() {
                return Some(form.to_lowercase());
            }
        }
        if let Some(example) = self.examples.first() {
            let surface = example.surface_text.trim();
            if !surface.is_empty() {
                return Some(surface.to_lowercase());
            }
        }
        None
    }
}
