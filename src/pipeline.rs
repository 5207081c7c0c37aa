//! # Harvest Pipeline
//!
//! ## Purpose
//! Orchestrates one sequential run: load the closest corpus snapshot,
//! resolve every highlighted word through the entry assembler (one at a
//! time, with a politeness delay between page fetches), merge the results
//! into the corpus, save today's snapshot and optionally upsert the newly
//! resolved records into a flashcard store.
//!
//! ## Processing Model
//! Strictly sequential: one word is fully resolved before the next begins.
//! The in-memory corpus is owned by this pipeline for the run's duration.

use crate::config::Config;
use crate::dictionary::EntryAssembler;
use crate::errors::Result;
use crate::fetch::PageFetcher;
use crate::flashcard::{self, FlashcardStore};
use crate::lemma::LemmaResolver;
use crate::merge::merge;
use crate::snapshot::SnapshotStore;
use crate::utils::normalize_context;
use crate::{Sentence, SentenceSource, VocabularyRecord};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// One highlighted word as ingested from an export file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Highlight {
    /// The highlighted token or phrase
    pub word: String,
    /// The full sentence it appeared in
    pub sentence: String,
    /// Book or media title
    pub title: String,
    /// Chapter or location within the source
    pub chapter: String,
    pub collected_on: Option<NaiveDate>,
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Highlights taken from the input
    pub processed: usize,
    /// Queries that resolved to at least one meaningful sense
    pub resolved: usize,
    /// Queries that fell through to the unresolved placeholder
    pub placeholders: usize,
    /// Records in the corpus after the merge
    pub corpus_size: usize,
    /// Flashcards created this run
    pub cards_created: usize,
    /// Flashcards that received appended examples
    pub cards_updated: usize,
}

/// Sequential harvest run over a batch of highlights.
pub struct HarvestPipeline<F: PageFetcher> {
    config: Config,
    assembler: EntryAssembler<F>,
    dry_run: bool,
}

impl<F: PageFetcher> HarvestPipeline<F> {
    pub fn new(config: Config, fetcher: F) -> Self {
        let assembler = EntryAssembler::new(config.dictionary.clone(), fetcher);
        Self {
            config,
            assembler,
            dry_run: false,
        }
    }

    /// Resolve and merge without writing a snapshot or touching flashcards.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run against today's date.
    pub async fn run(
        &mut self,
        highlights: Vec<Highlight>,
        lemmatizer: &dyn LemmaResolver,
        flashcards: Option<&dyn FlashcardStore>,
    ) -> Result<PipelineStats> {
        let today = chrono::Local::now().date_naive();
        self.run_for_date(highlights, lemmatizer, flashcards, today)
            .await
    }

    /// Run with an explicit reference date for snapshot selection and
    /// naming.
    pub async fn run_for_date(
        &mut self,
        highlights: Vec<Highlight>,
        lemmatizer: &dyn LemmaResolver,
        flashcards: Option<&dyn FlashcardStore>,
        date: NaiveDate,
    ) -> Result<PipelineStats> {
        let store = SnapshotStore::new(&self.config.snapshot.corpus_dir);
        let base = store.load_closest_snapshot(date)?;
        tracing::info!(
            "Starting harvest run: {} highlights, {} records loaded",
            highlights.len(),
            base.len()
        );

        let mut stats = PipelineStats::default();
        let mut incoming: Vec<VocabularyRecord> = Vec::new();
        let delay = Duration::from_millis(self.config.dictionary.rate_limit_delay_ms);

        for (i, highlight) in highlights.iter().enumerate() {
            stats.processed += 1;
            let surface = highlight.word.trim();
            if surface.is_empty() {
                tracing::warn!("Skipping highlight {} with empty word", i);
                continue;
            }

            let query = lemmatizer
                .lemmatize(&highlight.sentence, surface)
                .unwrap_or_else(|| surface.to_string());

            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let entry = self.assembler.resolve(&query).await;
            if entry.source_url.is_empty() {
                tracing::warn!("'{}' is unresolved and needs manual attention", query);
                stats.placeholders += 1;
            } else {
                stats.resolved += 1;
            }

            incoming.push(VocabularyRecord {
                entry,
                examples: Self::example_from(highlight, date),
            });
        }

        let merged = merge(&base, &incoming);
        stats.corpus_size = merged.len();

        if self.dry_run {
            tracing::info!("Dry run, snapshot not written");
        } else {
            store.save_snapshot(&merged, date)?;
        }

        if let Some(cards) = flashcards {
            if self.dry_run {
                tracing::info!("Dry run, flashcards untouched");
            } else {
                self.upsert_cards(cards, &incoming, &mut stats).await?;
            }
        }

        tracing::info!(
            "Run complete: {} processed, {} resolved, {} placeholders, corpus {}",
            stats.processed,
            stats.resolved,
            stats.placeholders,
            stats.corpus_size
        );
        Ok(stats)
    }

    /// Push this run's resolved records into the flashcard store: new words
    /// become cards, known words receive their new examples.
    async fn upsert_cards(
        &self,
        cards: &dyn FlashcardStore,
        incoming: &[VocabularyRecord],
        stats: &mut PipelineStats,
    ) -> Result<()> {
        cards
            .ensure_collection(&self.config.flashcard.collection)
            .await?;

        for record in incoming {
            let Some(key) = record.merge_key() else {
                continue;
            };
            if record.entry.source_url.is_empty() {
                // Placeholders wait for manual resolution before becoming
                // cards.
                continue;
            }

            match cards.find_existing_card(&key).await? {
                Some(id) => {
                    let fragments: Vec<String> = record
                        .examples
                        .iter()
                        .filter_map(|e| flashcard::render_example_html(e, &key))
                        .collect();
                    if !fragments.is_empty() {
                        cards.append_examples_to_card(id, &fragments).await?;
                        stats.cards_updated += 1;
                    }
                }
                None => {
                    cards.create_card(record).await?;
                    stats.cards_created += 1;
                }
            }
        }
        Ok(())
    }

    fn example_from(highlight: &Highlight, date: NaiveDate) -> Vec<Sentence> {
        let context = normalize_context(&highlight.sentence);
        if context.is_empty() {
            return Vec::new();
        }
        vec![Sentence {
            surface_text: highlight.word.trim().to_string(),
            context,
            source: SentenceSource {
                title: highlight.title.clone(),
                chapter: highlight.chapter.clone(),
            },
            collected_on: highlight.collected_on.or(Some(date)),
        }]
    }
}
