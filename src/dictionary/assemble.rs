//! # Entry Assembler
//!
//! ## Purpose
//! Resolves one query word into a [`DictionaryEntry`]: tries a fixed ordered
//! list of candidate page URLs (one per dictionary variant), accepts the
//! first URL whose extraction yields at least one meaningful sense block,
//! then drives alternate-spelling redirect expansion.
//!
//! ## Semantics
//! - "First success wins": earlier failing candidates are skipped outright,
//!   never partially merged.
//! - Fetch failures and parse-empty pages are indistinguishable; both just
//!   move the loop to the next candidate.
//! - When every candidate fails the assembler emits the unresolved
//!   placeholder entry instead of an error.
//! - The last successful variant is remembered as an explicit hint on the
//!   assembler, tried first on the next query and invalidated when it
//!   misses.

use crate::config::DictionaryConfig;
use crate::dictionary::extract::SectionExtractor;
use crate::dictionary::redirect;
use crate::fetch::PageFetcher;
use crate::{DictionaryEntry, SenseBlock};
use std::collections::HashSet;

/// Resolution state machine. A query starts in `Querying` and always ends
/// in `Resolved`; the placeholder state marks entries needing manual input
/// downstream.
enum ResolveState {
    Querying,
    Extracted {
        url: String,
        senses: Vec<SenseBlock>,
    },
    PlaceholderNeedsManualInput,
    Resolved(DictionaryEntry),
}

/// Assembles dictionary entries from candidate page URLs.
pub struct EntryAssembler<F: PageFetcher> {
    config: DictionaryConfig,
    fetcher: F,
    extractor: SectionExtractor,
    /// Index of the last candidate template that produced content. Tried
    /// first on subsequent queries, cleared as soon as it misses.
    variant_hint: Option<usize>,
}

impl<F: PageFetcher> EntryAssembler<F> {
    pub fn new(config: DictionaryConfig, fetcher: F) -> Self {
        let extractor = SectionExtractor::new(config.base_url.clone());
        Self {
            config,
            fetcher,
            extractor,
            variant_hint: None,
        }
    }

    /// Resolve a query word. Never fails: every failure path converges on
    /// the placeholder entry.
    pub async fn resolve(&mut self, query: &str) -> DictionaryEntry {
        let mut state = ResolveState::Querying;
        loop {
            state = match state {
                ResolveState::Querying => match self.fetch_candidates(query).await {
                    Some((url, senses)) => ResolveState::Extracted { url, senses },
                    None => ResolveState::PlaceholderNeedsManualInput,
                },
                ResolveState::Extracted { url, senses } => {
                    let senses = self.expand_redirects(query, senses).await;
                    ResolveState::Resolved(DictionaryEntry {
                        source_url: url,
                        senses,
                    })
                }
                ResolveState::PlaceholderNeedsManualInput => {
                    tracing::warn!("No dictionary content for '{}', emitting placeholder", query);
                    ResolveState::Resolved(DictionaryEntry::placeholder())
                }
                ResolveState::Resolved(entry) => return entry,
            };
        }
    }

    /// Resolve either a bare query word or a direct page URL (manual
    /// correction flows paste full URLs).
    pub async fn resolve_query(&mut self, word_or_url: &str) -> DictionaryEntry {
        if word_or_url.starts_with("http://") || word_or_url.starts_with("https://") {
            if let Some(body) = self.fetcher.fetch(word_or_url).await {
                let senses = self.extractor.extract(&body);
                if !senses.is_empty() {
                    return DictionaryEntry {
                        source_url: word_or_url.to_string(),
                        senses,
                    };
                }
            }
            tracing::warn!("No dictionary content at {}, emitting placeholder", word_or_url);
            return DictionaryEntry::placeholder();
        }
        self.resolve(word_or_url).await
    }

    /// One pass over the candidate URLs: first non-empty extraction wins.
    async fn fetch_candidates(&mut self, word: &str) -> Option<(String, Vec<SenseBlock>)> {
        let slug = slugify(word);
        for idx in self.candidate_order() {
            let url = self.config.candidate_url_templates[idx].replace("{word}", &slug);
            tracing::debug!("Trying candidate {} for '{}'", url, word);

            if let Some(body) = self.fetcher.fetch(&url).await {
                let senses = self.extractor.extract(&body);
                if !senses.is_empty() {
                    self.variant_hint = Some(idx);
                    return Some((url, senses));
                }
            }

            if self.variant_hint == Some(idx) {
                tracing::debug!("Variant hint {} missed, invalidating", idx);
                self.variant_hint = None;
            }
        }
        None
    }

    /// Candidate indexes in try-order: the remembered variant first, then
    /// the configured order.
    fn candidate_order(&self) -> Vec<usize> {
        let count = self.config.candidate_url_templates.len();
        match self.variant_hint {
            Some(hint) if hint < count => std::iter::once(hint)
                .chain((0..count).filter(|&i| i != hint))
                .collect(),
            _ => (0..count).collect(),
        }
    }

    /// Bounded-depth alternate-spelling expansion. Targets found in the
    /// starting senses are one wave; their own redirects are only followed
    /// while under the configured depth. Fruitless re-fetches leave the
    /// original result unchanged.
    async fn expand_redirects(
        &mut self,
        query: &str,
        senses: Vec<SenseBlock>,
    ) -> Vec<SenseBlock> {
        let max_depth = self.config.redirect_depth;
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(query.trim().to_lowercase());

        let mut all = senses;
        let mut frontier = redirect::collect_targets(&all, &visited);
        let mut depth = 0;

        while depth < max_depth && !frontier.is_empty() {
            let mut next = Vec::new();
            for target in frontier {
                visited.insert(target.trim().to_lowercase());
                tracing::debug!("Resolving alternate spelling '{}' of '{}'", target, query);

                let Some((_, resolved)) = self.fetch_candidates(&target).await else {
                    continue;
                };
                let before = all.len();
                let appended = redirect::merge_unique_senses(&mut all, resolved);
                if appended > 0 && depth + 1 < max_depth {
                    next.extend(redirect::collect_targets(&all[before..], &visited));
                }
            }
            frontier = next
                .into_iter()
                .filter(|t| !visited.contains(&t.to_lowercase()))
                .collect();
            depth += 1;
        }

        all
    }
}

/// Page paths use hyphens where the query word has spaces.
fn slugify(word: &str) -> String {
    word.split_whitespace().collect::<Vec<_>>().join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeFetcher {
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.clone()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Option<String> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned()
        }
    }

    fn test_config() -> DictionaryConfig {
        DictionaryConfig {
            candidate_url_templates: vec![
                "https://dict.test/bilingual/{word}".to_string(),
                "https://dict.test/mono/{word}".to_string(),
            ],
            base_url: "https://dict.test".to_string(),
            redirect_depth: 1,
            ..Default::default()
        }
    }

    fn entry_page(headword: &str, definition: &str) -> String {
        format!(
            r#"<div class="entry-body__el">
                 <span class="headword">{headword}</span>
                 <span class="posgram">noun</span>
                 <div class="def-block"><div class="def">{definition}</div></div>
               </div>"#
        )
    }

    fn assembler(fetcher: FakeFetcher) -> EntryAssembler<FakeFetcher> {
        EntryAssembler::new(test_config(), fetcher)
    }

    #[tokio::test]
    async fn first_successful_candidate_wins() {
        let fetcher = FakeFetcher::new(&[
            (
                "https://dict.test/bilingual/track",
                entry_page("track", "a path"),
            ),
            (
                "https://dict.test/mono/track",
                entry_page("track", "a different path"),
            ),
        ]);
        let mut assembler = assembler(fetcher);

        let entry = assembler.resolve("track").await;
        assert_eq!(entry.source_url, "https://dict.test/bilingual/track");
        assert_eq!(entry.senses.len(), 1);
        assert_eq!(entry.senses[0].definitions[0].english, "a path");
        assert_eq!(
            assembler.fetcher.calls(),
            vec!["https://dict.test/bilingual/track".to_string()]
        );
    }

    #[tokio::test]
    async fn falls_through_to_later_candidate() {
        let fetcher = FakeFetcher::new(&[(
            "https://dict.test/mono/track",
            entry_page("track", "a path"),
        )]);
        let mut assembler = assembler(fetcher);

        let entry = assembler.resolve("track").await;
        assert_eq!(entry.source_url, "https://dict.test/mono/track");
    }

    #[tokio::test]
    async fn parse_empty_counts_as_failure() {
        let fetcher = FakeFetcher::new(&[
            (
                "https://dict.test/bilingual/track",
                "<html><body>nothing here</body></html>".to_string(),
            ),
            (
                "https://dict.test/mono/track",
                entry_page("track", "a path"),
            ),
        ]);
        let mut assembler = assembler(fetcher);

        let entry = assembler.resolve("track").await;
        assert_eq!(entry.source_url, "https://dict.test/mono/track");
    }

    #[tokio::test]
    async fn all_failures_yield_placeholder() {
        let mut assembler = assembler(FakeFetcher::new(&[]));
        let entry = assembler.resolve("blorp").await;
        assert_eq!(entry, DictionaryEntry::placeholder());
    }

    #[tokio::test]
    async fn multiword_queries_are_slugified() {
        let fetcher = FakeFetcher::new(&[(
            "https://dict.test/bilingual/track-down",
            entry_page("track down", "to find"),
        )]);
        let mut assembler = assembler(fetcher);

        let entry = assembler.resolve("track down").await;
        assert_eq!(entry.senses[0].canonical_form, "track down");
    }

    #[tokio::test]
    async fn spelling_redirect_is_expanded_without_duplicates() {
        let fetcher = FakeFetcher::new(&[
            (
                "https://dict.test/bilingual/liter",
                entry_page("liter", "US spelling of litre"),
            ),
            (
                "https://dict.test/bilingual/litre",
                entry_page("litre", "a unit for measuring volume"),
            ),
        ]);
        let mut assembler = assembler(fetcher);

        let entry = assembler.resolve("liter").await;
        assert_eq!(entry.senses.len(), 2);
        assert_eq!(entry.senses[0].canonical_form, "liter");
        assert_eq!(entry.senses[1].canonical_form, "litre");

        let signatures: std::collections::HashSet<_> =
            entry.senses.iter().map(SenseBlock::signature).collect();
        assert_eq!(signatures.len(), entry.senses.len());
    }

    #[tokio::test]
    async fn mutual_redirects_terminate() {
        let fetcher = FakeFetcher::new(&[
            (
                "https://dict.test/bilingual/a",
                entry_page("a", "UK spelling of b"),
            ),
            (
                "https://dict.test/bilingual/b",
                entry_page("b", "US spelling of a"),
            ),
        ]);
        let mut assembler = assembler(fetcher);

        let entry = assembler.resolve("a").await;
        // Both fetched pages are kept; the back-reference to "a" is never
        // re-fetched.
        assert_eq!(entry.senses.len(), 2);
        let fetches_of_a = assembler
            .fetcher
            .calls()
            .iter()
            .filter(|url| url.ends_with("/a"))
            .count();
        assert_eq!(fetches_of_a, 1);
    }

    #[tokio::test]
    async fn expansion_depth_is_bounded() {
        let pages = [
            (
                "https://dict.test/bilingual/x",
                entry_page("x", "US spelling of y"),
            ),
            (
                "https://dict.test/bilingual/y",
                entry_page("y", "US spelling of z"),
            ),
            (
                "https://dict.test/bilingual/z",
                entry_page("z", "the real entry"),
            ),
        ];

        // Default depth 1: y is resolved, z is not followed.
        let mut shallow = assembler(FakeFetcher::new(&pages));
        let entry = shallow.resolve("x").await;
        assert_eq!(entry.senses.len(), 2);

        // Depth 2 follows the chain one wave further.
        let mut config = test_config();
        config.redirect_depth = 2;
        let mut deep = EntryAssembler::new(config, FakeFetcher::new(&pages));
        let entry = deep.resolve("x").await;
        assert_eq!(entry.senses.len(), 3);
        assert_eq!(entry.senses[2].canonical_form, "z");
    }

    #[tokio::test]
    async fn fruitless_redirect_keeps_original_result() {
        let fetcher = FakeFetcher::new(&[(
            "https://dict.test/bilingual/liter",
            entry_page("liter", "US spelling of litre"),
        )]);
        let mut assembler = assembler(fetcher);

        let entry = assembler.resolve("liter").await;
        assert_eq!(entry.senses.len(), 1);
        assert_eq!(entry.senses[0].canonical_form, "liter");
    }

    #[tokio::test]
    async fn variant_hint_reorders_and_invalidates() {
        let fetcher = FakeFetcher::new(&[
            (
                "https://dict.test/mono/first",
                entry_page("first", "only monolingual"),
            ),
            (
                "https://dict.test/mono/second",
                entry_page("second", "also monolingual"),
            ),
            (
                "https://dict.test/bilingual/third",
                entry_page("third", "only bilingual"),
            ),
        ]);
        let mut assembler = assembler(fetcher);

        // First query falls through to the monolingual variant.
        assembler.resolve("first").await;
        // Second query should try the remembered variant first.
        assembler.resolve("second").await;
        let calls = assembler.fetcher.calls();
        assert_eq!(calls[2], "https://dict.test/mono/second");
        assert_eq!(calls.len(), 3);

        // Third query misses the hint, invalidating it before the
        // bilingual candidate succeeds.
        assembler.resolve("third").await;
        let calls = assembler.fetcher.calls();
        assert_eq!(calls[3], "https://dict.test/mono/third");
        assert_eq!(calls[4], "https://dict.test/bilingual/third");
    }

    #[tokio::test]
    async fn direct_url_query_bypasses_candidates() {
        let fetcher = FakeFetcher::new(&[(
            "https://dict.test/custom/track",
            entry_page("track", "a path"),
        )]);
        let mut assembler = assembler(fetcher);

        let entry = assembler.resolve_query("https://dict.test/custom/track").await;
        assert_eq!(entry.source_url, "https://dict.test/custom/track");
        assert_eq!(entry.senses[0].canonical_form, "track");

        let missing = assembler.resolve_query("https://dict.test/custom/gone").await;
        assert_eq!(missing, DictionaryEntry::placeholder());
    }
}
