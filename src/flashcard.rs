//! # Flashcard Store Interface
//!
//! ## Purpose
//! Boundary to an external flashcard application. The pipeline hands over
//! fully assembled [`VocabularyRecord`]s and pre-rendered example HTML; it
//! knows nothing about how cards are stored. No concrete network
//! implementation lives here.
//!
//! ## Rendering
//! - `render_example_html`: escaped sentence with the target word wrapped in
//!   `<strong>` (case-insensitive, word-boundary match; multi-word targets
//!   match without boundaries)
//! - `render_blanked_html`: the target word's letters and digits replaced by
//!   underscores, for fill-in-the-blank cards

use crate::errors::Result;
use crate::{Sentence, VocabularyRecord};
use async_trait::async_trait;
use regex::Regex;

/// Opaque card identifier assigned by the external store.
pub type CardId = u64;

/// External flashcard application. Implementations own all transport and
/// card-format concerns.
#[async_trait]
pub trait FlashcardStore {
    /// Create the named collection if it does not exist yet.
    async fn ensure_collection(&self, name: &str) -> Result<()>;

    /// Look up the card for a canonical form, if one was created before.
    async fn find_existing_card(&self, canonical_form: &str) -> Result<Option<CardId>>;

    /// Create a card from a fully assembled record.
    async fn create_card(&self, record: &VocabularyRecord) -> Result<CardId>;

    /// Append pre-rendered example fragments to an existing card.
    async fn append_examples_to_card(&self, id: CardId, html_fragments: &[String]) -> Result<()>;
}

/// Render one example as an HTML fragment with the target word bolded.
/// The example's own surface text wins over `fallback_target`. Returns
/// `None` for an empty context.
pub fn render_example_html(example: &Sentence, fallback_target: &str) -> Option<String> {
    let context = example.context.trim();
    if context.is_empty() {
        return None;
    }

    let escaped = escape_html(context);
    let target = effective_target(example, fallback_target);
    let highlighted = match target_pattern(&target, true) {
        Some(pattern) => pattern
            .replace_all(&escaped, "<strong>$0</strong>")
            .into_owned(),
        None => escaped,
    };

    Some(wrap_example(&highlighted, &example.source.title))
}

/// Render one example with the target word blanked out: every letter or
/// digit of each occurrence becomes `_`, punctuation inside it survives.
pub fn render_blanked_html(example: &Sentence, fallback_target: &str) -> Option<String> {
    let context = example.context.trim();
    if context.is_empty() {
        return None;
    }

    let target = effective_target(example, fallback_target);
    // Multi-word targets match as-is; single words get boundaries so
    // "run" never blanks the middle of "running".
    let boundaries = !target.contains(' ');
    let blanked = match target_pattern(&target, boundaries) {
        Some(pattern) => pattern
            .replace_all(context, |caps: &regex::Captures<'_>| {
                caps[0]
                    .chars()
                    .map(|c| if c.is_alphanumeric() { '_' } else { c })
                    .collect::<String>()
            })
            .into_owned(),
        None => context.to_string(),
    };

    Some(wrap_example(&escape_html(&blanked), &example.source.title))
}

fn effective_target(example: &Sentence, fallback: &str) -> String {
    let surface = example.surface_text.trim();
    if surface.is_empty() {
        fallback.trim().to_string()
    } else {
        surface.to_string()
    }
}

fn target_pattern(target: &str, boundaries: bool) -> Option<Regex> {
    if target.is_empty() {
        return None;
    }
    let escaped = regex::escape(target);
    let pattern = if boundaries {
        format!(r"(?i)\b{escaped}\b")
    } else {
        format!("(?i){escaped}")
    };
    Regex::new(&pattern).ok()
}

fn wrap_example(text: &str, title: &str) -> String {
    let meta = if title.is_empty() {
        String::new()
    } else {
        format!(" — 《{}》", escape_html(title))
    };
    format!(
        "<div class='example'><div class='example-text'>{text}</div>\
         <div class='example-meta'>{meta}</div></div>"
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SentenceSource;

    fn example(surface: &str, context: &str, title: &str) -> Sentence {
        Sentence {
            surface_text: surface.to_string(),
            context: context.to_string(),
            source: SentenceSource {
                title: title.to_string(),
                chapter: String::new(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn bolds_target_case_insensitively_at_word_boundaries() {
        let html =
            render_example_html(&example("run", "Run fast, then keep running.", ""), "").unwrap();
        assert!(html.contains("<strong>Run</strong> fast"));
        // "running" must not be partially bolded.
        assert!(html.contains("keep running."));
        assert!(!html.contains("<strong>run</strong>ning"));
    }

    #[test]
    fn falls_back_to_the_record_word_when_surface_is_empty() {
        let html = render_example_html(&example("", "He had to track them.", ""), "track").unwrap();
        assert!(html.contains("<strong>track</strong>"));
    }

    #[test]
    fn escapes_markup_in_the_sentence_and_title() {
        let html = render_example_html(
            &example("run", "a <b>run</b> & more", "Tom & Jerry"),
            "",
        )
        .unwrap();
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("&amp; more"));
        assert!(html.contains("《Tom &amp; Jerry》"));
    }

    #[test]
    fn blanks_only_the_target_word() {
        let html = render_blanked_html(&example("litre", "One litre of milk.", ""), "").unwrap();
        assert!(html.contains("One _____ of milk."));
    }

    #[test]
    fn multiword_targets_blank_without_boundaries() {
        let html =
            render_blanked_html(&example("track down", "We track down clues.", ""), "").unwrap();
        assert!(html.contains("We _____ ____ clues."));
    }

    #[test]
    fn empty_context_renders_nothing() {
        assert!(render_example_html(&example("run", "   ", ""), "").is_none());
        assert!(render_blanked_html(&example("run", "", ""), "").is_none());
    }

    #[test]
    fn missing_target_leaves_sentence_untouched() {
        let html = render_example_html(&example("", "Nothing to bold here.", ""), "").unwrap();
        assert!(html.contains("Nothing to bold here."));
        assert!(!html.contains("<strong>"));
    }
}
