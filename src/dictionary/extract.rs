//! # Markup Section Extractor
//!
//! ## Purpose
//! Turns one raw dictionary-entry HTML fragment into zero or more typed
//! sense blocks: part of speech, pronunciation, definitions and phrases.
//!
//! ## Input/Output Specification
//! - **Input**: Raw markup for a single headword (full page or fragment)
//! - **Output**: Ordered sense blocks, one per grammatical-sense sub-region
//! - **Failure semantics**: Zero meaningful blocks is "no content here",
//!   never an error
//!
//! ## Scoping
//! A page can hold several independent sense sub-regions under one headword
//! ("track" as noun and as verb share a page but must not share a block).
//! One pre-pass walk over the parsed tree records, for every node, the
//! innermost enclosing sense container and phrase block. Definition and
//! phrase blocks are then attributed by O(1) lookup to the container that
//! most closely encloses them, so a nested sense's definitions can never
//! leak into a sibling or parent sense.

use crate::utils::{absolutize_url, collapse_whitespace};
use crate::{Definition, Pronunciation, SenseBlock};
use ego_tree::iter::Edge;
use ego_tree::NodeId;
use once_cell::sync::Lazy;
use scraper::{CaseSensitivity, ElementRef, Html, Selector};
use std::collections::HashMap;

/// Class marking one grammatical-sense sub-region.
const SENSE_REGION_CLASS: &str = "entry-body__el";
/// Class marking a phrase sub-block inside a sense region.
const PHRASE_BLOCK_CLASS: &str = "phrase-block";
/// Class marking hidden/secondary translation wrappers to skip.
const HIDDEN_TRANSLATION_CLASS: &str = "hdb";

struct Selectors {
    sense_region: Selector,
    idiom_region: Selector,
    headword: Selector,
    bold: Selector,
    posgram: Selector,
    pos: Selector,
    uk_pron: Selector,
    us_pron: Selector,
    pron: Selector,
    audio_source: Selector,
    def_block: Selector,
    def_text: Selector,
    translation: Selector,
    phrase_block: Selector,
    phrase_title: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| {
    let parse = |css: &str| Selector::parse(css).expect("static selector");
    Selectors {
        sense_region: parse(".entry-body__el"),
        idiom_region: parse(".di-body"),
        headword: parse(".headword"),
        bold: parse("b"),
        posgram: parse(".posgram"),
        pos: parse(".pos"),
        uk_pron: parse(".uk.dpron-i"),
        us_pron: parse(".us.dpron-i"),
        pron: parse(".pron"),
        audio_source: parse(r#"audio source[type="audio/mpeg"]"#),
        def_block: parse(".def-block"),
        def_text: parse(".def"),
        translation: parse(".trans"),
        phrase_block: parse(".phrase-block"),
        phrase_title: parse(".phrase-title"),
    }
});

/// Scope lookup tables built in a single open/close-edge walk of the parsed
/// tree: each node maps to the id of its innermost enclosing sense container
/// and phrase block, if any.
struct ScopeMap {
    container: HashMap<NodeId, NodeId>,
    phrase: HashMap<NodeId, NodeId>,
}

impl ScopeMap {
    fn build(doc: &Html) -> Self {
        let mut container = HashMap::new();
        let mut phrase = HashMap::new();
        let mut container_stack: Vec<NodeId> = Vec::new();
        let mut phrase_stack: Vec<NodeId> = Vec::new();

        for edge in doc.root_element().traverse() {
            match edge {
                Edge::Open(node) => {
                    // The mapping is recorded before the node may open its
                    // own scope, so a nested container maps to its parent.
                    if let Some(top) = container_stack.last() {
                        container.insert(node.id(), *top);
                    }
                    if let Some(top) = phrase_stack.last() {
                        phrase.insert(node.id(), *top);
                    }
                    if let Some(el) = node.value().as_element() {
                        if el.has_class(SENSE_REGION_CLASS, CaseSensitivity::CaseSensitive) {
                            container_stack.push(node.id());
                        }
                        if el.has_class(PHRASE_BLOCK_CLASS, CaseSensitivity::CaseSensitive) {
                            phrase_stack.push(node.id());
                        }
                    }
                }
                Edge::Close(node) => {
                    if let Some(el) = node.value().as_element() {
                        if el.has_class(SENSE_REGION_CLASS, CaseSensitivity::CaseSensitive) {
                            container_stack.pop();
                        }
                        if el.has_class(PHRASE_BLOCK_CLASS, CaseSensitivity::CaseSensitive) {
                            phrase_stack.pop();
                        }
                    }
                }
            }
        }

        Self { container, phrase }
    }

    /// Loose mode: no sub-region markers exist, the whole fragment is one
    /// sense and every node scopes to the root.
    fn loose(doc: &Html) -> Self {
        let root = doc.root_element().id();
        let mut container = HashMap::new();
        let mut phrase = HashMap::new();
        let mut phrase_stack: Vec<NodeId> = Vec::new();

        for edge in doc.root_element().traverse() {
            match edge {
                Edge::Open(node) => {
                    container.insert(node.id(), root);
                    if let Some(top) = phrase_stack.last() {
                        phrase.insert(node.id(), *top);
                    }
                    if let Some(el) = node.value().as_element() {
                        if el.has_class(PHRASE_BLOCK_CLASS, CaseSensitivity::CaseSensitive) {
                            phrase_stack.push(node.id());
                        }
                    }
                }
                Edge::Close(node) => {
                    if let Some(el) = node.value().as_element() {
                        if el.has_class(PHRASE_BLOCK_CLASS, CaseSensitivity::CaseSensitive) {
                            phrase_stack.pop();
                        }
                    }
                }
            }
        }

        Self { container, phrase }
    }

    fn container_of(&self, node: NodeId) -> Option<NodeId> {
        self.container.get(&node).copied()
    }

    fn phrase_of(&self, node: NodeId) -> Option<NodeId> {
        self.phrase.get(&node).copied()
    }
}

/// Extracts scoped sense blocks from dictionary-entry markup.
pub struct SectionExtractor {
    base_url: String,
}

impl SectionExtractor {
    /// `base_url` is used to absolutize relative pronunciation audio links.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Extract every meaningful sense block from the given markup, in
    /// document order of sense sub-regions: full sense regions first, then
    /// standalone idiom regions parsed by the reduced variant.
    pub fn extract(&self, html: &str) -> Vec<SenseBlock> {
        let doc = Html::parse_document(html);
        let mut blocks = Vec::new();

        let has_sense_regions = doc.select(&SELECTORS.sense_region).next().is_some();
        let idiom_regions: Vec<ElementRef> = doc.select(&SELECTORS.idiom_region).collect();

        if !has_sense_regions && idiom_regions.is_empty() {
            // Backward-compatible looser mode.
            let scopes = ScopeMap::loose(&doc);
            let block = self.parse_sense_region(doc.root_element(), &scopes);
            if block.is_meaningful() {
                blocks.push(block);
            }
            return blocks;
        }

        let scopes = ScopeMap::build(&doc);

        for region in doc.select(&SELECTORS.sense_region) {
            let block = self.parse_sense_region(region, &scopes);
            if block.is_meaningful() {
                blocks.push(block);
            }
        }

        for region in idiom_regions {
            // An idiom region nested in (or wrapping) a sense region is just
            // page chrome; its content already belongs to that sense.
            if scopes.container_of(region.id()).is_some() {
                continue;
            }
            if region.select(&SELECTORS.sense_region).next().is_some() {
                continue;
            }
            let block = parse_idiom_region(region);
            if block.is_meaningful() {
                blocks.push(block);
            }
        }

        blocks
    }

    /// Full parse of one sense sub-region. Only descendants whose innermost
    /// sense container is this region are attributed to it.
    fn parse_sense_region(&self, region: ElementRef, scopes: &ScopeMap) -> SenseBlock {
        let mut block = SenseBlock::default();
        let region_id = region.id();
        let owned = |el: &ElementRef| scopes.container_of(el.id()) == Some(region_id);

        if let Some(headword) = region.select(&SELECTORS.headword).find(owned) {
            block.canonical_form = element_text(headword);
        }

        if let Some(posgram) = region
            .select(&SELECTORS.posgram)
            .find(owned)
            .or_else(|| region.select(&SELECTORS.pos).find(owned))
        {
            block.part_of_speech = element_text(posgram);
        }

        for (tag, selector) in [("uk", &SELECTORS.uk_pron), ("us", &SELECTORS.us_pron)] {
            if let Some(pron) = region.select(selector).find(owned) {
                let parsed = self.parse_pronunciation(pron);
                if !parsed.phonetic.is_empty() || !parsed.audio_url.is_empty() {
                    block.pronunciations.insert(tag.to_string(), parsed);
                }
            }
        }

        for def_block in region.select(&SELECTORS.def_block) {
            if scopes.container_of(def_block.id()) != Some(region_id) {
                continue;
            }
            // Definitions inside a phrase block belong to the phrase pass.
            if scopes.phrase_of(def_block.id()).is_some() {
                continue;
            }
            block.definitions.push(parse_definition(def_block));
        }

        for phrase_block in region.select(&SELECTORS.phrase_block) {
            if scopes.container_of(phrase_block.id()) != Some(region_id) {
                continue;
            }
            let phrase_id = phrase_block.id();
            let title = phrase_block
                .select(&SELECTORS.phrase_title)
                .find(|el| scopes.phrase_of(el.id()) == Some(phrase_id))
                .map(element_text)
                .unwrap_or_default();
            if title.is_empty() {
                continue;
            }

            // One definition per phrase keeps `phrases` and
            // `phrase_definitions` parallel by index.
            let definition = phrase_block
                .select(&SELECTORS.def_block)
                .find(|el| scopes.phrase_of(el.id()) == Some(phrase_id))
                .map(parse_definition)
                .unwrap_or_default();

            block.phrases.push(title);
            block.phrase_definitions.push(definition);
        }

        block
    }

    fn parse_pronunciation(&self, region: ElementRef) -> Pronunciation {
        let phonetic = region
            .select(&SELECTORS.pron)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let audio_url = region
            .select(&SELECTORS.audio_source)
            .next()
            .and_then(|source| source.value().attr("src"))
            .map(|src| absolutize_url(&self.base_url, src))
            .unwrap_or_default();
        Pronunciation {
            phonetic,
            audio_url,
        }
    }
}

/// Reduced variant for idiom/phrase-only regions: canonical form, part of
/// speech and definitions only.
fn parse_idiom_region(region: ElementRef) -> SenseBlock {
    let mut block = SenseBlock::default();

    if let Some(headword) = region.select(&SELECTORS.headword).next() {
        // The headword is sometimes wrapped in <b>.
        block.canonical_form = headword
            .select(&SELECTORS.bold)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| element_text(headword));
    }

    if let Some(pos) = region.select(&SELECTORS.pos).next() {
        block.part_of_speech = element_text(pos);
    }

    for def_block in region.select(&SELECTORS.def_block) {
        if within_phrase_block(def_block, region) {
            continue;
        }
        block.definitions.push(parse_definition(def_block));
    }

    block
}

/// Ancestor check bounded by the region root; only used by the reduced
/// idiom variant where no scope map exists.
fn within_phrase_block(el: ElementRef, region: ElementRef) -> bool {
    for ancestor in el.ancestors() {
        if ancestor.id() == region.id() {
            return false;
        }
        if let Some(element) = ancestor.value().as_element() {
            if element.has_class(PHRASE_BLOCK_CLASS, CaseSensitivity::CaseSensitive) {
                return true;
            }
        }
    }
    false
}

/// Parse one definition block: the English gloss plus the preferred
/// local-language translation. Translations nested under a hidden wrapper
/// are skipped, falling back to any non-empty candidate.
fn parse_definition(def_block: ElementRef) -> Definition {
    let english = def_block
        .select(&SELECTORS.def_text)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let candidates: Vec<ElementRef> = def_block.select(&SELECTORS.translation).collect();
    let mut translation = candidates
        .iter()
        .filter(|el| !under_hidden_wrapper(**el, def_block))
        .map(|el| element_text(*el))
        .find(|text| !text.is_empty())
        .unwrap_or_default();
    if translation.is_empty() {
        translation = candidates
            .iter()
            .map(|el| element_text(*el))
            .find(|text| !text.is_empty())
            .unwrap_or_default();
    }

    Definition {
        english,
        translation,
    }
}

fn under_hidden_wrapper(el: ElementRef, def_block: ElementRef) -> bool {
    for ancestor in el.ancestors() {
        if ancestor.id() == def_block.id() {
            return false;
        }
        if let Some(element) = ancestor.value().as_element() {
            if element.has_class(HIDDEN_TRANSLATION_CLASS, CaseSensitivity::CaseSensitive) {
                return true;
            }
        }
    }
    false
}

/// Extract the visible text of an element with adjacent text nodes always
/// separated by a space, then collapse all whitespace (including NBSP) to
/// single ASCII spaces.
fn element_text(el: ElementRef) -> String {
    let mut joined = String::new();
    for chunk in el.text() {
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(chunk);
    }
    collapse_whitespace(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SectionExtractor {
        SectionExtractor::new("https://dictionary.cambridge.org")
    }

    fn sense_region(headword: &str, pos: &str, body: &str) -> String {
        format!(
            r#"<div class="entry-body__el">
                 <span class="headword">{headword}</span>
                 <span class="posgram">{pos}</span>
                 {body}
               </div>"#
        )
    }

    fn def_block(en: &str, local: &str) -> String {
        format!(
            r#"<div class="def-block">
                 <div class="def">{en}</div>
                 <span class="trans">{local}</span>
               </div>"#
        )
    }

    #[test]
    fn sibling_senses_do_not_share_definitions() {
        let html = format!(
            "{}{}",
            sense_region("track", "noun", &def_block("a path", "小路")),
            sense_region("track", "verb", &def_block("to follow", "追踪"))
        );

        let blocks = extractor().extract(&html);
        assert_eq!(blocks.len(), 2);

        assert_eq!(blocks[0].part_of_speech, "noun");
        assert_eq!(blocks[0].definitions.len(), 1);
        assert_eq!(blocks[0].definitions[0].english, "a path");

        assert_eq!(blocks[1].part_of_speech, "verb");
        assert_eq!(blocks[1].definitions.len(), 1);
        assert_eq!(blocks[1].definitions[0].english, "to follow");
    }

    #[test]
    fn nested_sense_definitions_stay_with_the_inner_sense() {
        // The inner region's definition must not leak into the outer one.
        let inner = sense_region("trackless", "adjective", &def_block("without tracks", "无轨"));
        let html = sense_region(
            "track",
            "noun",
            &format!("{}{}", def_block("a path", "小路"), inner),
        );

        let blocks = extractor().extract(&html);
        assert_eq!(blocks.len(), 2);

        let outer = blocks.iter().find(|b| b.canonical_form == "track").unwrap();
        assert_eq!(outer.definitions.len(), 1);
        assert_eq!(outer.definitions[0].english, "a path");

        let nested = blocks
            .iter()
            .find(|b| b.canonical_form == "trackless")
            .unwrap();
        assert_eq!(nested.definitions.len(), 1);
        assert_eq!(nested.definitions[0].english, "without tracks");
    }

    #[test]
    fn inline_tags_never_glue_words_together() {
        let html = sense_region(
            "track down",
            "phrasal verb",
            &def_block("to find something", ""),
        )
        .replace(
            r#"<span class="headword">track down</span>"#,
            r#"<span class="headword">track<b> </b>down</span>"#,
        );
        let blocks = extractor().extract(&html);
        assert_eq!(blocks[0].canonical_form, "track down");

        // Text nodes separated only by an empty inline tag still get a space.
        let html = sense_region("x", "noun", "").replace(
            r#"<span class="headword">x</span>"#,
            r#"<span class="headword">track<i></i>down</span>"#,
        );
        let blocks = extractor().extract(&html);
        assert_eq!(blocks[0].canonical_form, "track down");
    }

    #[test]
    fn nbsp_collapses_to_single_space() {
        let html = sense_region("on\u{a0}\u{a0}track", "idiom", &def_block("as planned", ""));
        let blocks = extractor().extract(&html);
        assert_eq!(blocks[0].canonical_form, "on track");
    }

    #[test]
    fn phrase_blocks_feed_parallel_lists() {
        let body = format!(
            r#"{}
               <div class="phrase-block">
                 <div class="phrase-head"><span class="phrase-title">keep track</span></div>
                 {}
               </div>"#,
            def_block("a path", "小路"),
            def_block("to stay informed", "掌握动态"),
        );
        let html = sense_region("track", "noun", &body);

        let blocks = extractor().extract(&html);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];

        // The phrase definition must not appear among the plain definitions.
        assert_eq!(block.definitions.len(), 1);
        assert_eq!(block.definitions[0].english, "a path");

        assert_eq!(block.phrases, vec!["keep track".to_string()]);
        assert_eq!(block.phrase_definitions.len(), 1);
        assert_eq!(block.phrase_definitions[0].english, "to stay informed");
    }

    #[test]
    fn hidden_translations_are_skipped_with_fallback() {
        let body = r#"<div class="def-block">
                        <div class="def">a path</div>
                        <span class="hdb"><span class="trans">隐藏</span></span>
                        <span class="trans">小路</span>
                      </div>"#;
        let html = sense_region("track", "noun", body);
        let blocks = extractor().extract(&html);
        assert_eq!(blocks[0].definitions[0].translation, "小路");

        // Only a hidden candidate exists: fall back to it.
        let body = r#"<div class="def-block">
                        <div class="def">a path</div>
                        <span class="hdb"><span class="trans">隐藏</span></span>
                      </div>"#;
        let html = sense_region("track", "noun", body);
        let blocks = extractor().extract(&html);
        assert_eq!(blocks[0].definitions[0].translation, "隐藏");
    }

    #[test]
    fn pronunciations_are_scoped_and_absolutized() {
        let body = r#"<span class="uk dpron-i">
                        <span class="pron">/træk/</span>
                        <audio><source type="audio/mpeg" src="/media/uk_track.mp3"></audio>
                      </span>
                      <span class="us dpron-i">
                        <span class="pron">/træk/</span>
                        <audio><source type="audio/mpeg" src="/media/us_track.mp3"></audio>
                      </span>"#;
        let html = format!(
            "{}{}",
            sense_region("track", "noun", body),
            sense_region("track", "verb", "")
        );

        let blocks = extractor().extract(&html);
        let noun = &blocks[0];
        assert_eq!(noun.pronunciations["uk"].phonetic, "/træk/");
        assert_eq!(
            noun.pronunciations["uk"].audio_url,
            "https://dictionary.cambridge.org/media/uk_track.mp3"
        );
        assert_eq!(
            noun.pronunciations["us"].audio_url,
            "https://dictionary.cambridge.org/media/us_track.mp3"
        );

        // Verb region has no pronunciation markup of its own.
        assert!(blocks[1].pronunciations.is_empty());
    }

    #[test]
    fn idiom_regions_use_the_reduced_variant() {
        let html = format!(
            r#"<div class="di-body">
                 <h2 class="headword"><b>on track</b></h2>
                 <span class="pos">idiom</span>
                 {}
               </div>"#,
            def_block("doing the right thing to succeed", "走上正轨")
        );

        let blocks = extractor().extract(&html);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.canonical_form, "on track");
        assert_eq!(block.part_of_speech, "idiom");
        assert_eq!(block.definitions.len(), 1);
        assert!(block.pronunciations.is_empty());
        assert!(block.phrases.is_empty());
    }

    #[test]
    fn loose_mode_parses_unmarked_fragment_as_one_sense() {
        let html = format!(
            r#"<span class="headword">track</span><span class="posgram">noun</span>{}"#,
            def_block("a path", "小路")
        );
        let blocks = extractor().extract(&html);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].canonical_form, "track");
        assert_eq!(blocks[0].definitions.len(), 1);
    }

    #[test]
    fn empty_fragment_yields_no_blocks() {
        assert!(extractor().extract("<html><body></body></html>").is_empty());
        assert!(extractor()
            .extract(r#"<div class="entry-body__el"></div>"#)
            .is_empty());
    }
}
