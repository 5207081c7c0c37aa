//! # Lemma Resolver Interface
//!
//! Seeds the query word handed to the entry assembler: given a highlighted
//! surface form and its sentence, an implementation may produce the
//! dictionary base form ("ran" in "He ran home" becomes "run"). Resolution
//! is best-effort; `None` means "query the surface form as-is".

/// Maps a highlighted surface form to its dictionary base form.
pub trait LemmaResolver {
    /// `None` when no lemma could be determined; the caller falls back to
    /// the surface form.
    fn lemmatize(&self, sentence: &str, surface: &str) -> Option<String>;
}

/// Stand-in resolver that never lemmatizes. Every query uses the surface
/// form unchanged.
pub struct PassthroughLemmatizer;

impl LemmaResolver for PassthroughLemmatizer {
    fn lemmatize(&self, _sentence: &str, _surface: &str) -> Option<String> {
        None
    }
}
