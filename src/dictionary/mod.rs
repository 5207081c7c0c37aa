//! # Dictionary Module
//!
//! ## Purpose
//! Everything between a raw dictionary page and a structured
//! [`DictionaryEntry`](crate::DictionaryEntry): section extraction, alternate-
//! spelling redirect resolution and candidate-URL entry assembly.
//!
//! ## Architecture
//! - `extract`: Markup section extractor producing scoped sense blocks
//! - `redirect`: Alternate-spelling detection and signature-deduplicated
//!   sense merging
//! - `assemble`: Candidate-URL loop, placeholder fallback and redirect
//!   expansion, driven by a [`PageFetcher`](crate::fetch::PageFetcher)

pub mod assemble;
pub mod extract;
pub mod redirect;

pub use assemble::EntryAssembler;
pub use extract::SectionExtractor;
