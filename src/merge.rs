//! # Record Merge Engine
//!
//! ## Purpose
//! Reconciles a base corpus (previously saved records) with newly produced
//! records: matches by canonical key, unions sentence examples by their
//! normalized context text, and unions or patches sense blocks. Operates
//! purely on the structured record model with no markup dependency.
//!
//! ## Input/Output Specification
//! - **Input**: Base records (the loaded corpus) and incoming records (this
//!   run's resolutions)
//! - **Output**: A new merged sequence; neither input is mutated
//!
//! ## Key Properties
//! - Total: well-typed input never fails, missing fields are just empty
//! - Idempotent: `merge(merge(a, b), b) == merge(a, b)`
//! - Two incoming records sharing a key collapse into one, because each
//!   appended record's key is indexed for the rest of the batch

use crate::utils::normalize_context;
use crate::{SenseSignature, VocabularyRecord};
use std::collections::{HashMap, HashSet};

/// Merge `incoming` records into `base`, returning a new corpus.
///
/// Records match when their [`merge_key`](VocabularyRecord::merge_key)s are
/// equal; a keyless record is appended standalone and never matched.
pub fn merge(base: &[VocabularyRecord], incoming: &[VocabularyRecord]) -> Vec<VocabularyRecord> {
    let mut merged: Vec<VocabularyRecord> = base.to_vec();

    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, record) in merged.iter().enumerate() {
        if let Some(key) = record.merge_key() {
            index.entry(key).or_insert(i);
        }
    }

    for record in incoming {
        match record.merge_key() {
            Some(key) => {
                if let Some(&i) = index.get(&key) {
                    merge_into(&mut merged[i], record);
                } else {
                    merged.push(record.clone());
                    index.insert(key, merged.len() - 1);
                }
            }
            None => merged.push(record.clone()),
        }
    }

    merged
}

/// Fold one incoming record into an existing one with the same key.
fn merge_into(existing: &mut VocabularyRecord, incoming: &VocabularyRecord) {
    merge_examples(existing, incoming);
    merge_senses(existing, incoming);

    if existing.entry.source_url.is_empty() && !incoming.entry.source_url.is_empty() {
        existing.entry.source_url = incoming.entry.source_url.clone();
    }
}

/// Union examples by normalized context text. An incoming example whose
/// context is already present is dropped silently.
fn merge_examples(existing: &mut VocabularyRecord, incoming: &VocabularyRecord) {
    let mut seen: HashSet<String> = existing
        .examples
        .iter()
        .map(|e| normalize_context(&e.context))
        .collect();

    for example in &incoming.examples {
        if seen.insert(normalize_context(&example.context)) {
            existing.examples.push(example.clone());
        }
    }
}

/// Union or patch sense blocks.
///
/// - An existing record with no senses takes the incoming senses wholesale.
/// - An incoming block whose signature is already present is skipped; this
///   check runs before slot healing so re-merging the same batch cannot fill
///   a second slot with the same sense.
/// - Otherwise the block replaces the first unresolved slot (empty canonical
///   form) when one exists, healing the entry in place, and is appended as an
///   additional sense when none does.
fn merge_senses(existing: &mut VocabularyRecord, incoming: &VocabularyRecord) {
    if existing.entry.senses.is_empty() {
        existing.entry.senses = incoming.entry.senses.clone();
        return;
    }

    let mut signatures: HashSet<SenseSignature> = existing
        .entry
        .senses
        .iter()
        .map(|s| s.signature())
        .collect();

    for sense in &incoming.entry.senses {
        if sense.canonical_form.trim().is_empty() {
            continue;
        }
        let signature = sense.signature();
        if signatures.contains(&signature) {
            continue;
        }

        let empty_slot = existing
            .entry
            .senses
            .iter()
            .position(|s| s.canonical_form.trim().is_empty());
        match empty_slot {
            Some(slot) => existing.entry.senses[slot] = sense.clone(),
            None => existing.entry.senses.push(sense.clone()),
        }
        signatures.insert(signature);
    }
}
