//! # Alternate-Spelling Redirect Resolver
//!
//! ## Purpose
//! Detects definitions of the shape "`[region] spelling of <target>`" and
//! supports the entry assembler's bounded-depth expansion: target
//! extraction, visited-set filtering, and signature-deduplicated merging of
//! resolved senses.
//!
//! ## Behavior
//! - Detection is case-insensitive with an optional regional qualifier
//!   before or after the target ("US spelling of litre", "spelling of
//!   colour UK").
//! - Targets equal to the original query or already visited are skipped, so
//!   mutual redirects (`a` -> `b` -> `a`) terminate.
//! - Expansion never fails the overall resolution: a fruitless re-fetch
//!   simply leaves the original senses unchanged.

use crate::SenseBlock;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Default expansion depth: targets found in the original senses are
/// resolved once; their own redirects are not followed.
pub const DEFAULT_REDIRECT_DEPTH: usize = 1;

static SPELLING_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:UK|US|U\.S\.|British|American)\s+)?spelling\s+of\s+(.+)$")
        .expect("static regex")
});

/// Trailing qualifier tokens stripped from an extracted target.
const REGION_QUALIFIERS: &[&str] = &["uk", "us", "u.s.", "british", "american", "english"];

/// If the definition is an alternate-spelling redirect, extract its target
/// word. Returns `None` for ordinary definitions or when nothing usable
/// remains after cleanup.
pub fn redirect_target(definition: &str) -> Option<String> {
    let captures = SPELLING_OF.captures(definition)?;
    let raw = captures.get(1)?.as_str();

    // Retain only letters, apostrophes, hyphens and spaces.
    let filtered: String = raw
        .chars()
        .map(|c| {
            if c.is_alphabetic() || c == '\'' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut tokens: Vec<&str> = filtered.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        if REGION_QUALIFIERS.contains(&last.to_lowercase().as_str()) && tokens.len() > 1 {
            tokens.pop();
        } else {
            break;
        }
    }

    let target = tokens.join(" ");
    if target.is_empty() {
        None
    } else {
        Some(target)
    }
}

/// Collect redirect targets from the given senses, excluding anything in
/// the visited set. Returned targets are unique and in document order.
pub fn collect_targets(senses: &[SenseBlock], visited: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for sense in senses {
        for definition in &sense.definitions {
            if let Some(target) = redirect_target(&definition.english) {
                let key = target.to_lowercase();
                if visited.contains(&key) || !seen.insert(key) {
                    continue;
                }
                targets.push(target);
            }
        }
    }
    targets
}

/// Append the meaningful incoming senses whose signature is not already
/// present. Returns the number appended; the new blocks sit at the tail of
/// `existing` so the caller can scan just them for further redirects.
pub fn merge_unique_senses(existing: &mut Vec<SenseBlock>, incoming: Vec<SenseBlock>) -> usize {
    let mut signatures: HashSet<_> = existing.iter().map(SenseBlock::signature).collect();
    let mut appended = 0;
    for sense in incoming {
        if !sense.is_meaningful() {
            continue;
        }
        if signatures.insert(sense.signature()) {
            existing.push(sense);
            appended += 1;
        }
    }
    appended
}
