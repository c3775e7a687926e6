//! Candidate deduplication by url.
//!
//! Candidates sharing a url are the same logical item. For each url the
//! candidate with the highest provider quality survives; on equal quality
//! the first-seen candidate is kept. Output order is the first-seen order
//! of each url, which the ranker relies on for its tie-break.

use std::collections::HashMap;

use crate::types::Candidate;

/// Collapse candidates sharing a url into one.
///
/// Candidates with a blank url are dropped.
pub fn deduplicate(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(candidates.len());
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if candidate.url.trim().is_empty() {
            continue;
        }
        match slots.get(&candidate.url) {
            Some(&index) => {
                if candidate.quality > kept[index].quality {
                    kept[index] = candidate;
                }
            }
            None => {
                slots.insert(candidate.url.clone(), kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}
