//! Relevance, quality and freshness scoring.
//!
//! Each deduplicated candidate receives a final score:
//!
//! ```text
//! score = relevance + quality + freshness
//!
//! relevance = 1.2 * term_coverage + 0.8 * title_coverage + 0.8 * phrase_bonus
//! quality   = max(0, provider_quality) + 0.35 (accepted) + 0.2 (answered)
//!           + ln(1 + max(0, popularity)) / ln(101) * 0.8
//!           + min(0.45, tags * 0.05)
//! freshness = exp(-age_days / 540) * 0.45
//! ```
//!
//! Term matching is substring-based on normalized text, so `borrow` also
//! matches `borrowing`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{Candidate, RankedItem};

const TERM_COVERAGE_WEIGHT: f64 = 1.2;
const TITLE_COVERAGE_WEIGHT: f64 = 0.8;
const PHRASE_BONUS: f64 = 0.8;

const ACCEPTED_BONUS: f64 = 0.35;
const ANSWERED_BONUS: f64 = 0.2;
const POPULARITY_WEIGHT: f64 = 0.8;
/// Popularity at which the log-scaled signal reaches its full weight.
const POPULARITY_SATURATION: f64 = 100.0;
const TAG_WEIGHT: f64 = 0.05;
const TAG_CAP: f64 = 0.45;

const FRESHNESS_WEIGHT: f64 = 0.45;
/// Decay constant in days.
const FRESHNESS_DECAY_DAYS: f64 = 540.0;

/// Score and order candidates against `query`, keeping at most `limit`.
///
/// Sorting is stable: candidates with equal scores keep their input order.
pub fn rank(query: &str, candidates: Vec<Candidate>, limit: usize) -> Vec<RankedItem> {
    rank_at(query, candidates, limit, Utc::now())
}

/// [`rank`] with an explicit clock for freshness.
pub fn rank_at(
    query: &str,
    candidates: Vec<Candidate>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<RankedItem> {
    let normalized_query = normalize(query);
    let terms = query_terms(&normalized_query);

    let mut ranked: Vec<RankedItem> = candidates
        .into_iter()
        .map(|candidate| {
            let score = relevance(&normalized_query, &terms, &candidate.title, &candidate.snippet)
                + quality(&candidate)
                + freshness(candidate.published_at, now);
            RankedItem { candidate, score }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

/// Lower-case, replace anything but letters, digits and whitespace with a
/// space, and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Unique tokens of an already normalized query, in first-seen order.
fn query_terms(normalized_query: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    normalized_query
        .split(' ')
        .filter(|term| !term.is_empty() && seen.insert(*term))
        .collect()
}

fn relevance(normalized_query: &str, terms: &[&str], title: &str, snippet: &str) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let title = normalize(title);
    let snippet = normalize(snippet);
    let text = format!("{title} {snippet}");
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    let total = terms.len() as f64;
    let text_matches = terms.iter().filter(|term| text.contains(**term)).count() as f64;
    let title_matches = terms.iter().filter(|term| title.contains(**term)).count() as f64;
    let phrase = if text.contains(normalized_query) {
        PHRASE_BONUS
    } else {
        0.0
    };

    TERM_COVERAGE_WEIGHT * (text_matches / total)
        + TITLE_COVERAGE_WEIGHT * (title_matches / total)
        + phrase
}

fn quality(candidate: &Candidate) -> f64 {
    let provider = candidate.quality.max(0.0);
    let accepted = if candidate.accepted_answer_id.is_some() {
        ACCEPTED_BONUS
    } else {
        0.0
    };
    let answered = if candidate.answered { ANSWERED_BONUS } else { 0.0 };
    let popularity = (candidate.popularity.max(0) as f64).ln_1p() / POPULARITY_SATURATION.ln_1p()
        * POPULARITY_WEIGHT;
    let tags = (candidate.tags.len() as f64 * TAG_WEIGHT).min(TAG_CAP);

    provider + accepted + answered + popularity + tags
}

fn freshness(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(published_at) = published_at else {
        return 0.0;
    };
    let age_days = (now - published_at).num_days().max(0) as f64;
    (-age_days / FRESHNESS_DECAY_DAYS).exp() * FRESHNESS_WEIGHT
}
