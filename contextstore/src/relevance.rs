//! Relevance Scorer (C6a): weighted composite used to choose what to evict.

use std::collections::HashSet;
use std::path::Path;

use crate::item::ContextItem;

/// Weights for the five relevance factors; must not be assumed to sum to 1.0
/// by callers, but the defaults do.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceWeights {
    pub recency: f64,
    pub proximity: f64,
    pub semantic: f64,
    pub frequency: f64,
    pub type_weight: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            recency: 0.25,
            proximity: 0.20,
            semantic: 0.25,
            frequency: 0.15,
            type_weight: 0.15,
        }
    }
}

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being", "to", "of", "in", "on",
    "at", "for", "with", "by", "from", "as", "that", "this", "it", "its", "into", "if", "then", "than",
];

/// Scores [`ContextItem`]s for relevance to the current turn.
pub struct RelevanceScorer {
    weights: RelevanceWeights,
    half_life_hours: f64,
}

impl RelevanceScorer {
    pub fn new(weights: RelevanceWeights, half_life_hours: f64) -> Self {
        Self {
            weights,
            half_life_hours,
        }
    }

    /// Score one item against the current turn's query text and active file path.
    ///
    /// `now` and item timestamps are Unix milliseconds.
    pub fn score(&self, item: &ContextItem, now: i64, query: &str, current_file: Option<&str>) -> f64 {
        let recency = self.recency_factor(item.last_accessed_at, now);
        let proximity = self.proximity_factor(item.source_path.as_deref(), current_file);
        let semantic = self.semantic_factor(item.effective_content(), query);
        let frequency = self.frequency_factor(item.access_count);
        let type_factor = item.priority.type_factor();

        let w = &self.weights;
        let total_weight = w.recency + w.proximity + w.semantic + w.frequency + w.type_weight;
        if total_weight <= 0.0 {
            return 0.0;
        }

        (w.recency * recency
            + w.proximity * proximity
            + w.semantic * semantic
            + w.frequency * frequency
            + w.type_weight * type_factor)
            / total_weight
    }

    fn recency_factor(&self, last_accessed_at: i64, now: i64) -> f64 {
        let age_hours = ((now - last_accessed_at).max(0) as f64) / (1000.0 * 3600.0);
        if self.half_life_hours <= 0.0 {
            return 0.0;
        }
        0.5f64.powf(age_hours / self.half_life_hours)
    }

    fn proximity_factor(&self, source_path: Option<&str>, current_file: Option<&str>) -> f64 {
        let (source, current) = match (source_path, current_file) {
            (Some(s), Some(c)) => (s, c),
            _ => return 0.0,
        };

        if source == current {
            return 1.0;
        }

        let source_dir = Path::new(source).parent();
        let current_dir = Path::new(current).parent();
        if source_dir.is_some() && source_dir == current_dir {
            return 0.9;
        }

        let source_parts: Vec<_> = Path::new(source).components().collect();
        let current_parts: Vec<_> = Path::new(current).components().collect();
        let common = source_parts
            .iter()
            .zip(current_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let max_len = source_parts.len().max(current_parts.len()).max(1);
        (common as f64 / max_len as f64) * 0.8
    }

    fn semantic_factor(&self, content: &str, query: &str) -> f64 {
        let content_words = keywords(content);
        let query_words = keywords(query);
        if query_words.is_empty() || content_words.is_empty() {
            return 0.0;
        }

        let exact_overlap = query_words.intersection(&content_words).count();
        let mut substring_credit = 0.0;
        for qw in query_words.iter().filter(|w| w.len() >= 3) {
            if !content_words.contains(qw) && content_words.iter().any(|cw| cw.contains(qw.as_str())) {
                substring_credit += 0.5;
            }
        }

        ((exact_overlap as f64 + substring_credit) / query_words.len() as f64).min(1.0)
    }

    fn frequency_factor(&self, access_count: u32) -> f64 {
        (((access_count as f64) + 1.0).log10() / 2.0).min(1.0)
    }

    /// Jaccard similarity between the keyword sets of two texts, on demand.
    pub fn jaccard(&self, a: &str, b: &str) -> f64 {
        let set_a = keywords(a);
        let set_b = keywords(b);
        if set_a.is_empty() && set_b.is_empty() {
            return 1.0;
        }
        let intersection = set_a.intersection(&set_b).count() as f64;
        let union = set_a.union(&set_b).count() as f64;
        if union == 0.0 { 0.0 } else { intersection / union }
    }

    /// Cosine similarity between keyword-frequency vectors, on demand.
    pub fn cosine(&self, a: &str, b: &str) -> f64 {
        let vec_a = keyword_counts(a);
        let vec_b = keyword_counts(b);

        let mut dot = 0.0;
        for (word, count_a) in &vec_a {
            if let Some(count_b) = vec_b.get(word) {
                dot += (*count_a as f64) * (*count_b as f64);
            }
        }

        let norm_a: f64 = vec_a.values().map(|c| (*c as f64).powi(2)).sum::<f64>().sqrt();
        let norm_b: f64 = vec_b.values().map(|c| (*c as f64).powi(2)).sum::<f64>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
    }
}

fn keywords(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && w.len() > 2 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn keyword_counts(text: &str) -> std::collections::HashMap<String, u32> {
    let mut counts = std::collections::HashMap::new();
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && w.len() > 2 && !STOP_WORDS.contains(w))
    {
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
    counts
}
