//! Compressor (C6b): two-phase eviction — summarise, then remove.

use crate::item::{ContextItem, ContextItemType, ContextPriority};
use crate::relevance::RelevanceScorer;

/// Result of a compression pass (spec.md §4.6).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CompressionResult {
    pub removed_count: usize,
    pub summarized_count: usize,
    pub tokens_saved: u32,
    pub new_token_count: u32,
    pub compression_ratio: f64,
}

/// A relevance score below which a summarisable item becomes a summarisation candidate.
const SUMMARIZE_RELEVANCE_THRESHOLD: f64 = 0.5;

/// Deterministic fallback summary: a header plus a truncated body, used when the
/// caller supplies no summariser function.
fn default_summary(content: &str, max_chars: usize) -> String {
    let truncated: String = content.chars().take(max_chars).collect();
    format!("[summary, {} chars elided] {}", content.chars().count().saturating_sub(max_chars), truncated)
}

/// Runs the two-phase compression algorithm described in spec.md §4.6.
///
/// `token_counter` recomputes token counts after summarisation; `summarizer`,
/// if provided, replaces the deterministic header+truncate fallback.
pub fn compress(
    items: &mut Vec<ContextItem>,
    scorer: &RelevanceScorer,
    now: i64,
    query: &str,
    current_file: Option<&str>,
    target_tokens: u32,
    min_items_to_keep: usize,
    token_counter: &dyn Fn(&str) -> u32,
    summarizer: Option<&dyn Fn(&str) -> String>,
) -> CompressionResult {
    let starting_tokens: u32 = items.iter().map(|i| i.token_count).sum();
    let mut result = CompressionResult::default();

    // Phase 1: summarise.
    if current_tokens(items) > target_tokens {
        let mut candidates: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, i)| {
                i.can_summarize
                    && i.summary.is_none()
                    && matches!(
                        i.priority,
                        ContextPriority::Medium | ContextPriority::Low | ContextPriority::Ephemeral
                    )
            })
            .map(|(idx, _)| idx)
            .collect();

        candidates.sort_by(|&a, &b| {
            let score_a = scorer.score(&items[a], now, query, current_file);
            let score_b = scorer.score(&items[b], now, query, current_file);
            score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
        });

        for idx in candidates {
            if current_tokens(items) <= target_tokens {
                break;
            }
            let score = scorer.score(&items[idx], now, query, current_file);
            if score >= SUMMARIZE_RELEVANCE_THRESHOLD {
                continue;
            }

            let item = &mut items[idx];
            let before = item.token_count;
            let summary = match summarizer {
                Some(f) => f(&item.content),
                None => default_summary(&item.content, 200),
            };
            item.summary = Some(summary.clone());
            item.token_count = token_counter(&summary);
            item.item_type = ContextItemType::Summary;

            result.summarized_count += 1;
            result.tokens_saved += before.saturating_sub(item.token_count);
        }
    }

    // Phase 2: remove, ascending relevance, never below the floor, never Critical.
    if current_tokens(items) > target_tokens {
        let mut scored: Vec<(usize, f64)> = items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.can_remove && !matches!(i.priority, ContextPriority::Critical))
            .map(|(idx, i)| (idx, scorer.score(i, now, query, current_file)))
            .collect();

        scored.sort_by(|(ia, sa), (ib, sb)| {
            sa.partial_cmp(sb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| items[*ia].last_accessed_at.cmp(&items[*ib].last_accessed_at))
                .then_with(|| items[*ia].created_at.cmp(&items[*ib].created_at))
                .then_with(|| items[*ia].id.cmp(&items[*ib].id))
        });

        let mut to_remove: Vec<usize> = Vec::new();
        for (idx, _) in scored {
            if items.len() - to_remove.len() <= min_items_to_keep {
                break;
            }
            if current_tokens_excluding(items, &to_remove) <= target_tokens {
                break;
            }
            to_remove.push(idx);
        }

        to_remove.sort_unstable_by(|a, b| b.cmp(a));
        for idx in to_remove {
            let removed = items.remove(idx);
            result.tokens_saved += removed.token_count;
            result.removed_count += 1;
        }
    }

    result.new_token_count = current_tokens(items);
    result.compression_ratio = if starting_tokens == 0 {
        1.0
    } else {
        result.new_token_count as f64 / starting_tokens as f64
    };

    result
}

fn current_tokens(items: &[ContextItem]) -> u32 {
    items.iter().map(|i| i.token_count).sum()
}

fn current_tokens_excluding(items: &[ContextItem], excluded: &[usize]) -> u32 {
    items
        .iter()
        .enumerate()
        .filter(|(idx, _)| !excluded.contains(idx))
        .map(|(_, i)| i.token_count)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ContextItemType;
    use crate::relevance::RelevanceWeights;

    fn token_counter(s: &str) -> u32 {
        s.len().div_ceil(4) as u32
    }

    fn low_item(id: &str, tokens: u32, now: i64) -> ContextItem {
        let mut item = ContextItem::new(
            id,
            ContextItemType::Memory,
            "x".repeat((tokens * 4) as usize),
            ContextPriority::Low,
            tokens,
            now,
        );
        item.last_accessed_at = now - 10 * 3600 * 1000; // stale, low relevance
        item
    }

    #[test]
    fn no_op_when_already_under_target() {
        let scorer = RelevanceScorer::new(RelevanceWeights::default(), 2.0);
        let mut items = vec![low_item("a", 10, 0)];
        let result = compress(&mut items, &scorer, 0, "", None, 1000, 1, &token_counter, None);
        assert_eq!(result.removed_count, 0);
        assert_eq!(result.summarized_count, 0);
        assert_eq!(result.compression_ratio, 1.0);
    }

    #[test]
    fn critical_items_survive_compression() {
        let scorer = RelevanceScorer::new(RelevanceWeights::default(), 2.0);
        let mut items = vec![
            ContextItem::new("crit", ContextItemType::SystemPrompt, "keep me", ContextPriority::Critical, 500, 0),
            low_item("a", 500, 0),
            low_item("b", 500, 0),
            low_item("c", 500, 0),
        ];
        let _ = compress(&mut items, &scorer, 0, "", None, 100, 1, &token_counter, None);
        assert!(items.iter().any(|i| i.id == "crit"));
    }

    #[test]
    fn min_items_to_keep_is_respected() {
        let scorer = RelevanceScorer::new(RelevanceWeights::default(), 2.0);
        let mut items = vec![low_item("a", 500, 0), low_item("b", 500, 0), low_item("c", 500, 0)];
        let _ = compress(&mut items, &scorer, 0, "", None, 0, 2, &token_counter, None);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn summarization_reduces_token_count() {
        let scorer = RelevanceScorer::new(RelevanceWeights::default(), 2.0);
        let mut items = vec![low_item("a", 1000, 0)];
        let before = items[0].token_count;
        let result = compress(&mut items, &scorer, 0, "", None, 10, 1, &token_counter, None);
        assert!(result.summarized_count >= 1 || result.removed_count >= 1);
        assert!(items[0].token_count <= before || items.is_empty());
    }
}
