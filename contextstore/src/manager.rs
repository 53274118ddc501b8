//! ContextManager (C6): the token-budgeted conversation store.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::compressor::{self, CompressionResult};
use crate::config::Config;
use crate::error::ContextError;
use crate::item::{ContextItem, ContextItemType, ContextPriority, ContextWindowState, TypeBreakdown};
use crate::persistence::{self, ContextSnapshot, SnapshotStats};
use crate::relevance::{RelevanceScorer, RelevanceWeights};

/// Default token counter: `ceil(text.length / 4)`, per spec.md §4.6.
pub fn default_token_counter(text: &str) -> u32 {
    text.chars().count().div_ceil(4) as u32
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

type TokenCounter = Box<dyn Fn(&str) -> u32 + Send + Sync>;
type Summarizer = Box<dyn Fn(&str) -> String + Send + Sync>;
type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

/// Owns the insertion-ordered item list and the running token total.
pub struct ContextManager {
    items: Vec<ContextItem>,
    config: Config,
    scorer: RelevanceScorer,
    token_counter: TokenCounter,
    summarizer: Option<Summarizer>,
    clock: Clock,
    stats: SnapshotStats,
    next_id: u64,
}

impl ContextManager {
    pub fn new(config: Config) -> Self {
        Self::with_token_counter(config, Box::new(default_token_counter))
    }

    pub fn with_token_counter(config: Config, token_counter: TokenCounter) -> Self {
        let scorer = RelevanceScorer::new(RelevanceWeights::default(), config.recency_half_life_hours);
        Self {
            items: Vec::new(),
            config,
            scorer,
            token_counter,
            summarizer: None,
            clock: Box::new(now_ms),
            stats: SnapshotStats::default(),
            next_id: 0,
        }
    }

    /// Override the summariser used during compression (defaults to a deterministic truncation).
    pub fn set_summarizer(&mut self, summarizer: Summarizer) {
        self.summarizer = Some(summarizer);
    }

    #[cfg(test)]
    fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_tokens(&self) -> u32 {
        self.items.iter().map(|i| i.token_count).sum()
    }

    /// Invariant I5: currentTokens must equal the sum of item token counts at all times.
    fn assert_token_invariant(&self) {
        debug_assert_eq!(
            self.current_tokens(),
            self.items.iter().map(|i| i.token_count).sum::<u32>()
        );
    }

    /// Add an item to the window; triggers auto-compression if the critical
    /// threshold is crossed and `auto_compress` is enabled.
    pub fn add(
        &mut self,
        item_type: ContextItemType,
        content: impl Into<String>,
        priority: ContextPriority,
    ) -> String {
        let content = content.into();
        let token_count = (self.token_counter)(&content);
        self.next_id += 1;
        let id = format!("ctx-{:06}", self.next_id);
        let now = (self.clock)();

        let item = ContextItem::new(id.clone(), item_type, content, priority, token_count, now);
        debug!("add item {id} ({token_count} tokens)");
        self.items.push(item);
        self.stats.total_added += 1;

        let projected = self.current_tokens() + self.config.reserved_for_response;
        if projected >= self.config.critical_token_mark() && self.config.auto_compress {
            info!(
                "auto-compression triggered: projected={projected} mark={}",
                self.config.critical_token_mark()
            );
            self.compress("", None);
        }

        self.assert_token_invariant();
        id
    }

    pub fn add_with_source(
        &mut self,
        item_type: ContextItemType,
        content: impl Into<String>,
        priority: ContextPriority,
        source_path: impl Into<String>,
    ) -> String {
        let id = self.add(item_type, content, priority);
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.source_path = Some(source_path.into());
        }
        id
    }

    /// Bump `lastAccessedAt` and `accessCount` for an item (used by the relevance scorer).
    pub fn update_access(&mut self, id: &str) -> Result<(), ContextError> {
        let now = (self.clock)();
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ContextError::ItemNotFound(id.to_string()))?;
        item.record_access(now);
        Ok(())
    }

    /// Return all items in insertion order, with summaries substituted where present.
    pub fn get_window(&self) -> Vec<(&ContextItem, &str)> {
        self.items.iter().map(|i| (i, i.effective_content())).collect()
    }

    pub fn items(&self) -> &[ContextItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&ContextItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Remove an item explicitly. Critical items can never be removed (spec.md I6).
    pub fn remove(&mut self, id: &str) -> Result<(), ContextError> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| ContextError::ItemNotFound(id.to_string()))?;
        if matches!(self.items[idx].priority, ContextPriority::Critical) {
            return Err(ContextError::CriticalItemProtected(id.to_string()));
        }
        self.items.remove(idx);
        self.stats.total_removed += 1;
        Ok(())
    }

    /// Run a compression pass against the configured target. `query` and
    /// `current_file` feed the relevance scorer so recently-relevant items
    /// are spared ahead of stale ones.
    pub fn compress(&mut self, query: &str, current_file: Option<&str>) -> CompressionResult {
        let now = (self.clock)();
        let target = self.config.target_tokens();
        let min_items = self.config.min_items_to_keep;

        let result = compressor::compress(
            &mut self.items,
            &self.scorer,
            now,
            query,
            current_file,
            target,
            min_items,
            self.token_counter.as_ref(),
            self.summarizer.as_deref(),
        );

        self.stats.total_removed += result.removed_count as u64;
        self.stats.total_summarized += result.summarized_count as u64;
        if result.removed_count > 0 || result.summarized_count > 0 {
            info!(
                "compression pass complete: removed={} summarized={} ratio={:.2}",
                result.removed_count, result.summarized_count, result.compression_ratio
            );
        } else {
            warn!("compression pass made no progress");
        }

        self.assert_token_invariant();
        result
    }

    /// Snapshot the current occupancy (spec.md §3 ContextWindowState).
    pub fn state(&self) -> ContextWindowState {
        let current_tokens = self.current_tokens();
        let available_tokens = self
            .config
            .max_tokens
            .saturating_sub(current_tokens)
            .saturating_sub(self.config.reserved_for_response);
        let usage_percent = if self.config.max_tokens == 0 {
            1.0
        } else {
            current_tokens as f64 / self.config.max_tokens as f64
        };

        let mut by_type: HashMap<String, TypeBreakdown> = HashMap::new();
        for item in &self.items {
            let entry = by_type.entry(item.item_type.to_string()).or_default();
            entry.tokens += item.token_count;
            entry.count += 1;
        }

        ContextWindowState {
            current_tokens,
            available_tokens,
            usage_percent,
            item_count: self.items.len(),
            is_warning: usage_percent >= self.config.warning_threshold,
            is_critical: usage_percent >= self.config.critical_threshold,
            by_type,
        }
    }

    /// Persist a snapshot if `persistence_enabled`; a failure here is
    /// non-fatal per spec.md §7 and is returned so the caller can surface a
    /// warning without aborting the loop.
    pub fn persist(&mut self, path: &PathBuf) -> Result<(), ContextError> {
        self.stats.persisted_at = (self.clock)();
        let snapshot = ContextSnapshot {
            version: 0,
            items: self.items.clone(),
            config: self.config.clone(),
            stats: self.stats.clone(),
        };
        persistence::save(path, snapshot)
    }

    pub fn restore(path: &PathBuf) -> Result<Self, ContextError> {
        let snapshot = persistence::restore(path)?;
        let scorer = RelevanceScorer::new(RelevanceWeights::default(), snapshot.config.recency_half_life_hours);
        Ok(Self {
            next_id: snapshot.items.len() as u64,
            items: snapshot.items,
            config: snapshot.config,
            scorer,
            token_counter: Box::new(default_token_counter),
            summarizer: None,
            clock: Box::new(now_ms),
            stats: snapshot.stats,
        })
    }
}
