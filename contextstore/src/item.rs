//! Core data types for the context window: items, priorities, window state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of content a [`ContextItem`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextItemType {
    SystemPrompt,
    UserMessage,
    AssistantMessage,
    ToolCall,
    ToolResult,
    FileContent,
    CodeSnippet,
    Memory,
    Summary,
}

impl std::fmt::Display for ContextItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SystemPrompt => write!(f, "system_prompt"),
            Self::UserMessage => write!(f, "user_message"),
            Self::AssistantMessage => write!(f, "assistant_message"),
            Self::ToolCall => write!(f, "tool_call"),
            Self::ToolResult => write!(f, "tool_result"),
            Self::FileContent => write!(f, "file_content"),
            Self::CodeSnippet => write!(f, "code_snippet"),
            Self::Memory => write!(f, "memory"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

impl std::str::FromStr for ContextItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system_prompt" => Ok(Self::SystemPrompt),
            "user_message" => Ok(Self::UserMessage),
            "assistant_message" => Ok(Self::AssistantMessage),
            "tool_call" => Ok(Self::ToolCall),
            "tool_result" => Ok(Self::ToolResult),
            "file_content" => Ok(Self::FileContent),
            "code_snippet" => Ok(Self::CodeSnippet),
            "memory" => Ok(Self::Memory),
            "summary" => Ok(Self::Summary),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

/// Eviction priority. Lower numeric value survives longer; `Critical` items
/// are never removed or summarised (spec.md I6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContextPriority {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
    Ephemeral = 5,
}

impl ContextPriority {
    /// Linear map used by the relevance scorer's type factor: priority 1 -> 1.0, priority 5 -> 0.2.
    pub fn type_factor(self) -> f64 {
        let p = self as u8 as f64;
        1.0 - (p - 1.0) * 0.2
    }
}

impl std::str::FromStr for ContextPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "ephemeral" => Ok(Self::Ephemeral),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl std::fmt::Display for ContextPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Ephemeral => write!(f, "ephemeral"),
        }
    }
}

/// A single unit of stored conversation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub id: String,
    pub item_type: ContextItemType,
    pub content: String,
    pub priority: ContextPriority,
    pub token_count: u32,
    pub created_at: i64,
    pub last_accessed_at: i64,
    pub access_count: u32,
    pub source_path: Option<String>,
    pub can_summarize: bool,
    pub can_remove: bool,
    pub summary: Option<String>,
}

impl ContextItem {
    pub fn new(
        id: impl Into<String>,
        item_type: ContextItemType,
        content: impl Into<String>,
        priority: ContextPriority,
        token_count: u32,
        now: i64,
    ) -> Self {
        Self {
            id: id.into(),
            item_type,
            content: content.into(),
            priority,
            token_count,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            source_path: None,
            can_summarize: !matches!(priority, ContextPriority::Critical),
            can_remove: !matches!(priority, ContextPriority::Critical),
            summary: None,
        }
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Content as seen by `get_window`: the summary if one has been applied, else the raw content.
    pub fn effective_content(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.content)
    }

    pub fn record_access(&mut self, now: i64) {
        self.last_accessed_at = now;
        self.access_count += 1;
    }
}

/// Per-type breakdown used in [`ContextWindowState`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub tokens: u32,
    pub count: u32,
}

/// Snapshot of the window's occupancy, recomputed on demand (spec.md §3 ContextWindowState).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextWindowState {
    pub current_tokens: u32,
    pub available_tokens: u32,
    pub usage_percent: f64,
    pub item_count: usize,
    pub is_warning: bool,
    pub is_critical: bool,
    pub by_type: HashMap<String, TypeBreakdown>,
}
