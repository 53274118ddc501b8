pub mod error;
pub mod provider;
pub mod retry;
pub mod types;

pub use error::LmError;
pub use provider::LmProvider;
pub use retry::generate_with_retry;
pub use types::{FinishReason, GenerateRequest, GenerateResponse, Message, Role, StreamChunk, TokenUsage, ToolCall, ToolDefinition};
