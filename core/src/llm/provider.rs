//! LM Provider Adapter capability (consumed, spec §6).

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::error::LmError;
use super::types::{GenerateRequest, GenerateResponse, StreamChunk};

#[async_trait]
pub trait LmProvider: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LmError>;

    async fn stream(&self, request: GenerateRequest) -> Result<BoxStream<'static, Result<StreamChunk, LmError>>, LmError>;
}
