use async_trait::async_trait;

use crate::errors::ApiError;
use crate::types::{AnalyzeResult, HealthStatus, MetaHit};

/// Trait implemented by each analysis backend (live HTTP service, built-in
/// sample data).
#[async_trait]
pub trait AnalyzeBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Probe the backend's health endpoint.
    async fn health(&self) -> Result<HealthStatus, ApiError>;

    /// Upload a receipt photo and get the per-item price analysis back.
    async fn analyze_receipt(
        &self,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<AnalyzeResult, ApiError>;

    /// Search the reference price catalog by keyword.
    async fn meta_search(&self, keyword: &str) -> Result<Vec<MetaHit>, ApiError>;
}
