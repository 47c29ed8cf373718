use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::warn;

use dealcheck_core::{AnalyzeBackend, AnalyzeResult, ApiError, HealthStatus, MetaHit};

use crate::mock::MockBackend;

/// When to serve the canned sample data instead of a real server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockMode {
    /// Always serve sample data, never touch the network.
    Always,
    /// Never serve sample data, even when the server is unreachable.
    Never,
    /// Serve sample data when no server is configured, and fall back
    /// to it when the configured one cannot be reached.
    Auto,
}

impl MockMode {
    /// Whether to skip the real backend entirely for this base URL.
    pub fn wants_mock(&self, base_url: &str) -> bool {
        match self {
            MockMode::Always => true,
            MockMode::Never => false,
            MockMode::Auto => base_url.is_empty(),
        }
    }
}

impl Default for MockMode {
    fn default() -> Self {
        MockMode::Auto
    }
}

impl fmt::Display for MockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MockMode::Always => "always",
            MockMode::Never => "never",
            MockMode::Auto => "auto",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "always" => Ok(MockMode::Always),
            "false" | "never" => Ok(MockMode::Never),
            "auto" => Ok(MockMode::Auto),
            other => Err(format!("unknown mock mode: {other}")),
        }
    }
}

/// Tries the wrapped backend first and answers from the sample catalog
/// when it is unreachable or the endpoint does not exist. Any other
/// failure propagates untouched.
pub struct FallbackBackend<B: AnalyzeBackend> {
    inner: B,
    mock: MockBackend,
    mode: MockMode,
}

impl<B: AnalyzeBackend> FallbackBackend<B> {
    pub fn new(inner: B, mode: MockMode) -> Self {
        Self {
            inner,
            mock: MockBackend::immediate(),
            mode,
        }
    }

    fn should_fall_back(&self, err: &ApiError) -> bool {
        self.mode != MockMode::Never && err.triggers_fallback()
    }
}

#[async_trait]
impl<B: AnalyzeBackend> AnalyzeBackend for FallbackBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        match self.inner.health().await {
            Err(err) if self.should_fall_back(&err) => {
                warn!(error = %err, kind = err.kind(), "health check failed, serving sample data");
                self.mock.health().await
            }
            other => other,
        }
    }

    async fn analyze_receipt(
        &self,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<AnalyzeResult, ApiError> {
        match self.inner.analyze_receipt(file_name, image.clone()).await {
            Err(err) if self.should_fall_back(&err) => {
                warn!(error = %err, kind = err.kind(), "analysis failed, serving sample data");
                self.mock.analyze_receipt(file_name, image).await
            }
            other => other,
        }
    }

    async fn meta_search(&self, keyword: &str) -> Result<Vec<MetaHit>, ApiError> {
        match self.inner.meta_search(keyword).await {
            Err(err) if self.should_fall_back(&err) => {
                warn!(error = %err, kind = err.kind(), "catalog search failed, serving sample data");
                self.mock.meta_search(keyword).await
            }
            other => other,
        }
    }
}
