use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use dealcheck_core::{AnalyzeBackend, AnalyzeResult, ApiError, HealthStatus, MetaHit};

use crate::catalog;

const MOCK_DELAY: Duration = Duration::from_millis(350);

/// Serves the canned catalog instead of calling a server, with a short
/// artificial delay so interactive flows behave like a real request.
pub struct MockBackend {
    delay: Duration,
    call_count: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_delay(MOCK_DELAY)
    }

    /// No artificial delay. Used for tests and for fallback answers,
    /// where the failed real request already took its time.
    pub fn immediate() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    async fn tick(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalyzeBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.tick().await;
        Ok(catalog::health())
    }

    async fn analyze_receipt(
        &self,
        _file_name: &str,
        _image: Vec<u8>,
    ) -> Result<AnalyzeResult, ApiError> {
        self.tick().await;
        Ok(catalog::sample_analysis())
    }

    async fn meta_search(&self, keyword: &str) -> Result<Vec<MetaHit>, ApiError> {
        self.tick().await;
        Ok(catalog::filter_hits(keyword))
    }
}
