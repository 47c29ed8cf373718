pub mod backend;
pub mod errors;
pub mod types;

pub use backend::AnalyzeBackend;
pub use errors::ApiError;
pub use types::{AnalyzeResult, HealthStatus, Judgement, MetaHit, PriceComparison, ReceiptItem, Summary};
