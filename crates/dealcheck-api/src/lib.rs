pub mod catalog;
pub mod client;
pub mod fallback;
pub mod mock;

pub use client::HttpBackend;
pub use fallback::{FallbackBackend, MockMode};
pub use mock::MockBackend;
