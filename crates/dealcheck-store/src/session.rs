use dealcheck_core::AnalyzeResult;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::kv::KeyValue;

const SESSION_KEY: &str = "sessionResult";

/// Holds the single in-flight analysis result between commands.
///
/// There is exactly one slot: every save replaces the previous value
/// wholesale. A payload that no longer decodes reads back as absent
/// rather than failing the caller.
pub struct SessionStore<K: KeyValue> {
    kv: K,
}

impl<K: KeyValue> SessionStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    #[instrument(skip(self, result))]
    pub fn save(&self, result: &AnalyzeResult) -> Result<(), StoreError> {
        let json = serde_json::to_string(result)?;
        self.kv.set(SESSION_KEY, &json)
    }

    #[instrument(skip(self))]
    pub fn load(&self) -> Result<Option<AnalyzeResult>, StoreError> {
        let Some(raw) = self.kv.get(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(result) => Ok(Some(result)),
            Err(err) => {
                debug!(error = %err, "stored session did not decode, treating as absent");
                Ok(None)
            }
        }
    }
}
