/// Typed errors for calls against the analysis backend.
/// Decode failures inside the local stores are not errors at all (they read
/// as absence); this taxonomy covers only the remote side.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response body: {0}")]
    Decode(String),

    #[error("HTTP {status}{}", detail_suffix(.detail))]
    Http { status: u16, detail: String },
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

impl ApiError {
    /// Build an HTTP error from a non-2xx response, pulling a human-readable
    /// detail out of a JSON body's `detail` or `message` field when present,
    /// else falling back to the status reason phrase.
    pub fn from_status(status: u16, reason: &str, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|data| {
                data.get("detail")
                    .filter(|v| !v.is_null())
                    .or_else(|| data.get("message").filter(|v| !v.is_null()))
                    .map(value_to_text)
            })
            .unwrap_or_else(|| reason.to_string());
        Self::Http { status, detail }
    }

    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::Http { .. } => "http",
        }
    }

    /// Whether this failure should make an auto-mode client serve the
    /// built-in sample data instead: the backend is unreachable or the
    /// endpoint does not exist there.
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Http { status: 404, .. })
    }
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}
