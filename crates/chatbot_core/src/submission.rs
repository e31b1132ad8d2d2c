use std::fmt;

/// Opaque backend-issued key correlating status queries with one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressHandle(String);

impl ProgressHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgressHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Ok,
    RateLimited,
    Error,
    TransportFailure,
}

/// A remaining-quota value as reported by the server. Authenticated users get
/// numbers, some deployments send preformatted strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaValue {
    Count(i64),
    Text(String),
}

impl fmt::Display for QuotaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaValue::Count(n) => write!(f, "{n}"),
            QuotaValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuotaLimits {
    pub minute_left: Option<QuotaValue>,
    pub day_left: Option<QuotaValue>,
}

/// Outcome of one submit call. `message` is always populated: the server text
/// when it sent one, otherwise the localized default for `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    pub message: String,
    pub progress_key: Option<ProgressHandle>,
    pub limits: Option<QuotaLimits>,
}

impl SubmissionResult {
    pub fn transport_failure() -> Self {
        Self {
            status: SubmissionStatus::TransportFailure,
            message: crate::texts::TRANSPORT_FAILURE.to_string(),
            progress_key: None,
            limits: None,
        }
    }

    /// Whether the server produced a payload for this result.
    pub fn has_payload(&self) -> bool {
        self.status != SubmissionStatus::TransportFailure
    }
}
