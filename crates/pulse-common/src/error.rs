use crate::types::MetricKind;

/// Errors raised while interpreting or applying a metric.
///
/// # Examples
///
/// ```rust
/// use pulse_common::error::MetricError;
///
/// let err: MetricError = "histogram".parse::<pulse_common::MetricKind>().unwrap_err();
/// assert!(matches!(err, MetricError::UnknownMetricKind(_)));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error("unknown metric kind: {0}")]
    UnknownMetricKind(String),

    /// A gauge without `value` or a counter without `delta`.
    #[error("metric {id} ({kind}) carries no value")]
    MissingValue { id: String, kind: MetricKind },

    #[error("invalid {kind} value: {raw}")]
    InvalidValue { kind: MetricKind, raw: String },
}

/// Errors raised by payload encryption and key loading.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("rsa: {0}")]
    Rsa(#[from] rsa::Error),
}
