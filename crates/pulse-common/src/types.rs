use crate::error::MetricError;
use serde::{Deserialize, Serialize};

/// Update semantics of a metric.
///
/// # Examples
///
/// ```
/// use pulse_common::MetricKind;
///
/// let kind: MetricKind = "counter".parse().unwrap();
/// assert_eq!(kind, MetricKind::Counter);
/// assert_eq!(MetricKind::Gauge.to_string(), "gauge");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MetricKind {
    /// Overwrite, last write wins.
    Gauge,
    /// Accumulate, `new = old + delta`.
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            _ => Err(MetricError::UnknownMetricKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for MetricKind {
    type Error = MetricError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One named measurement as it travels over the wire and into snapshots.
///
/// Exactly one of `value` (gauges) and `delta` (counters) is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Metric {
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Gauge,
            delta: None,
            value: Some(value),
            hash: None,
        }
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Counter,
            delta: Some(delta),
            value: None,
            hash: None,
        }
    }

    /// Canonical string covered by the signature.
    ///
    /// A missing value signs as zero so a malformed metric still gets a
    /// deterministic digest and fails verification instead of panicking.
    pub fn canonical(&self) -> String {
        match self.kind {
            MetricKind::Gauge => format!("{}:gauge:{:.6}", self.id, self.value.unwrap_or_default()),
            MetricKind::Counter => format!("{}:counter:{}", self.id, self.delta.unwrap_or_default()),
        }
    }

    /// Parses the legacy path-encoded value (`/update/{type}/{name}/{value}`).
    pub fn parse(kind: MetricKind, id: &str, raw: &str) -> Result<Self, MetricError> {
        let invalid = || MetricError::InvalidValue {
            kind,
            raw: raw.to_string(),
        };
        match kind {
            MetricKind::Gauge => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| Metric::gauge(id, v))
                .ok_or_else(invalid),
            MetricKind::Counter => raw
                .parse::<i64>()
                .map(|d| Metric::counter(id, d))
                .map_err(|_| invalid()),
        }
    }

    /// Plain-text rendering used by `GET /value/{type}/{name}`.
    pub fn format_value(&self) -> String {
        match self.kind {
            MetricKind::Gauge => format!("{:.3}", self.value.unwrap_or_default()),
            MetricKind::Counter => self.delta.unwrap_or_default().to_string(),
        }
    }
}
