//! Conversions between [`Metric`] and the generated RPC messages.

use crate::error::MetricError;
use crate::proto::{AddMetricRequest, CounterMetric, GaugeMetric, MetricType};
use crate::types::{Metric, MetricKind};

impl From<MetricKind> for MetricType {
    fn from(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Gauge => MetricType::Gauge,
            MetricKind::Counter => MetricType::Counter,
        }
    }
}

impl TryFrom<MetricType> for MetricKind {
    type Error = MetricError;

    fn try_from(value: MetricType) -> Result<Self, Self::Error> {
        match value {
            MetricType::Gauge => Ok(MetricKind::Gauge),
            MetricType::Counter => Ok(MetricKind::Counter),
            MetricType::Unspecified => Err(MetricError::UnknownMetricKind(
                value.as_str_name().to_string(),
            )),
        }
    }
}

fn hash_from_wire(hash: String) -> Option<String> {
    (!hash.is_empty()).then_some(hash)
}

impl From<CounterMetric> for Metric {
    fn from(m: CounterMetric) -> Self {
        let mut metric = Metric::counter(m.name, m.value);
        metric.hash = hash_from_wire(m.hash);
        metric
    }
}

impl From<GaugeMetric> for Metric {
    fn from(m: GaugeMetric) -> Self {
        let mut metric = Metric::gauge(m.name, m.value);
        metric.hash = hash_from_wire(m.hash);
        metric
    }
}

pub fn counter_to_wire(m: &Metric) -> CounterMetric {
    CounterMetric {
        name: m.id.clone(),
        value: m.delta.unwrap_or_default(),
        hash: m.hash.clone().unwrap_or_default(),
    }
}

pub fn gauge_to_wire(m: &Metric) -> GaugeMetric {
    GaugeMetric {
        name: m.id.clone(),
        value: m.value.unwrap_or_default(),
        hash: m.hash.clone().unwrap_or_default(),
    }
}

/// Splits a batch into the counter and gauge sub-lists of `AddMetric`.
pub fn to_add_request(metrics: &[Metric]) -> AddMetricRequest {
    let mut req = AddMetricRequest::default();
    for m in metrics {
        match m.kind {
            MetricKind::Counter => req.counters.push(counter_to_wire(m)),
            MetricKind::Gauge => req.gauges.push(gauge_to_wire(m)),
        }
    }
    req
}

pub fn from_add_request(req: AddMetricRequest) -> Vec<Metric> {
    req.counters
        .into_iter()
        .map(Metric::from)
        .chain(req.gauges.into_iter().map(Metric::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_request_splits_by_kind_and_keeps_hashes() {
        let mut gauge = Metric::gauge("temp", 36.6);
        gauge.hash = Some("abcd".into());
        let req = to_add_request(&[gauge.clone(), Metric::counter("hits", 2)]);
        assert_eq!(req.gauges.len(), 1);
        assert_eq!(req.counters.len(), 1);
        assert_eq!(req.counters[0].hash, "");

        let back = from_add_request(req);
        assert!(back.contains(&gauge));
        assert!(back.contains(&Metric::counter("hits", 2)));
    }

    #[test]
    fn unspecified_type_is_unknown_kind() {
        assert!(MetricKind::try_from(MetricType::Unspecified).is_err());
        assert_eq!(MetricKind::try_from(MetricType::Gauge).unwrap(), MetricKind::Gauge);
    }
}
