use crate::state::{AppState, IngestError};
use pulse_common::proto::metric_service_server::MetricService;
use pulse_common::proto::{
    AddMetricRequest, AddMetricResponse, GetMetricRequest, GetMetricResponse, ListMetricsRequest,
    ListMetricsResponse, PingRequest, PingResponse,
};
use pulse_common::render::render_html;
use pulse_common::wire::{counter_to_wire, from_add_request, gauge_to_wire};
use pulse_common::MetricKind;
use tonic::{Request, Response, Status};

pub struct MetricServiceImpl {
    state: AppState,
}

impl MetricServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl From<IngestError> for Status {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Storage(e) => Status::internal(e.to_string()),
            other => Status::invalid_argument(other.to_string()),
        }
    }
}

#[tonic::async_trait]
impl MetricService for MetricServiceImpl {
    async fn add_metric(
        &self,
        request: Request<AddMetricRequest>,
    ) -> Result<Response<AddMetricResponse>, Status> {
        let metrics = from_add_request(request.into_inner());
        let accepted = self.state.ingest(&metrics).await.map_err(|e| {
            tracing::warn!(error = %e, "Rejected metric batch");
            Status::from(e)
        })?;

        tracing::debug!(count = accepted, "Metrics ingested");
        Ok(Response::new(AddMetricResponse {
            accepted: accepted as u32,
        }))
    }

    async fn get_metric(
        &self,
        request: Request<GetMetricRequest>,
    ) -> Result<Response<GetMetricResponse>, Status> {
        let req = request.into_inner();
        let kind = MetricKind::try_from(req.r#type())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        let metric = self
            .state
            .repo
            .metric(&req.name, kind)
            .ok_or_else(|| Status::not_found(format!("metric {} not found", req.name)))?;

        let mut resp = GetMetricResponse::default();
        match kind {
            MetricKind::Counter => resp.counter = Some(counter_to_wire(&metric)),
            MetricKind::Gauge => resp.gauge = Some(gauge_to_wire(&metric)),
        }
        Ok(Response::new(resp))
    }

    async fn list_metrics(
        &self,
        _request: Request<ListMetricsRequest>,
    ) -> Result<Response<ListMetricsResponse>, Status> {
        Ok(Response::new(ListMetricsResponse {
            html: render_html(&self.state.repo.to_metrics()),
        }))
    }

    async fn ping(&self, _request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        self.state
            .storage
            .ping()
            .await
            .map_err(|e| Status::internal(e.to_string()))?;
        Ok(Response::new(PingResponse {}))
    }
}
