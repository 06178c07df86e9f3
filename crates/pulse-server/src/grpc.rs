pub mod service;

use crate::ip_filter::{IpFilter, REAL_IP_HEADER};
use std::sync::Arc;
use tonic::{Request, Status};

/// gRPC counterpart of the HTTP trusted-subnet middleware.
pub fn ip_filter_interceptor(
    filter: Arc<IpFilter>,
) -> impl Fn(Request<()>) -> Result<Request<()>, Status> + Clone {
    move |req: Request<()>| {
        let real_ip = req
            .metadata()
            .get(REAL_IP_HEADER)
            .and_then(|v| v.to_str().ok());
        if filter.allows(real_ip) {
            Ok(req)
        } else {
            tracing::warn!(
                real_ip = real_ip.unwrap_or_default(),
                "RPC rejected: client address outside trusted subnet"
            );
            Err(Status::permission_denied("client address is not trusted"))
        }
    }
}
