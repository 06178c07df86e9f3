pub mod crypto;
pub mod error;
pub mod render;
pub mod repository;
pub mod shutdown;
pub mod sign;
pub mod types;
pub mod wire;

pub use error::MetricError;
pub use repository::Repository;
pub use sign::Signer;
pub use types::{Metric, MetricKind};

pub mod proto {
    #![allow(clippy::pedantic)]
    #![allow(clippy::missing_errors_doc)]
    #![allow(clippy::doc_markdown)]
    #![allow(clippy::default_trait_access)]
    tonic::include_proto!("pulse");
}
