pub mod api;
pub mod app;
pub mod config;
pub mod grpc;
pub mod ip_filter;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod state;
