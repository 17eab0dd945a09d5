pub mod health_route;
pub mod metrics_route;
pub mod rag;
pub mod status_route;
