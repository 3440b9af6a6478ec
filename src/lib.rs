//! Request admission gateway for a resource CRUD API.

pub mod admission;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod store;

pub use admission::AdmissionPipeline;
pub use config::schema::GateConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
