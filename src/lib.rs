pub mod auth;
pub mod config;
pub mod keepalive;
pub mod models;
pub mod report;
pub mod server;
pub mod tracking;
pub mod upstream;

// Re-export commonly used types
pub use auth::{AuthState, Credentials};
pub use config::Config;
pub use models::{
    ActionKind, AlertKind, AppCatalog, ProxyCommand, ProxyResult, SecurityAlert, SecurityReport,
    SessionData,
};
pub use report::{LogReportSink, ReportSink};
pub use server::AppState;
pub use tracking::SecurityTracker;
pub use upstream::{UpstreamClient, UpstreamError};
