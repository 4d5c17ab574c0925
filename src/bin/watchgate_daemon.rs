use std::sync::Arc;

use watchgate::config::Config;
use watchgate::report::{self, LogReportSink};
use watchgate::server::{self, AppState};
use watchgate::{keepalive, ReportSink};

/// Main daemon entry point for the gateway
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting watchgate daemon...");

    let config = Config::from_env();
    let state = AppState::new(config);

    // Background tasks run detached for the process lifetime; shutdown
    // does not wait on them.
    let sink: Arc<dyn ReportSink> = Arc::new(LogReportSink);
    tokio::spawn(report::run_report_cycle(
        state.tracker.clone(),
        sink,
        state.config.report_interval,
    ));

    if let Some(self_url) = state.config.self_url.clone() {
        tokio::spawn(keepalive::run_keepalive(
            self_url,
            state.config.keepalive_interval,
        ));
    } else {
        log::info!("SELF_URL not set, keep-alive pinger disabled");
    }

    server::serve(state).await
}
