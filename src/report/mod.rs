//! Periodic security reporting
//!
//! On a fixed interval the tracker's window is closed: all records and
//! buffered alerts are drained into a [`SecurityReport`] and handed to the
//! configured sink. Delivery transport (mail, webhook) lives behind the
//! [`ReportSink`] trait; the default sink writes the report to the log.

use std::sync::Arc;
use std::time::Duration;

use crate::models::SecurityReport;
use crate::tracking::SecurityTracker;

/// Destination for closed-window security reports.
///
/// Implementations must not fail the caller; delivery errors are their own
/// to log and swallow.
pub trait ReportSink: Send + Sync {
    fn emit(&self, report: &SecurityReport);
}

/// Sink that serializes the report as JSON into the process log
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn emit(&self, report: &SecurityReport) {
        match serde_json::to_string(report) {
            Ok(json) => log::info!("Security report: {}", json),
            Err(e) => log::warn!("Failed to serialize security report: {}", e),
        }
    }
}

/// Report/reset loop, spawned as a detached task for the process lifetime.
///
/// The first tick of a tokio interval fires immediately and is skipped so an
/// empty report is not emitted at startup.
pub async fn run_report_cycle(
    tracker: Arc<SecurityTracker>,
    sink: Arc<dyn ReportSink>,
    period: Duration,
) {
    log::info!("Report cycle started (every {}s)", period.as_secs());

    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let report = tracker.reset();
        log::info!(
            "Closing report window: {} users, {} alerts",
            report.users_seen,
            report.alerts.len()
        );
        sink.emit(&report);
    }
}
