//! Self keep-alive pinger
//!
//! Hosting platforms that suspend idle processes are kept awake by pinging
//! our own `/health` endpoint on a fixed interval. Runs as a detached task;
//! failures are expected during deploys and only logged at debug level.

use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Keep-alive loop against `{self_url}/health`
pub async fn run_keepalive(self_url: String, period: Duration) {
    let url = format!("{}/health", self_url.trim_end_matches('/'));
    log::info!("Keep-alive pinger started for {} (every {}s)", url, period.as_secs());

    let client = reqwest::Client::builder()
        .timeout(PING_TIMEOUT)
        .build()
        .unwrap_or_default();

    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match client.get(&url).send().await {
            Ok(response) => log::debug!("Keep-alive ping: {}", response.status()),
            Err(e) => log::debug!("Keep-alive ping failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_keepalive_hits_health() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_handler = hits.clone();
        let stub = Router::new().route(
            "/health",
            get(move || {
                let hits = hits_handler.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        let pinger = tokio::spawn(run_keepalive(
            format!("http://{}/", addr),
            Duration::from_millis(30),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        pinger.abort();

        assert!(hits.load(Ordering::SeqCst) >= 1);
    }
}
