use crate::config::Connectivity;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded reachability check run before anything else in a cycle. A dead
/// uplink must end the cycle early instead of surfacing downstream as a
/// confusing registry error.
pub trait ConnectivityProbe {
    async fn is_reachable(&self) -> bool;
}

pub struct HttpProbe {
    client: reqwest::Client,
    settings: Connectivity,
}

impl HttpProbe {
    pub fn new(settings: Connectivity) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to build HTTP client for connectivity probe")?;
        Ok(HttpProbe { client, settings })
    }
}

impl ConnectivityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        // A configured budget of 0 must not read as "offline" without a
        // single probe being sent
        let attempts = self.settings.attempts.max(1);
        for attempt in 1..=attempts {
            // Any HTTP response proves the network path, the status code is
            // irrelevant.
            match self.client.head(&self.settings.probe_url).send().await {
                Ok(response) => {
                    debug!(
                        "Connectivity probe to {} answered with status {}",
                        self.settings.probe_url,
                        response.status()
                    );
                    return true;
                }
                Err(e) => warn!(
                    "Connectivity probe attempt {}/{} to {} failed: {}",
                    attempt, attempts, self.settings.probe_url, e
                ),
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    fn probe_settings(url: String) -> Connectivity {
        Connectivity {
            probe_url: url,
            timeout_seconds: 2,
            attempts: 1,
        }
    }

    async fn no_content() -> StatusCode {
        StatusCode::NO_CONTENT
    }

    #[tokio::test]
    async fn test_probe_reachable_endpoint() {
        let app = Router::new().route("/", get(no_content));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let probe = HttpProbe::new(probe_settings(format!("http://{}", addr)))
            .expect("Probe should build");
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_probe_with_zero_attempt_budget_still_probes_once() {
        let app = Router::new().route("/", get(no_content));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut settings = probe_settings(format!("http://{}", addr));
        settings.attempts = 0;
        let probe = HttpProbe::new(settings).expect("Probe should build");
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_probe_unreachable_endpoint() {
        // Port 1 is never bound on loopback, the connection is refused
        // immediately.
        let probe = HttpProbe::new(probe_settings("http://127.0.0.1:1".to_string()))
            .expect("Probe should build");
        assert!(!probe.is_reachable().await);
    }
}
