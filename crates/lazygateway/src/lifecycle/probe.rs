use std::time::Duration;

use tracing::{debug, warn};

use crate::types::Route;

/// Floor for the per-attempt timeout and the inter-attempt pause; a zero
/// retry period must not produce zero-timeout requests or a hot loop.
const MIN_PERIOD: Duration = Duration::from_secs(1);

#[derive(thiserror::Error, Debug)]
#[error("no successful probe after {attempts} attempts")]
pub struct ProbeFailure {
	pub attempts: u32,
}

/// Prober issues HTTP liveness probes against a route's backend.
pub struct Prober {
	client: reqwest::Client,
}

impl Default for Prober {
	fn default() -> Self {
		Self::new()
	}
}

impl Prober {
	pub fn new() -> Prober {
		Prober {
			client: reqwest::Client::new(),
		}
	}

	/// probe GETs the route's liveness path until it answers 200 (the
	/// configured number of consecutive times), bounded by the route's retry
	/// budget. On exhaustion it sleeps the route's TTL as a grace period
	/// before reporting the failure.
	pub async fn probe(&self, route: &Route) -> Result<(), ProbeFailure> {
		let url = probe_url(route);
		let period = route.retry.period.max(MIN_PERIOD);
		let threshold = route.liveness.success_threshold.max(1);

		if !route.liveness.initial_delay.is_zero() {
			debug!(%url, delay = ?route.liveness.initial_delay, "waiting before first probe");
			tokio::time::sleep(route.liveness.initial_delay).await;
		}

		let mut consecutive = 0u32;
		for attempt in 1..=route.retry.attempts {
			match self.client.get(&url).timeout(period).send().await {
				Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
					consecutive += 1;
					if consecutive >= threshold {
						debug!(%url, attempt, "probe succeeded");
						return Ok(());
					}
				},
				Ok(resp) => {
					debug!(%url, attempt, status = resp.status().as_u16(), "probe answered unhealthy");
					consecutive = 0;
				},
				Err(e) => {
					debug!(%url, attempt, "probe request failed: {e}");
					consecutive = 0;
				},
			}
			if attempt < route.retry.attempts {
				tokio::time::sleep(period).await;
			}
		}

		// Grace sleep after the retry budget is exhausted.
		warn!(
			%url,
			attempts = route.retry.attempts,
			grace = ?route.ttl,
			"probe exhausted retries"
		);
		tokio::time::sleep(route.ttl).await;
		Err(ProbeFailure {
			attempts: route.retry.attempts,
		})
	}
}

/// Single-slash join; a configured leading slash on the probe path is
/// tolerated.
fn probe_url(route: &Route) -> String {
	format!(
		"{}://{}:{}/{}",
		route.backend.protocol,
		route.backend.host,
		route.backend.port,
		route.liveness.path.trim_start_matches('/'),
	)
}

#[cfg(test)]
mod tests {
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	use super::super::tests_common::route_to;
	use super::*;

	#[test]
	fn url_join_tolerates_leading_slash() {
		let mut route = route_to(&"127.0.0.1:9001".parse().unwrap(), 1, 0);
		assert_eq!(probe_url(&route), "http://127.0.0.1:9001/healthz");
		route.liveness.path = "/healthz".to_string();
		assert_eq!(probe_url(&route), "http://127.0.0.1:9001/healthz");
	}

	#[tokio::test]
	async fn succeeds_on_first_200() {
		let backend = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/healthz"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&backend)
			.await;

		let route = route_to(backend.address(), 3, 60);
		Prober::new().probe(&route).await.unwrap();
	}

	#[tokio::test]
	async fn recovers_within_the_retry_budget() {
		let backend = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/healthz"))
			.respond_with(ResponseTemplate::new(503))
			.up_to_n_times(1)
			.mount(&backend)
			.await;
		Mock::given(method("GET"))
			.and(path("/healthz"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&backend)
			.await;

		let route = route_to(backend.address(), 3, 0);
		Prober::new().probe(&route).await.unwrap();
	}

	#[tokio::test]
	async fn fails_after_exhausting_attempts() {
		let backend = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500))
			.expect(1)
			.mount(&backend)
			.await;

		// ttl 0 keeps the grace sleep out of the test.
		let route = route_to(backend.address(), 1, 0);
		let err = Prober::new().probe(&route).await.unwrap_err();
		assert_eq!(err.attempts, 1);
	}

	#[tokio::test]
	async fn zero_attempts_fail_without_probing() {
		let backend = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&backend)
			.await;

		let route = route_to(backend.address(), 0, 0);
		assert!(Prober::new().probe(&route).await.is_err());
	}

	#[tokio::test]
	async fn threshold_requires_consecutive_successes() {
		let backend = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/healthz"))
			.respond_with(ResponseTemplate::new(200))
			.expect(2)
			.mount(&backend)
			.await;

		let mut route = route_to(backend.address(), 3, 0);
		route.liveness.success_threshold = 2;
		Prober::new().probe(&route).await.unwrap();
	}

	#[tokio::test]
	async fn initial_delay_runs_before_the_first_attempt() {
		let backend = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/healthz"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&backend)
			.await;

		let mut route = route_to(backend.address(), 1, 0);
		route.liveness.initial_delay = Duration::from_millis(50);
		let start = std::time::Instant::now();
		Prober::new().probe(&route).await.unwrap();
		assert!(start.elapsed() >= Duration::from_millis(50));
	}
}
