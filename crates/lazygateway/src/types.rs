use std::time::Duration;

use crate::http::cors::Cors;

/// Host groups the routes and CORS policy served for one Host header.
#[derive(Debug, Clone)]
pub struct Host {
	pub hostname: String,
	pub cors: Option<Cors>,
	pub routes: Vec<Route>,
}

/// Route ties a path prefix to a backend and the lifecycle knobs of its
/// container: how long it may sit idle, and how to decide it is healthy
/// after a cold start.
#[derive(Debug, Clone)]
pub struct Route {
	pub path: String,
	pub strip_path: bool,
	/// Idle time after which the backing container is stopped.
	pub ttl: Duration,
	pub backend: Backend,
	pub retry: Retry,
	pub liveness: LivenessProbe,
}

#[derive(Debug, Clone)]
pub struct Backend {
	pub protocol: String,
	pub host: String,
	pub port: u16,
	/// Empty means pass-through: the route has no container lifecycle.
	pub container_name: String,
}

#[derive(Debug, Clone)]
pub struct Retry {
	pub attempts: u32,
	pub period: Duration,
}

#[derive(Debug, Clone)]
pub struct LivenessProbe {
	pub path: String,
	/// Consecutive 200s required before the backend counts as healthy.
	pub success_threshold: u32,
	pub initial_delay: Duration,
}
