use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::runtime::{ContainerRuntime, ContainerState};
use crate::types::{Backend, LivenessProbe, Retry, Route};

/// An in-memory runtime that counts start/stop calls and can be told to
/// fail them.
#[derive(Default)]
pub struct FakeRuntime {
	containers: Mutex<Vec<ContainerState>>,
	starts: AtomicUsize,
	stops: AtomicUsize,
	fail_starts: AtomicBool,
	fail_stops: AtomicBool,
	fail_lists: AtomicBool,
}

impl FakeRuntime {
	pub fn with_containers(containers: Vec<ContainerState>) -> FakeRuntime {
		FakeRuntime {
			containers: Mutex::new(containers),
			..Default::default()
		}
	}

	pub fn starts(&self) -> usize {
		self.starts.load(Ordering::SeqCst)
	}

	pub fn stops(&self) -> usize {
		self.stops.load(Ordering::SeqCst)
	}

	pub fn fail_starts(&self) {
		self.fail_starts.store(true, Ordering::SeqCst);
	}

	pub fn fail_stops(&self) {
		self.fail_stops.store(true, Ordering::SeqCst);
	}

	pub fn fail_lists(&self) {
		self.fail_lists.store(true, Ordering::SeqCst);
	}

	pub fn set_containers(&self, containers: Vec<ContainerState>) {
		*self.containers.lock().unwrap() = containers;
	}
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
	async fn list_all(&self) -> anyhow::Result<Vec<ContainerState>> {
		if self.fail_lists.load(Ordering::SeqCst) {
			anyhow::bail!("runtime unreachable");
		}
		Ok(self.containers.lock().unwrap().clone())
	}

	async fn start(&self, id: &str) -> anyhow::Result<()> {
		self.starts.fetch_add(1, Ordering::SeqCst);
		if self.fail_starts.load(Ordering::SeqCst) {
			anyhow::bail!("start failed");
		}
		let mut containers = self.containers.lock().unwrap();
		if let Some(c) = containers.iter_mut().find(|c| c.id == id) {
			c.state = "running".to_string();
		}
		Ok(())
	}

	async fn stop(&self, id: &str) -> anyhow::Result<()> {
		self.stops.fetch_add(1, Ordering::SeqCst);
		if self.fail_stops.load(Ordering::SeqCst) {
			anyhow::bail!("stop failed");
		}
		let mut containers = self.containers.lock().unwrap();
		if let Some(c) = containers.iter_mut().find(|c| c.id == id) {
			c.state = "exited".to_string();
		}
		Ok(())
	}
}

pub fn state(id: &str, name: &str, state: &str) -> ContainerState {
	ContainerState {
		id: id.to_string(),
		names: vec![format!("/{name}")],
		state: state.to_string(),
	}
}

/// A route for service `svc-1` whose backend (and probe target) is `addr`.
pub fn route_to(addr: &SocketAddr, attempts: u32, ttl_secs: u64) -> Route {
	Route {
		path: "/svc".to_string(),
		strip_path: true,
		ttl: Duration::from_secs(ttl_secs),
		backend: Backend {
			protocol: "http".to_string(),
			host: addr.ip().to_string(),
			port: addr.port(),
			container_name: "svc-1".to_string(),
		},
		retry: Retry {
			attempts,
			period: Duration::from_secs(1),
		},
		liveness: LivenessProbe {
			path: "healthz".to_string(),
			success_threshold: 1,
			initial_delay: Duration::ZERO,
		},
	}
}
