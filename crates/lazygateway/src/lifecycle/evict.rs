use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::Lifecycle;
use crate::store::{ContainerStore, HostStore};

/// IdleEvictor walks every configured route and stops containers whose idle
/// time exceeds the route's TTL. Stops go through the same per-service locks
/// as activation, so an eviction and a cold start never interleave.
pub struct IdleEvictor {
	hosts: Arc<HostStore>,
	containers: Arc<ContainerStore>,
	lifecycle: Arc<Lifecycle>,
	period: Duration,
	tick_lock: AsyncMutex<()>,
}

impl IdleEvictor {
	pub fn new(
		hosts: Arc<HostStore>,
		containers: Arc<ContainerStore>,
		lifecycle: Arc<Lifecycle>,
		period: Duration,
	) -> IdleEvictor {
		IdleEvictor {
			hosts,
			containers,
			lifecycle,
			period,
			tick_lock: AsyncMutex::new(()),
		}
	}

	pub async fn run(self) {
		let mut interval = tokio::time::interval(self.period);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			interval.tick().await;
			self.tick().await;
		}
	}

	pub async fn tick(&self) {
		let _tick = self.tick_lock.lock().await;
		let now = Instant::now();
		for host in self.hosts.hosts() {
			for route in self.hosts.routes(host) {
				let service = &route.backend.container_name;
				if service.is_empty() {
					continue;
				}
				let Some(record) = self.containers.get_by_name(service) else {
					continue;
				};
				if !record.is_active {
					continue;
				}
				let idle = now.duration_since(record.last_access);
				if idle > route.ttl {
					debug!(%service, id = %record.id, ?idle, ttl = ?route.ttl, "container idle past ttl");
					self.lifecycle.stop_container(&record.id).await;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::super::tests_common::{FakeRuntime, route_to};
	use super::*;
	use crate::store::ContainerRecord;
	use crate::types::Host;

	fn evictor(ttl_secs: u64, active: bool) -> (Arc<ContainerStore>, Arc<FakeRuntime>, IdleEvictor) {
		let containers = Arc::new(ContainerStore::default());
		containers.insert(ContainerRecord::new(
			"C1".to_string(),
			"svc-1".to_string(),
			active,
		));
		let runtime = Arc::new(FakeRuntime::default());
		let lifecycle = Arc::new(Lifecycle::new(containers.clone(), runtime.clone()));
		let hosts = Arc::new(HostStore::new(vec![Host {
			hostname: "a.test".to_string(),
			cors: None,
			routes: vec![route_to(&"127.0.0.1:9001".parse().unwrap(), 1, ttl_secs)],
		}]));
		let evictor = IdleEvictor::new(hosts, containers.clone(), lifecycle, Duration::from_secs(5));
		(containers, runtime, evictor)
	}

	#[tokio::test]
	async fn expired_container_is_stopped() {
		let (containers, runtime, evictor) = evictor(0, true);
		// Let a little idle time accrue past the zero TTL.
		std::thread::sleep(Duration::from_millis(5));

		evictor.tick().await;
		assert_eq!(runtime.stops(), 1);
		assert!(!containers.get_by_id("C1").unwrap().is_active);
	}

	#[tokio::test]
	async fn fresh_container_survives() {
		let (containers, runtime, evictor) = evictor(3600, true);
		evictor.tick().await;
		assert_eq!(runtime.stops(), 0);
		assert!(containers.get_by_id("C1").unwrap().is_active);
	}

	#[tokio::test]
	async fn inactive_container_is_never_stopped() {
		let (_containers, runtime, evictor) = evictor(0, false);
		std::thread::sleep(Duration::from_millis(5));

		evictor.tick().await;
		assert_eq!(runtime.stops(), 0);
	}

	#[tokio::test]
	async fn touch_defers_eviction() {
		let (containers, runtime, evictor) = evictor(1, true);
		let mut record = containers.get_by_id("C1").unwrap();
		record.last_access = Instant::now() - Duration::from_secs(2);
		containers.update(record);

		// A request refreshing the access time rescues the container.
		containers.touch("C1");
		evictor.tick().await;
		assert_eq!(runtime.stops(), 0);
	}

	#[tokio::test]
	async fn passthrough_routes_are_skipped() {
		let containers = Arc::new(ContainerStore::default());
		let runtime = Arc::new(FakeRuntime::default());
		let lifecycle = Arc::new(Lifecycle::new(containers.clone(), runtime.clone()));
		let mut route = route_to(&"127.0.0.1:9001".parse().unwrap(), 1, 0);
		route.backend.container_name = String::new();
		let hosts = Arc::new(HostStore::new(vec![Host {
			hostname: "a.test".to_string(),
			cors: None,
			routes: vec![route],
		}]));
		let evictor = IdleEvictor::new(hosts, containers, lifecycle, Duration::from_secs(5));

		evictor.tick().await;
		assert_eq!(runtime.stops(), 0);
	}
}
