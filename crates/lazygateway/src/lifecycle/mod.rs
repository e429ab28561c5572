pub mod evict;
pub mod probe;
pub mod sync;

#[cfg(test)]
mod tests_common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::lifecycle::probe::{ProbeFailure, Prober};
use crate::runtime::ContainerRuntime;
use crate::store::ContainerStore;
use crate::types::Route;

/// ServiceLocks hands out one mutex per service name, created on demand and
/// kept for the process lifetime. Locks are keyed by name rather than
/// container id so a service recreated under a new id still serializes with
/// earlier activations. The table lock is held only for lookup-or-create.
#[derive(Default)]
pub struct ServiceLocks {
	inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ServiceLocks {
	pub fn acquire(&self, service: &str) -> Arc<AsyncMutex<()>> {
		let mut locks = self.inner.lock().unwrap();
		locks
			.entry(service.to_string())
			.or_insert_with(|| {
				debug!(%service, "creating service lock");
				Arc::new(AsyncMutex::new(()))
			})
			.clone()
	}
}

#[derive(thiserror::Error, Debug)]
pub enum ActivationError {
	#[error("unknown service {0}")]
	UnknownService(String),
	#[error("failed to start container for {service}: {source}")]
	StartFailed {
		service: String,
		#[source]
		source: anyhow::Error,
	},
	#[error("health check failed for {service}: {source}")]
	Unhealthy {
		service: String,
		#[source]
		source: ProbeFailure,
	},
}

/// Lifecycle turns cold containers into ready upstreams and back again.
/// Start and stop for a given service are totally ordered by its service
/// lock, so an eviction can never race an activation for the same name.
pub struct Lifecycle {
	containers: Arc<ContainerStore>,
	runtime: Arc<dyn ContainerRuntime>,
	locks: ServiceLocks,
	prober: Prober,
}

impl Lifecycle {
	pub fn new(containers: Arc<ContainerStore>, runtime: Arc<dyn ContainerRuntime>) -> Lifecycle {
		Lifecycle {
			containers,
			runtime,
			locks: ServiceLocks::default(),
			prober: Prober::new(),
		}
	}

	/// ensure_ready guarantees the route's container is running and healthy
	/// before returning. Concurrent callers for the same service serialize
	/// on the service lock; the first starts the container, the rest observe
	/// it active after locking and only refresh the access time.
	pub async fn ensure_ready(&self, route: &Route) -> Result<(), ActivationError> {
		let service = &route.backend.container_name;
		if service.is_empty() {
			return Ok(());
		}
		if self.containers.get_by_name(service).is_none() {
			return Err(ActivationError::UnknownService(service.clone()));
		}

		let lock = self.locks.acquire(service);
		let _guard = lock.lock().await;

		// Re-check under the lock: a racing activation may have just finished.
		let Some(record) = self.containers.get_by_name(service) else {
			return Err(ActivationError::UnknownService(service.clone()));
		};
		if record.is_active {
			self.containers.touch(&record.id);
			return Ok(());
		}

		info!(%service, id = %record.id, "starting container");
		self
			.runtime
			.start(&record.id)
			.await
			.map_err(|source| ActivationError::StartFailed {
				service: service.clone(),
				source,
			})?;

		// The lock stays held across the probe so a second caller cannot
		// mistake a start in progress for a ready upstream.
		self
			.prober
			.probe(route)
			.await
			.map_err(|source| ActivationError::Unhealthy {
				service: service.clone(),
				source,
			})?;

		self.containers.set_active(&record.id, true);
		self.containers.touch(&record.id);
		info!(%service, id = %record.id, "container ready");
		Ok(())
	}

	/// stop_container stops a known container and marks it inactive. A stop
	/// failure leaves the record untouched; the state sync loop converges
	/// it within a tick. Unknown ids are a no-op.
	pub async fn stop_container(&self, id: &str) {
		let Some(record) = self.containers.get_by_id(id) else {
			warn!(%id, "stop requested for unknown container");
			return;
		};
		let lock = self.locks.acquire(&record.name);
		let _guard = lock.lock().await;

		info!(service = %record.name, %id, "stopping idle container");
		match self.runtime.stop(id).await {
			Ok(()) => self.containers.set_active(id, false),
			Err(e) => warn!(service = %record.name, %id, "failed to stop container: {e}"),
		}
	}
}
