use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::runtime::ContainerRuntime;
use crate::store::{ContainerRecord, ContainerStore};

/// StateSync reconciles the container index with the runtime's truth: after
/// a tick without a runtime error, the index holds exactly the ids the
/// runtime reports.
pub struct StateSync {
	containers: Arc<ContainerStore>,
	runtime: Arc<dyn ContainerRuntime>,
	period: Duration,
	tick_lock: AsyncMutex<()>,
}

impl StateSync {
	pub fn new(
		containers: Arc<ContainerStore>,
		runtime: Arc<dyn ContainerRuntime>,
		period: Duration,
	) -> StateSync {
		StateSync {
			containers,
			runtime,
			period,
			tick_lock: AsyncMutex::new(()),
		}
	}

	pub async fn run(self) {
		let mut interval = tokio::time::interval(self.period);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			interval.tick().await;
			if let Err(e) = self.tick().await {
				// A failed tick is skipped entirely; the next one retries.
				warn!("state sync failed: {e}");
			}
		}
	}

	pub async fn tick(&self) -> anyhow::Result<()> {
		let _tick = self.tick_lock.lock().await;
		let listed = self.runtime.list_all().await?;

		let mut current = HashMap::new();
		for state in &listed {
			let Some(name) = state.service_name() else {
				continue;
			};
			current.insert(state.id.clone(), (name.to_string(), state.is_running()));
		}

		let known = self.containers.snapshot();
		for (id, record) in &known {
			if !current.contains_key(id) {
				self.containers.remove(id);
				info!(service = %record.name, %id, "container no longer reported, removed");
			}
		}
		for (id, (name, running)) in current {
			match known.get(&id) {
				Some(record) => {
					// Only the running flag converges here; the stored
					// last_access is the gateway's, not the runtime's.
					if record.is_active != running {
						self.containers.set_active(&id, running);
						info!(service = %record.name, %id, active = running, "container state changed");
					}
				},
				None => {
					info!(service = %name, %id, active = running, "discovered container");
					self
						.containers
						.insert(ContainerRecord::new(id, name, running));
				},
			}
		}
		Ok(())
	}
}
