use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::client::Client;
use crate::lifecycle::Lifecycle;
use crate::lifecycle::evict::IdleEvictor;
use crate::lifecycle::sync::StateSync;
use crate::proxy::Gateway;
use crate::runtime::{ContainerRuntime, DockerRuntime};
use crate::store::{ContainerStore, HostStore};
use crate::{Config, ProxyInputs, signal};

/// run wires the gateway up against the local Docker daemon.
pub async fn run(config: Arc<Config>) -> anyhow::Result<Bound> {
	let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect()?);
	run_with_runtime(config, runtime).await
}

/// run_with_runtime builds every component explicitly, spawns the state sync
/// and eviction loops, and binds the listener. Tests substitute the runtime.
pub async fn run_with_runtime(
	config: Arc<Config>,
	runtime: Arc<dyn ContainerRuntime>,
) -> anyhow::Result<Bound> {
	let hosts = Arc::new(HostStore::new(config.hosts.clone()));
	let containers = Arc::new(ContainerStore::default());
	let lifecycle = Arc::new(Lifecycle::new(containers.clone(), runtime.clone()));

	tokio::spawn(StateSync::new(containers.clone(), runtime.clone(), config.sync_period).run());
	tokio::spawn(
		IdleEvictor::new(
			hosts.clone(),
			containers.clone(),
			lifecycle.clone(),
			config.evict_period,
		)
		.run(),
	);

	let pi = Arc::new(ProxyInputs {
		cfg: config,
		hosts,
		containers,
		lifecycle,
		upstream: Client::new()?,
	});
	let gateway = Gateway::bind(pi).await?;
	let address = gateway.address();
	tokio::spawn(gateway.run());
	info!(%address, "gateway started");

	Ok(Bound { address })
}

/// Bound is a running gateway.
pub struct Bound {
	address: SocketAddr,
}

impl Bound {
	pub fn address(&self) -> SocketAddr {
		self.address
	}

	/// wait_termination blocks until SIGINT or SIGTERM. All state is
	/// in-memory; exit discards it.
	pub async fn wait_termination(self) -> anyhow::Result<()> {
		signal::shutdown().await;
		Ok(())
	}
}
