use async_trait::async_trait;
use bollard::container::{ListContainersOptions, StartContainerOptions, StopContainerOptions};
use bollard::{API_DEFAULT_VERSION, Docker};
use tracing::debug;

/// The state the runtime reports for one container.
#[derive(Debug, Clone)]
pub struct ContainerState {
	pub id: String,
	/// Runtime-qualified names, each carrying a leading `/`.
	pub names: Vec<String>,
	pub state: String,
}

impl ContainerState {
	pub fn is_running(&self) -> bool {
		self.state == "running"
	}

	/// service_name is the last reported name with the runtime's leading `/`
	/// stripped; the last one wins when a container carries several.
	pub fn service_name(&self) -> Option<&str> {
		self
			.names
			.last()
			.map(|name| name.strip_prefix('/').unwrap_or(name))
	}
}

/// ContainerRuntime is the capability surface the gateway needs from the
/// container runtime: observe everything, start by id, stop by id.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
	/// List all containers, including stopped ones.
	async fn list_all(&self) -> anyhow::Result<Vec<ContainerState>>;
	async fn start(&self, id: &str) -> anyhow::Result<()>;
	async fn stop(&self, id: &str) -> anyhow::Result<()>;
}

/// DockerRuntime talks to the local Docker daemon through its HTTP API.
pub struct DockerRuntime {
	client: Docker,
}

impl DockerRuntime {
	/// connect establishes the daemon connection once, from the environment:
	/// DOCKER_HOST when set, the platform's local socket otherwise.
	pub fn connect() -> anyhow::Result<DockerRuntime> {
		let client = match std::env::var("DOCKER_HOST") {
			Ok(host) if !host.is_empty() => Docker::connect_with_http(&host, 30, API_DEFAULT_VERSION)?,
			_ => Docker::connect_with_local_defaults()?,
		};
		Ok(DockerRuntime { client })
	}
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
	async fn list_all(&self) -> anyhow::Result<Vec<ContainerState>> {
		let options = ListContainersOptions::<String> {
			all: true,
			..Default::default()
		};
		let listed = self.client.list_containers(Some(options)).await?;
		Ok(
			listed
				.into_iter()
				.filter_map(|c| {
					Some(ContainerState {
						id: c.id?,
						names: c.names.unwrap_or_default(),
						state: c.state.unwrap_or_default(),
					})
				})
				.collect(),
		)
	}

	async fn start(&self, id: &str) -> anyhow::Result<()> {
		match self
			.client
			.start_container(id, None::<StartContainerOptions<String>>)
			.await
		{
			Ok(()) => Ok(()),
			// 304: the engine says the container is already running.
			Err(bollard::errors::Error::DockerResponseServerError {
				status_code: 304, ..
			}) => {
				debug!(%id, "start requested for running container");
				Ok(())
			},
			Err(e) => Err(e.into()),
		}
	}

	async fn stop(&self, id: &str) -> anyhow::Result<()> {
		match self
			.client
			.stop_container(id, None::<StopContainerOptions>)
			.await
		{
			Ok(()) => Ok(()),
			// 304: already stopped.
			Err(bollard::errors::Error::DockerResponseServerError {
				status_code: 304, ..
			}) => {
				debug!(%id, "stop requested for stopped container");
				Ok(())
			},
			Err(e) => Err(e.into()),
		}
	}
}
