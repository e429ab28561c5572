use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub mod app;
pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod proxy;
pub mod runtime;
pub mod signal;
pub mod store;
pub mod telemetry;
pub mod types;

use crate::client::Client;
use crate::lifecycle::Lifecycle;
use crate::store::{ContainerStore, HostStore};
use crate::types::Host;

/// Config is the fully resolved process configuration: where to listen, how
/// often the background loops tick, and the host/route definitions loaded
/// from the config directory.
#[derive(Debug, Clone)]
pub struct Config {
	pub bind_addr: SocketAddr,
	pub sync_period: Duration,
	pub evict_period: Duration,
	pub hosts: Vec<Host>,
}

/// ProxyInputs bundles the state shared by the request path. The background
/// loops hold their own references to the same stores.
pub struct ProxyInputs {
	pub cfg: Arc<Config>,
	pub hosts: Arc<HostStore>,
	pub containers: Arc<ContainerStore>,
	pub lifecycle: Arc<Lifecycle>,
	pub upstream: Client,
}
