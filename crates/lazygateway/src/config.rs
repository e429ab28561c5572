use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use std::{env, io};

use anyhow::Context;
use serde::Deserialize;

use crate::Config;
use crate::http::cors::CorsSerde;
use crate::types::{Backend, Host, LivenessProbe, Retry, Route};

const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// load resolves process settings from the environment and parses every host
/// configuration file under the config directory. Any failure here is fatal:
/// the caller exits non-zero.
pub fn load(dir_override: Option<PathBuf>) -> anyhow::Result<Config> {
	let bind_addr = parse::<SocketAddr>("BIND_ADDR")?
		.unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)));
	let sync_period = parse_duration("SYNC_PERIOD")?.unwrap_or(DEFAULT_TICK);
	let evict_period = parse_duration("EVICT_PERIOD")?.unwrap_or(DEFAULT_TICK);

	let dir = match dir_override {
		Some(dir) => dir,
		None => config_dir()?,
	};
	let hosts = load_hosts(&dir)?;

	Ok(Config {
		bind_addr,
		sync_period,
		evict_period,
		hosts,
	})
}

/// Directory precedence: CONFIG_PATH if set, else the directory holding the
/// executable. A binary named `main` reads the literal `configs` directory,
/// which keeps `cargo run` style development working.
fn config_dir() -> anyhow::Result<PathBuf> {
	if let Some(dir) = parse::<PathBuf>("CONFIG_PATH")? {
		return Ok(dir);
	}
	let exe = env::current_exe().context("resolving executable path")?;
	if exe.file_name().is_some_and(|name| name == "main") {
		return Ok(PathBuf::from("configs"));
	}
	Ok(
		exe
			.parent()
			.map(Path::to_path_buf)
			.unwrap_or_else(|| PathBuf::from(".")),
	)
}

fn load_hosts(dir: &Path) -> anyhow::Result<Vec<Host>> {
	let mut files = Vec::new();
	collect_yaml_files(dir, &mut files)
		.with_context(|| format!("listing config files under {}", dir.display()))?;
	if files.is_empty() {
		anyhow::bail!("no .yaml config files found under {}", dir.display());
	}
	files.sort();

	let mut hosts = Vec::new();
	for file in &files {
		let contents = fs_err::read_to_string(file)?;
		hosts.extend(parse_hosts(&contents).with_context(|| format!("parsing {}", file.display()))?);
	}
	if hosts.is_empty() {
		anyhow::bail!("config files contained no host entries");
	}
	Ok(hosts)
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
	for entry in fs_err::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();
		if entry.file_type()?.is_dir() {
			collect_yaml_files(&path, out)?;
		} else if path.extension().is_some_and(|ext| ext == "yaml") {
			out.push(path);
		}
	}
	Ok(())
}

/// parse_hosts parses one file's contents: a YAML sequence of host entries.
pub fn parse_hosts(contents: &str) -> anyhow::Result<Vec<Host>> {
	let raw: Vec<HostSerde> = serde_yaml::from_str(contents)?;
	raw.into_iter().map(Host::try_from).collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct HostSerde {
	host: String,
	#[serde(default)]
	cors: Option<CorsSerde>,
	#[serde(default)]
	routes: Vec<RouteSerde>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RouteSerde {
	path: String,
	#[serde(default)]
	strip_path: bool,
	/// Seconds of idleness before the container is stopped.
	#[serde(default)]
	ttl: u64,
	backend: BackendSerde,
	#[serde(default)]
	retry: RetrySerde,
	#[serde(default)]
	liveness_probe: LivenessProbeSerde,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct BackendSerde {
	protocol: String,
	host: String,
	port: u16,
	container_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct RetrySerde {
	attempts: u32,
	/// Seconds between attempts; also the per-attempt timeout.
	period: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct LivenessProbeSerde {
	path: String,
	success_threshold: u32,
	initial_delay_seconds: u64,
}

impl TryFrom<HostSerde> for Host {
	type Error = anyhow::Error;

	fn try_from(value: HostSerde) -> Result<Self, Self::Error> {
		Ok(Host {
			cors: value
				.cors
				.map(TryInto::try_into)
				.transpose()
				.with_context(|| format!("cors for host {}", value.host))?,
			routes: value.routes.into_iter().map(Route::from).collect(),
			hostname: value.host,
		})
	}
}

impl From<RouteSerde> for Route {
	fn from(value: RouteSerde) -> Self {
		Route {
			path: value.path,
			strip_path: value.strip_path,
			ttl: Duration::from_secs(value.ttl),
			backend: Backend {
				protocol: value.backend.protocol,
				host: value.backend.host,
				port: value.backend.port,
				container_name: value.backend.container_name,
			},
			retry: Retry {
				attempts: value.retry.attempts,
				period: Duration::from_secs(value.retry.period),
			},
			liveness: LivenessProbe {
				path: value.liveness_probe.path,
				success_threshold: value.liveness_probe.success_threshold.max(1),
				initial_delay: Duration::from_secs(value.liveness_probe.initial_delay_seconds),
			},
		}
	}
}

fn parse<T: FromStr>(env: &str) -> anyhow::Result<Option<T>>
where
	<T as FromStr>::Err: ToString,
{
	match env::var(env) {
		Ok(val) => val
			.parse()
			.map(|v| Some(v))
			.map_err(|e: <T as FromStr>::Err| {
				anyhow::anyhow!("invalid env var {}={} ({})", env, val, e.to_string())
			}),
		Err(_) => Ok(None),
	}
}

fn parse_duration(env: &str) -> anyhow::Result<Option<Duration>> {
	parse::<String>(env)?
		.map(|ds| {
			duration_str::parse(&ds).map_err(|e| anyhow::anyhow!("invalid env var {}={} ({})", env, ds, e))
		})
		.transpose()
}
