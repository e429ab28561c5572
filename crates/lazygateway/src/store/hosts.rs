use std::collections::HashMap;
use std::sync::Arc;

use crate::http::cors::Cors;
use crate::types::{Host, Route};

/// HostStore resolves inbound requests to their route and CORS policy.
/// Within a host, routes are keyed by the first path segment of their
/// configured path; there is no longest-prefix matching.
#[derive(Debug, Default)]
pub struct HostStore {
	by_host: HashMap<String, HostData>,
}

#[derive(Debug, Default)]
struct HostData {
	cors: Option<Cors>,
	routes: HashMap<String, Arc<Route>>,
}

impl HostStore {
	pub fn new(hosts: Vec<Host>) -> HostStore {
		let mut by_host = HashMap::new();
		for host in hosts {
			let mut routes = HashMap::new();
			for route in host.routes {
				routes.insert(first_segment(&route.path), Arc::new(route));
			}
			by_host.insert(
				host.hostname,
				HostData {
					cors: host.cors,
					routes,
				},
			);
		}
		HostStore { by_host }
	}

	pub fn route(&self, host: &str, path: &str) -> Option<Arc<Route>> {
		self
			.by_host
			.get(host)?
			.routes
			.get(&first_segment(path))
			.cloned()
	}

	pub fn cors(&self, host: &str) -> Option<&Cors> {
		self.by_host.get(host)?.cors.as_ref()
	}

	pub fn routes(&self, host: &str) -> Vec<Arc<Route>> {
		self
			.by_host
			.get(host)
			.map(|data| data.routes.values().cloned().collect())
			.unwrap_or_default()
	}

	pub fn hosts(&self) -> impl Iterator<Item = &str> {
		self.by_host.keys().map(String::as_str)
	}
}

/// The route key: `/foo` from `/foo/bar/baz`; the empty string when the path
/// has no segment.
fn first_segment(path: &str) -> String {
	let mut parts = path.split('/');
	parts.next();
	match parts.next() {
		Some(segment) if !segment.is_empty() => format!("/{segment}"),
		_ => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::types::{Backend, LivenessProbe, Retry};

	fn route(path: &str, container: &str) -> Route {
		Route {
			path: path.to_string(),
			strip_path: false,
			ttl: Duration::from_secs(60),
			backend: Backend {
				protocol: "http".to_string(),
				host: "127.0.0.1".to_string(),
				port: 9001,
				container_name: container.to_string(),
			},
			retry: Retry {
				attempts: 1,
				period: Duration::from_secs(1),
			},
			liveness: LivenessProbe {
				path: "healthz".to_string(),
				success_threshold: 1,
				initial_delay: Duration::ZERO,
			},
		}
	}

	fn store() -> HostStore {
		HostStore::new(vec![Host {
			hostname: "a.test".to_string(),
			cors: None,
			routes: vec![route("/svc", "svc-1"), route("/other", "other-1")],
		}])
	}

	#[test]
	fn first_segment_keys() {
		let cases = [
			("/foo/bar/baz", "/foo"),
			("/foo", "/foo"),
			("/foo/", "/foo"),
			("/", ""),
			("", ""),
		];
		for (path, want) in cases {
			assert_eq!(first_segment(path), want, "path {path:?}");
		}
	}

	#[test]
	fn resolves_by_first_segment() {
		let store = store();
		let found = store.route("a.test", "/svc/hello/deep").unwrap();
		assert_eq!(found.backend.container_name, "svc-1");
	}

	#[test]
	fn match_is_exact_on_segment() {
		let store = store();
		// `/svcx` shares a prefix with `/svc` but is a different segment.
		assert!(store.route("a.test", "/svcx/hello").is_none());
	}

	#[test]
	fn unknown_host_has_no_routes() {
		let store = store();
		assert!(store.route("b.test", "/svc").is_none());
		assert!(store.cors("b.test").is_none());
		assert!(store.routes("b.test").is_empty());
	}

	#[test]
	fn enumerates_hosts_and_routes() {
		let store = store();
		assert_eq!(store.hosts().collect::<Vec<_>>(), vec!["a.test"]);
		assert_eq!(store.routes("a.test").len(), 2);
	}
}
