use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use tracing::debug;

use super::ProxyError;
use crate::ProxyInputs;
use crate::http::{
	Body, HeaderMap, HeaderValue, Method, Request, Response, StatusCode, X_FORWARDED_FOR, get_host,
	merge_in_headers, modify_req_uri,
};

/// HTTPProxy handles one request end to end: route resolution, CORS,
/// container activation, and the upstream call.
#[derive(Clone)]
pub struct HTTPProxy {
	inputs: Arc<ProxyInputs>,
	peer: SocketAddr,
}

impl HTTPProxy {
	pub fn new(inputs: Arc<ProxyInputs>, peer: SocketAddr) -> HTTPProxy {
		HTTPProxy { inputs, peer }
	}

	pub async fn proxy(&self, req: ::http::Request<Incoming>) -> Response {
		let req = req.map(Body::new);
		match self.handle(req).await {
			Ok(resp) => resp,
			Err(e) => {
				debug!(peer = %self.peer, "request failed: {e}");
				e.into_response()
			},
		}
	}

	async fn handle(&self, mut req: Request) -> Result<Response, ProxyError> {
		let host = get_host(&req)?.to_string();
		let route = self
			.inputs
			.hosts
			.route(&host, req.uri().path())
			.ok_or(ProxyError::RouteNotFound)?;

		let cors_headers = match self.inputs.hosts.cors(&host) {
			Some(cors) => {
				let resolution = cors.resolve(&req);
				if !resolution.allowed {
					return Ok(direct_response(
						StatusCode::UNAUTHORIZED,
						resolution.headers,
					));
				}
				Some(resolution.headers)
			},
			None => None,
		};

		if route.backend.protocol.is_empty() {
			return Err(ProxyError::RouteUnroutable);
		}
		// Preflight requests are answered here, never forwarded.
		if req.method() == Method::OPTIONS {
			return Ok(direct_response(
				StatusCode::OK,
				cors_headers.unwrap_or_default(),
			));
		}

		if !route.backend.container_name.is_empty() {
			let record = self
				.inputs
				.containers
				.get_by_name(&route.backend.container_name)
				.ok_or_else(|| ProxyError::ServiceNotFound(route.backend.container_name.clone()))?;
			if !record.is_active {
				self.inputs.lifecycle.ensure_ready(&route).await?;
			}
			self.inputs.containers.touch(&record.id);
		}

		self.append_forwarded_for(&mut req);

		let authority = format!("{}:{}", route.backend.host, route.backend.port);
		let scheme = route.backend.protocol.clone();
		let strip = route.strip_path.then(|| route.path.clone());
		modify_req_uri(&mut req, |parts| {
			parts.scheme = Some(scheme.as_str().try_into()?);
			parts.authority = Some(authority.parse()?);
			let (path, query) = match &parts.path_and_query {
				Some(pq) => (pq.path(), pq.query()),
				None => ("/", None),
			};
			let mut path = match &strip {
				Some(prefix) => strip_route_path(path, prefix),
				None => path.to_string(),
			};
			if path.is_empty() {
				path.push('/');
			}
			if let Some(query) = query {
				path.push('?');
				path.push_str(query);
			}
			parts.path_and_query = Some(path.parse()?);
			Ok(())
		})?;

		let mut resp = self.inputs.upstream.call(req).await?;
		merge_in_headers(cors_headers, resp.headers_mut());
		Ok(resp)
	}

	/// Records the downstream address the way a single-host reverse proxy
	/// does, appending to any forwarded chain already present.
	fn append_forwarded_for(&self, req: &mut Request) {
		let client_ip = self.peer.ip().to_string();
		let value = match req.headers().get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
			Some(prior) => format!("{prior}, {client_ip}"),
			None => client_ip,
		};
		if let Ok(value) = HeaderValue::from_str(&value) {
			req.headers_mut().insert(X_FORWARDED_FOR, value);
		}
	}
}

/// Removes the route's configured path prefix from the request path. Applying
/// it twice is the same as applying it once: after the first strip the prefix
/// is gone.
pub fn strip_route_path(path: &str, route_path: &str) -> String {
	path.strip_prefix(route_path).unwrap_or(path).to_string()
}

fn direct_response(status: StatusCode, headers: HeaderMap) -> Response {
	let mut resp = ::http::Response::builder()
		.status(status)
		.body(Body::empty())
		.expect("builder with known status code should not fail");
	*resp.headers_mut() = headers;
	resp
}
