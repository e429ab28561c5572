use std::time::Instant;

use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::http::{Body, Request, Response};
use crate::proxy::ProxyError;

/// Client is the shared upstream HTTP client the proxy forwards through.
/// Connections are pooled per authority by the hyper client.
#[derive(Clone)]
pub struct Client {
	client: legacy::Client<hyper_rustls::HttpsConnector<HttpConnector>, Body>,
}

impl Client {
	pub fn new() -> anyhow::Result<Client> {
		let https = hyper_rustls::HttpsConnectorBuilder::new()
			.with_native_roots()?
			.https_or_http()
			.enable_http1()
			.build();
		let client = legacy::Client::builder(TokioExecutor::new())
			.timer(hyper_util::rt::tokio::TokioTimer::new())
			.build(https);
		Ok(Client { client })
	}

	/// call sends a request whose URI is already absolute and returns the
	/// upstream response as-is.
	pub async fn call(&self, mut req: Request) -> Result<Response, ProxyError> {
		// The upstream leg always speaks HTTP/1.1, whatever the downstream
		// connection negotiated.
		*req.version_mut() = ::http::Version::HTTP_11;

		let start = Instant::now();
		let method = req.method().clone();
		let uri = req.uri().clone();
		let resp = self.client.request(req).await;
		match &resp {
			Ok(r) => debug!(
				http.method = %method,
				http.uri = %uri,
				http.status = r.status().as_u16(),
				duration = ?start.elapsed(),
				"upstream request"
			),
			Err(e) => debug!(
				http.method = %method,
				http.uri = %uri,
				duration = ?start.elapsed(),
				"upstream request failed: {e}"
			),
		}
		Ok(resp.map_err(ProxyError::UpstreamCallFailed)?.map(Body::new))
	}
}
