pub mod cors;

pub type Error = axum_core::Error;
pub type Body = axum_core::body::Body;
pub type Request = ::http::Request<Body>;
pub type Response = ::http::Response<Body>;
pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header, uri};

use crate::proxy::ProxyError;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Rewrites the request URI in place, leaving the rest of the request alone.
pub fn modify_req_uri(
	req: &mut Request,
	f: impl FnOnce(&mut uri::Parts) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
	let nreq = std::mem::take(req);
	let (mut head, body) = nreq.into_parts();
	let mut parts = head.uri.into_parts();
	f(&mut parts)?;
	head.uri = Uri::from_parts(parts)?;
	*req = Request::from_parts(head, body);
	Ok(())
}

/// get_host returns the request's host with any port stripped. HTTP/1.1
/// origin-form requests carry it in the Host header; absolute-form URIs
/// carry it inline.
pub fn get_host(req: &Request) -> Result<&str, ProxyError> {
	let host = match req.uri().host() {
		Some(host) => host,
		None => req
			.headers()
			.get(header::HOST)
			.and_then(|h| h.to_str().ok())
			.ok_or(ProxyError::InvalidRequest)?,
	};
	Ok(strip_port(host))
}

fn strip_port(host: &str) -> &str {
	if host.starts_with('[') {
		// Bracketed IPv6 literal; the port, if any, follows the bracket.
		return match host.find(']') {
			Some(i) => &host[..=i],
			None => host,
		};
	}
	host.split(':').next().unwrap_or(host)
}

/// merge_in_headers inserts every entry of `additional` into `dest`,
/// replacing same-named headers.
pub fn merge_in_headers(additional: Option<HeaderMap>, dest: &mut HeaderMap) {
	if let Some(headers) = additional {
		for (k, v) in headers.into_iter() {
			let Some(k) = k else { continue };
			dest.insert(k, v);
		}
	}
}
