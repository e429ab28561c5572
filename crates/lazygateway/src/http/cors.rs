use ::http::{HeaderMap, HeaderValue, header};
use serde::Deserialize;

use crate::http::Request;

/// Cors is one host's resolved cross-origin policy, with the header values
/// built once at config load.
#[derive(Debug, Clone)]
pub struct Cors {
	allow_origins: Vec<String>,
	allow_methods: Option<HeaderValue>,
	allow_headers: Option<HeaderValue>,
	expose_headers: Option<HeaderValue>,
	allow_credentials: bool,
	max_age: Option<HeaderValue>,
}

/// The on-disk shape of a host's `cors` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CorsSerde {
	pub allowed_origins: Vec<String>,
	pub allowed_methods: Vec<String>,
	pub allowed_headers: Vec<String>,
	pub exposed_headers: Vec<String>,
	pub allow_credentials: bool,
	/// Seconds; emitted only when positive.
	pub max_age: u64,
}

impl TryFrom<CorsSerde> for Cors {
	type Error = anyhow::Error;

	fn try_from(value: CorsSerde) -> Result<Self, Self::Error> {
		Ok(Cors {
			allow_origins: value.allowed_origins,
			allow_methods: join_list(&value.allowed_methods)?,
			allow_headers: join_list(&value.allowed_headers)?,
			expose_headers: join_list(&value.exposed_headers)?,
			allow_credentials: value.allow_credentials,
			max_age: (value.max_age > 0)
				.then(|| HeaderValue::from_str(&value.max_age.to_string()))
				.transpose()?,
		})
	}
}

fn join_list(items: &[String]) -> anyhow::Result<Option<HeaderValue>> {
	if items.is_empty() {
		return Ok(None);
	}
	Ok(Some(HeaderValue::from_str(&items.join(", "))?))
}

/// CorsResolution carries the headers to stamp on the response and whether
/// the request's origin was acceptable. A denied request still receives the
/// configured headers; the caller decides the status code.
#[derive(Debug)]
pub struct CorsResolution {
	pub allowed: bool,
	pub headers: HeaderMap,
}

const HEADER_VALUE_TRUE: HeaderValue = HeaderValue::from_static("true");

impl Cors {
	/// resolve applies the policy to a request. Requests without an Origin
	/// are always allowed and receive no CORS headers at all; for the rest,
	/// the configured lists are emitted either way and the origin is echoed
	/// back only when it matches the configured list exactly.
	pub fn resolve(&self, req: &Request) -> CorsResolution {
		let Some(origin) = req.headers().get(header::ORIGIN) else {
			return CorsResolution {
				allowed: true,
				headers: HeaderMap::new(),
			};
		};

		let mut headers = HeaderMap::new();
		let allowed = self
			.allow_origins
			.iter()
			.any(|want| want.as_bytes() == origin.as_bytes());
		if allowed {
			headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
		}
		if let Some(h) = &self.allow_methods {
			headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, h.clone());
		}
		if let Some(h) = &self.allow_headers {
			headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, h.clone());
		}
		if let Some(h) = &self.expose_headers {
			headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, h.clone());
		}
		if self.allow_credentials {
			headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HEADER_VALUE_TRUE);
		}
		if let Some(h) = &self.max_age {
			headers.insert(header::ACCESS_CONTROL_MAX_AGE, h.clone());
		}
		CorsResolution { allowed, headers }
	}
}
