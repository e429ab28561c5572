mod gateway;
pub mod httpproxy;

pub use gateway::Gateway;

use crate::http::{Body, Response, StatusCode, header};
use crate::lifecycle::ActivationError;

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
	#[error("no route for host and path")]
	RouteNotFound,
	#[error("route has no backend protocol")]
	RouteUnroutable,
	#[error("unknown container {0}")]
	ServiceNotFound(String),
	#[error("activation failed: {0}")]
	Activation(#[from] ActivationError),
	#[error("upstream call failed: {0}")]
	UpstreamCallFailed(hyper_util::client::legacy::Error),
	#[error("invalid request")]
	InvalidRequest,
	#[error("processing failed: {0}")]
	Processing(#[from] anyhow::Error),
}

impl ProxyError {
	pub fn into_response(self) -> Response {
		let code = match self {
			ProxyError::RouteNotFound => StatusCode::NOT_FOUND,
			ProxyError::RouteUnroutable => StatusCode::NOT_FOUND,
			ProxyError::ServiceNotFound(_) => StatusCode::NOT_FOUND,

			ProxyError::Activation(_) => StatusCode::INTERNAL_SERVER_ERROR,
			ProxyError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,

			ProxyError::UpstreamCallFailed(_) => StatusCode::BAD_GATEWAY,
			ProxyError::InvalidRequest => StatusCode::BAD_REQUEST,
		};
		let msg = self.to_string();
		::http::Response::builder()
			.status(code)
			.header(header::CONTENT_TYPE, "text/plain")
			.body(Body::from(msg))
			.expect("builder with known status code should not fail")
	}
}
