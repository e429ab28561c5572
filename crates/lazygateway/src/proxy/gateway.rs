use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::httpproxy::HTTPProxy;
use crate::ProxyInputs;

/// Gateway owns the inbound listener. Every accepted connection is served on
/// its own task; every request on it is handled by an HTTPProxy.
pub struct Gateway {
	pi: Arc<ProxyInputs>,
	listener: TcpListener,
	address: SocketAddr,
}

impl Gateway {
	pub async fn bind(pi: Arc<ProxyInputs>) -> anyhow::Result<Gateway> {
		let listener = TcpListener::bind(pi.cfg.bind_addr).await?;
		let address = listener.local_addr()?;
		Ok(Gateway {
			pi,
			listener,
			address,
		})
	}

	pub fn address(&self) -> SocketAddr {
		self.address
	}

	pub async fn run(self) {
		info!(address = %self.address, "gateway listening");
		loop {
			let (stream, peer) = match self.listener.accept().await {
				Ok(conn) => conn,
				Err(e) => {
					warn!("accept failed: {e}");
					continue;
				},
			};
			debug!(%peer, "connection opened");
			let proxy = HTTPProxy::new(self.pi.clone(), peer);
			tokio::spawn(async move {
				let server = auto_server();
				let serve = server.serve_connection_with_upgrades(
					TokioIo::new(stream),
					service_fn(move |req| {
						let proxy = proxy.clone();
						async move { Ok::<_, Infallible>(proxy.proxy(req).await) }
					}),
				);
				if let Err(e) = serve.await {
					debug!(%peer, "connection closed: {e}");
				}
			});
		}
	}
}

fn auto_server() -> auto::Builder<TokioExecutor> {
	let mut b = auto::Builder::new(TokioExecutor::new());
	b.http2().timer(hyper_util::rt::tokio::TokioTimer::new());
	b
}
