use tracing::info;

/// shutdown completes when the process receives SIGINT or SIGTERM.
#[cfg(unix)]
pub async fn shutdown() {
	use tokio::signal::unix::{SignalKind, signal};

	let mut term = signal(SignalKind::terminate()).expect("failed to register signal handler");
	tokio::select! {
		_ = tokio::signal::ctrl_c() => info!("received SIGINT, starting shutdown"),
		_ = term.recv() => info!("received SIGTERM, starting shutdown"),
	}
}

#[cfg(not(unix))]
pub async fn shutdown() {
	let _ = tokio::signal::ctrl_c().await;
	info!("received ctrl-c, starting shutdown");
}
