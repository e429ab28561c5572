use tracing_subscriber::EnvFilter;

/// setup_logging installs the global subscriber: env-filtered, written
/// through a non-blocking worker. The returned guard flushes buffered lines
/// on drop; hold it for the process lifetime.
pub fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
	let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(writer)
		.init();
	guard
}
