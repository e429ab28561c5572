use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lazygateway::{config, telemetry};
use tracing::info;

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
struct Args {
	/// Directory of host configuration files (overrides CONFIG_PATH)
	#[arg(short, long, value_name = "dir")]
	config: Option<PathBuf>,

	/// Parse the configuration, print a summary, and exit
	#[arg(long)]
	validate_only: bool,
}

fn main() -> anyhow::Result<()> {
	let _log_flush = telemetry::setup_logging();
	let args = Args::parse();

	let config = config::load(args.config)?;
	if args.validate_only {
		for host in &config.hosts {
			println!("{}: {} routes", host.hostname, host.routes.len());
		}
		println!("Configuration is valid!");
		return Ok(());
	}

	tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()?
		.block_on(async move {
			info!(bind = %config.bind_addr, hosts = config.hosts.len(), "starting lazygateway");
			lazygateway::app::run(Arc::new(config))
				.await?
				.wait_termination()
				.await
		})
}
