// Process entrypoint. Grounded in `agentgateway-app/src/main.rs`'s shape:
// a `clap::Parser` `Args` struct, a file-backed config load, `setup_logging`
// before anything else runs, and a `tokio::main` body that spawns the
// ambient HTTP surface (here, just `/healthz` — the gRPC ext_proc listener
// itself is the explicit Non-goal, per SPEC_FULL.md §10.5).

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use promptguard_proc::config::{self, ConfigSource, FileConfigSource};
use promptguard_proc::http::healthz;
use promptguard_proc::telemetry;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
	/// Path to the guardrail configuration file (YAML or JSON).
	#[arg(short, long, value_name = "file")]
	file: Option<PathBuf>,

	/// Address the `/healthz` endpoint listens on.
	#[arg(long, default_value = "0.0.0.0:15021")]
	health_addr: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	telemetry::setup_logging();

	let args = Args::parse();

	if let Some(path) = &args.file {
		let source = FileConfigSource { path: path.clone() };
		let contents = source.load().context("loading guardrail configuration")?;
		let raw = config::parse_config(&contents)?;
		info!(provider = ?raw.provider, min_segment_length = raw.min_segment_length, "loaded guardrail configuration");
	} else {
		info!("no --file provided; running with the ambient health surface only");
	}

	let listener = tokio::net::TcpListener::bind(&args.health_addr)
		.await
		.with_context(|| format!("binding health listener on {}", args.health_addr))?;
	info!(addr = %args.health_addr, "serving /healthz");
	axum::serve(listener, healthz::router()).await?;
	Ok(())
}
