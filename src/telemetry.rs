//! Logging setup (§10.1). The teacher's own `agent-core::telemetry` wires an
//! `OpenTelemetry`/`tracing-subscriber` stack tied to its xDS-driven
//! deployment; none of that survives here since this crate has no telemetry
//! backend to export to; only the `tracing-subscriber`/`EnvFilter`
//! initialization pattern is kept, grounded in the same `fmt::Subscriber`
//! plus `EnvFilter::from_default_env()` idiom the teacher's binaries use at
//! startup before the richer OTel layers are attached.

use tracing_subscriber::EnvFilter;

/// Install a process-wide `tracing` subscriber. Reads `RUST_LOG` (falling
/// back to `info`) the same way the teacher's binary entrypoints do.
pub fn setup_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
	if tracing::subscriber::set_global_default(subscriber).is_err() {
		tracing::debug!("global tracing subscriber already set");
	}
}
