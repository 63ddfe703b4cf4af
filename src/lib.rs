pub mod config;
pub mod http;
pub mod llm;
pub mod stream;
pub mod telemetry;
