//! The documented interface boundary to an `envoy.service.ext_proc.v3`
//! sidecar (§1 Non-goals, §10.5). Grounded in the teacher's
//! `http::ext_proc::proto::HttpBody` message shape; the actual gRPC service
//! loop the teacher builds around it (`ExtProc::mutate_response`, the
//! `tonic`/`prost`-generated `proto` module) is the explicit Non-goal this
//! crate does not wire up. What's carried here is only the body-chunk shape
//! and the trait a caller would drive it through.

use bytes::Bytes;

use crate::stream::engine::GuardrailError;

/// One `ResponseBody` message off the wire: a chunk of the upstream body
/// plus whether this is the last one.
#[derive(Debug, Clone)]
pub struct HttpBody {
	pub body: Bytes,
	pub end_of_stream: bool,
}

/// The interface a caller drives a response guardrail stream through.
///
/// The specification's own interface sketch returns a bare `Option<Bytes>`;
/// that can't express a guardrail REJECT outcome (§7 "Guardrail rejection"
/// requires terminating the stream with a non-2xx response), so this
/// returns a `Result` instead. Noted as a deliberate refinement in
/// DESIGN.md, not a literal transcription.
pub trait StreamProcessor {
	fn process(&mut self, body: HttpBody) -> impl std::future::Future<Output = Result<Option<Bytes>, GuardrailError>> + Send;
}

impl StreamProcessor for crate::stream::engine::GuardrailEngine {
	async fn process(&mut self, body: HttpBody) -> Result<Option<Bytes>, GuardrailError> {
		self.buffer(body.body, body.end_of_stream).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::llm::policy::GuardDirectionConfig;
	use crate::llm::AiProvider;
	use crate::stream::engine::{GuardrailEngine, StreamGuardConfig};

	#[tokio::test]
	async fn process_delegates_to_buffer() {
		let config = StreamGuardConfig::new(AiProvider::OpenAi, GuardDirectionConfig::default());
		let mut engine = GuardrailEngine::new(config, reqwest::Client::new());
		let body = HttpBody {
			body: Bytes::from_static(b"data: {}\n\n"),
			end_of_stream: true,
		};
		let out = engine.process(body).await.unwrap();
		assert_eq!(out, Some(Bytes::from_static(b"data: {}\n\n")));
	}
}
