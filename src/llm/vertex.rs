//! Vertex AI's Gemini models serve the same JSON shape as the public
//! Gemini API; this adapter delegates entirely to [`crate::llm::gemini`].
//! Host resolution (`{region}-aiplatform.googleapis.com`) and the
//! `:streamGenerateContent` path are request-path concerns outside this
//! crate's response-guardrail scope.

use bytes::Bytes;
use serde_json::Value;

use crate::llm::{gemini, ProviderAdapter};
use crate::stream::{Chunk, ChunkKind, Tokens};

pub struct Vertex;

impl ProviderAdapter for Vertex {
	fn name(&self) -> &'static str {
		"vertex"
	}
	fn extract_contents(&self, payload: &Value) -> Option<Vec<Bytes>> {
		gemini::extract_contents(payload)
	}
	fn update_contents(&self, payload: &Value, choice_index: usize, new_bytes: &[u8]) -> Value {
		gemini::update_contents(payload, choice_index, new_bytes)
	}
	fn update_usage(&self, payload: &Value, tokens: Tokens) -> Value {
		gemini::update_usage(payload, tokens)
	}
	fn get_model(&self, payload: &Value) -> Option<String> {
		gemini::get_model(payload)
	}
	fn tokens(&self, payload: &Value) -> Tokens {
		gemini::tokens(payload)
	}
	fn classify(&self, payload: Option<&Value>, raw: &[u8]) -> ChunkKind {
		gemini::classify(payload, raw)
	}
	fn is_stream_completed(&self, chunk: &Chunk) -> bool {
		if chunk.kind == ChunkKind::Done {
			return true;
		}
		chunk.payload.as_ref().and_then(gemini::finish_reason).is_some()
	}
	fn has_function_call_finish_reason(&self, payload: &Value) -> bool {
		gemini::has_function_call_finish_reason(payload)
	}
}
