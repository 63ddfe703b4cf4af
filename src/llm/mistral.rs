//! Mistral's chat-completion API is OpenAI-compatible over the wire
//! (`choices[].delta`, `finish_reason`, `usage.{prompt,completion}_tokens`);
//! delegates to [`crate::llm::openai`].

use bytes::Bytes;
use serde_json::Value;

use crate::llm::{openai, ProviderAdapter};
use crate::stream::{Chunk, ChunkKind, Tokens};

pub struct Mistral;

impl ProviderAdapter for Mistral {
	fn name(&self) -> &'static str {
		"mistral"
	}
	fn extract_contents(&self, payload: &Value) -> Option<Vec<Bytes>> {
		openai::extract_contents(payload)
	}
	fn update_contents(&self, payload: &Value, choice_index: usize, new_bytes: &[u8]) -> Value {
		openai::update_contents(payload, choice_index, new_bytes)
	}
	fn update_usage(&self, payload: &Value, tokens: Tokens) -> Value {
		openai::update_usage(payload, tokens)
	}
	fn get_model(&self, payload: &Value) -> Option<String> {
		openai::get_model(payload)
	}
	fn tokens(&self, payload: &Value) -> Tokens {
		openai::tokens(payload)
	}
	fn classify(&self, payload: Option<&Value>, raw: &[u8]) -> ChunkKind {
		openai::classify(payload, raw)
	}
	fn is_stream_completed(&self, chunk: &Chunk) -> bool {
		chunk.kind == ChunkKind::Done
	}
	fn has_function_call_finish_reason(&self, payload: &Value) -> bool {
		openai::has_function_call_finish_reason(payload)
	}
}
