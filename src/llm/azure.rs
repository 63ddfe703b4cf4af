//! Azure OpenAI Service streaming shape. Identical on the wire to OpenAI's
//! chat-completion chunks (the Azure frontend passes the upstream OpenAI
//! shape through unchanged); only request routing/auth differ, which are
//! outside this crate's scope. Delegates entirely to [`crate::llm::openai`].

use bytes::Bytes;
use serde_json::Value;

use crate::llm::{openai, ProviderAdapter};
use crate::stream::{Chunk, ChunkKind, Tokens};

pub struct AzureOpenAi;

impl ProviderAdapter for AzureOpenAi {
	fn name(&self) -> &'static str {
		"azure_openai"
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
