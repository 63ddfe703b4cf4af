//! OpenAI chat-completion streaming shape. Azure OpenAI and Mistral reuse
//! these functions directly ([`crate::llm::azure`], [`crate::llm::mistral`])
//! since both upstreams speak the same `choices[].delta`/`finish_reason`
//! shape over the wire.

use bytes::Bytes;
use serde_json::{json, Value};

use crate::llm::{u64_field, ProviderAdapter};
use crate::stream::{Chunk, ChunkKind, Tokens};

pub struct OpenAi;

pub(crate) fn extract_contents(payload: &Value) -> Option<Vec<Bytes>> {
	let choices = payload.get("choices")?.as_array()?;
	if choices.is_empty() {
		return None;
	}
	let max_index = choices
		.iter()
		.filter_map(|c| c.get("index").and_then(Value::as_u64))
		.max()? as usize;
	let mut contents: Vec<Bytes> = (0..=max_index).map(|_| Bytes::new()).collect();
	let mut any_text = false;
	for choice in choices {
		let idx = choice.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
		if let Some(text) = choice.get("delta").and_then(|d| d.get("content")).and_then(Value::as_str) {
			if idx < contents.len() {
				contents[idx] = Bytes::copy_from_slice(text.as_bytes());
				any_text = true;
			}
		}
	}
	if any_text {
		Some(contents)
	} else {
		None
	}
}

pub(crate) fn update_contents(payload: &Value, choice_index: usize, new_bytes: &[u8]) -> Value {
	let mut out = payload.clone();
	if let Some(choices) = out.get_mut("choices").and_then(Value::as_array_mut) {
		for choice in choices.iter_mut() {
			let idx = choice.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
			if idx == choice_index {
				if let Some(delta) = choice.get_mut("delta") {
					delta["content"] = Value::String(String::from_utf8_lossy(new_bytes).into_owned());
				}
			}
		}
	}
	out
}

pub(crate) fn update_usage(payload: &Value, tokens: Tokens) -> Value {
	let mut out = payload.clone();
	out["usage"] = json!({
		"prompt_tokens": tokens.prompt,
		"completion_tokens": tokens.completion,
		"total_tokens": tokens.prompt + tokens.completion,
	});
	out
}

pub(crate) fn get_model(payload: &Value) -> Option<String> {
	payload.get("model").and_then(Value::as_str).map(String::from)
}

pub(crate) fn tokens(payload: &Value) -> Tokens {
	Tokens {
		prompt: u64_field(payload, &["usage", "prompt_tokens"]).unwrap_or(0),
		completion: u64_field(payload, &["usage", "completion_tokens"]).unwrap_or(0),
	}
}

pub(crate) fn finish_reason(payload: &Value) -> Option<&str> {
	payload
		.get("choices")?
		.as_array()?
		.first()?
		.get("finish_reason")?
		.as_str()
}

pub(crate) fn classify(payload: Option<&Value>, _raw: &[u8]) -> ChunkKind {
	let Some(payload) = payload else {
		return ChunkKind::Done;
	};
	let Some(choices) = payload.get("choices").and_then(Value::as_array) else {
		return ChunkKind::Invalid;
	};
	let Some(choice) = choices.first() else {
		return ChunkKind::Invalid;
	};
	let has_text = choice
		.get("delta")
		.and_then(|d| d.get("content"))
		.and_then(Value::as_str)
		.is_some_and(|s| !s.is_empty());
	let finished = choice.get("finish_reason").map(|v| !v.is_null()).unwrap_or(false);
	match (finished, has_text) {
		(true, true) => ChunkKind::Finish,
		(true, false) => ChunkKind::FinishNoContent,
		(false, true) => ChunkKind::NormalText,
		(false, false) => ChunkKind::NormalBinary,
	}
}

pub(crate) fn has_function_call_finish_reason(payload: &Value) -> bool {
	matches!(finish_reason(payload), Some("function_call") | Some("tool_calls"))
}

impl ProviderAdapter for OpenAi {
	fn name(&self) -> &'static str {
		"openai"
	}
	fn extract_contents(&self, payload: &Value) -> Option<Vec<Bytes>> {
		extract_contents(payload)
	}
	fn update_contents(&self, payload: &Value, choice_index: usize, new_bytes: &[u8]) -> Value {
		update_contents(payload, choice_index, new_bytes)
	}
	fn update_usage(&self, payload: &Value, tokens: Tokens) -> Value {
		update_usage(payload, tokens)
	}
	fn get_model(&self, payload: &Value) -> Option<String> {
		get_model(payload)
	}
	fn tokens(&self, payload: &Value) -> Tokens {
		tokens(payload)
	}
	fn classify(&self, payload: Option<&Value>, raw: &[u8]) -> ChunkKind {
		classify(payload, raw)
	}
	fn is_stream_completed(&self, chunk: &Chunk) -> bool {
		chunk.kind == ChunkKind::Done
	}
	fn has_function_call_finish_reason(&self, payload: &Value) -> bool {
		has_function_call_finish_reason(payload)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chunk(json_str: &str) -> Value {
		serde_json::from_str(json_str).unwrap()
	}

	#[test]
	fn extracts_single_choice_text() {
		let p = chunk(r#"{"choices":[{"index":0,"delta":{"content":"hi"},"finish_reason":null}]}"#);
		assert_eq!(extract_contents(&p).unwrap(), vec![Bytes::from_static(b"hi")]);
	}

	#[test]
	fn role_only_delta_is_not_text() {
		let p = chunk(r#"{"choices":[{"index":0,"delta":{"role":"assistant"},"finish_reason":null}]}"#);
		assert!(extract_contents(&p).is_none());
		assert_eq!(classify(Some(&p), b""), ChunkKind::NormalBinary);
	}

	#[test]
	fn finish_with_content_is_finish() {
		let p = chunk(r#"{"choices":[{"index":0,"delta":{"content":"!"},"finish_reason":"stop"}]}"#);
		assert_eq!(classify(Some(&p), b""), ChunkKind::Finish);
	}

	#[test]
	fn finish_without_content_is_finish_no_content() {
		let p = chunk(r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#);
		assert_eq!(classify(Some(&p), b""), ChunkKind::FinishNoContent);
	}

	#[test]
	fn update_contents_preserves_other_fields() {
		let p = chunk(
			r#"{"id":"abc","choices":[{"index":0,"delta":{"content":"hi"},"finish_reason":null}],"model":"gpt-4"}"#,
		);
		let updated = update_contents(&p, 0, b"bye");
		assert_eq!(updated["id"], "abc");
		assert_eq!(updated["model"], "gpt-4");
		assert_eq!(updated["choices"][0]["delta"]["content"], "bye");
	}

	#[test]
	fn usage_defaults_to_zero_when_null() {
		let p = chunk(r#"{"choices":[{"index":0,"delta":{"content":"hi"}}],"usage":null}"#);
		assert_eq!(tokens(&p), Tokens::default());
	}

	/// A segment boundary landing exactly at the end of a delta's content
	/// must not trigger a chunk split or raw-byte rewrite; both frames
	/// should pass through byte-identical (see the matching regression test
	/// in `crate::stream::engine`).
	#[tokio::test]
	async fn boundary_at_chunk_end_is_released_byte_identical() {
		use crate::llm::policy::{Action, Builtin, GuardDirectionConfig, RegexRule, RegexRules};
		use crate::llm::AiProvider;
		use crate::stream::engine::{GuardrailEngine, StreamGuardConfig};

		let mut config = StreamGuardConfig::new(
			AiProvider::OpenAi,
			GuardDirectionConfig {
				webhook: None,
				regex: Some(RegexRules {
					action: Action::Mask,
					rules: vec![RegexRule::Builtin { builtin: Builtin::CreditCard }],
				}),
			},
		);
		config.min_segment_length = 10;
		let mut engine = GuardrailEngine::new(config, reqwest::Client::new());

		let frame0 = Bytes::from(
			r#"data: {"choices":[{"index":0,"delta":{"content":"Intro. "},"finish_reason":null}]}"#.to_string()
				+ "\n\n",
		);
		let frame1 = Bytes::from(
			r#"data: {"choices":[{"index":0,"delta":{"content":"Hello. "},"finish_reason":null}]}"#.to_string()
				+ "\n\n",
		);

		assert_eq!(engine.buffer(frame0.clone(), false).await.unwrap(), None);
		let out = engine.buffer(frame1.clone(), false).await.unwrap().unwrap();

		let mut expected = bytes::BytesMut::new();
		expected.extend_from_slice(&frame0);
		expected.extend_from_slice(&frame1);
		assert_eq!(out, expected.freeze());
	}
}
