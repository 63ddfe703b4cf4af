//! Anthropic Messages API streaming shape: a sequence of typed SSE events
//! (`message_start`, `content_block_delta`, `message_delta`,
//! `message_stop`, ...) rather than OpenAI's repeated `choices[].delta`
//! frames. Anthropic has no parallel-choice concept, so every operation
//! here treats content as a single choice at index 0, matching the
//! specification's guidance to implement the single-choice case first
//! (§9 "Multi-choice alignment").

use bytes::Bytes;
use serde_json::{json, Value};

use crate::llm::ProviderAdapter;
use crate::stream::{Chunk, ChunkKind, Tokens};

pub struct Anthropic;

fn event_type(payload: &Value) -> Option<&str> {
	payload.get("type").and_then(Value::as_str)
}

impl ProviderAdapter for Anthropic {
	fn name(&self) -> &'static str {
		"anthropic"
	}

	fn extract_contents(&self, payload: &Value) -> Option<Vec<Bytes>> {
		if event_type(payload) != Some("content_block_delta") {
			return None;
		}
		let delta = payload.get("delta")?;
		if delta.get("type").and_then(Value::as_str) != Some("text_delta") {
			return None;
		}
		let text = delta.get("text")?.as_str()?;
		Some(vec![Bytes::copy_from_slice(text.as_bytes())])
	}

	fn update_contents(&self, payload: &Value, choice_index: usize, new_bytes: &[u8]) -> Value {
		let mut out = payload.clone();
		if choice_index == 0 {
			if let Some(delta) = out.get_mut("delta") {
				delta["text"] = Value::String(String::from_utf8_lossy(new_bytes).into_owned());
			}
		}
		out
	}

	fn update_usage(&self, payload: &Value, tokens: Tokens) -> Value {
		let mut out = payload.clone();
		match event_type(payload) {
			Some("message_start") => {
				if let Some(message) = out.get_mut("message") {
					message["usage"] = json!({
						"input_tokens": tokens.prompt,
						"output_tokens": tokens.completion,
					});
				}
			},
			Some("message_delta") => {
				out["usage"] = json!({ "output_tokens": tokens.completion });
			},
			_ => {},
		}
		out
	}

	fn get_model(&self, payload: &Value) -> Option<String> {
		payload
			.get("message")
			.and_then(|m| m.get("model"))
			.and_then(Value::as_str)
			.map(String::from)
	}

	fn tokens(&self, payload: &Value) -> Tokens {
		match event_type(payload) {
			Some("message_start") => Tokens {
				prompt: payload
					.get("message")
					.and_then(|m| m.get("usage"))
					.and_then(|u| u.get("input_tokens"))
					.and_then(Value::as_u64)
					.unwrap_or(0),
				completion: payload
					.get("message")
					.and_then(|m| m.get("usage"))
					.and_then(|u| u.get("output_tokens"))
					.and_then(Value::as_u64)
					.unwrap_or(0),
			},
			Some("message_delta") => Tokens {
				prompt: 0,
				completion: payload
					.get("usage")
					.and_then(|u| u.get("output_tokens"))
					.and_then(Value::as_u64)
					.unwrap_or(0),
			},
			_ => Tokens::default(),
		}
	}

	fn classify(&self, payload: Option<&Value>, _raw: &[u8]) -> ChunkKind {
		let Some(payload) = payload else {
			return ChunkKind::Done;
		};
		match event_type(payload) {
			Some("message_stop") => ChunkKind::Done,
			Some("content_block_delta") => {
				let has_text = payload
					.get("delta")
					.and_then(|d| d.get("text"))
					.and_then(Value::as_str)
					.is_some_and(|s| !s.is_empty());
				if has_text {
					ChunkKind::NormalText
				} else {
					ChunkKind::NormalBinary
				}
			},
			Some("message_delta") => {
				let stopped = payload
					.get("delta")
					.and_then(|d| d.get("stop_reason"))
					.map(|v| !v.is_null())
					.unwrap_or(false);
				if stopped {
					ChunkKind::FinishNoContent
				} else {
					ChunkKind::NormalBinary
				}
			},
			Some("message_start") | Some("content_block_start") | Some("content_block_stop") | Some("ping") => {
				ChunkKind::NormalBinary
			},
			_ => ChunkKind::Invalid,
		}
	}

	fn is_stream_completed(&self, chunk: &Chunk) -> bool {
		if chunk.kind == ChunkKind::Done {
			return true;
		}
		chunk
			.payload
			.as_ref()
			.and_then(event_type)
			.map(|t| t == "message_stop")
			.unwrap_or(false)
	}

	fn has_function_call_finish_reason(&self, payload: &Value) -> bool {
		payload
			.get("delta")
			.and_then(|d| d.get("stop_reason"))
			.and_then(Value::as_str)
			== Some("tool_use")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn text_delta_extracts_content() {
		let p: Value =
			serde_json::from_str(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#)
				.unwrap();
		assert_eq!(Anthropic.extract_contents(&p).unwrap(), vec![Bytes::from_static(b"hi")]);
		assert_eq!(Anthropic.classify(Some(&p), b""), ChunkKind::NormalText);
	}

	#[test]
	fn message_stop_is_done() {
		let p: Value = serde_json::from_str(r#"{"type":"message_stop"}"#).unwrap();
		assert_eq!(Anthropic.classify(Some(&p), b""), ChunkKind::Done);
	}

	#[test]
	fn message_delta_with_stop_reason_is_finish_no_content() {
		let p: Value =
			serde_json::from_str(r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":15}}"#)
				.unwrap();
		assert_eq!(Anthropic.classify(Some(&p), b""), ChunkKind::FinishNoContent);
		assert_eq!(Anthropic.tokens(&p).completion, 15);
	}

	/// A segment boundary landing exactly at the end of a `content_block_delta`
	/// event's text must not trigger a chunk split or raw-byte rewrite; both
	/// frames should pass through byte-identical (see the matching
	/// regression test in `crate::stream::engine`).
	#[tokio::test]
	async fn boundary_at_chunk_end_is_released_byte_identical() {
		use crate::llm::policy::{Action, Builtin, GuardDirectionConfig, RegexRule, RegexRules};
		use crate::llm::AiProvider;
		use crate::stream::engine::{GuardrailEngine, StreamGuardConfig};

		let mut config = StreamGuardConfig::new(
			AiProvider::Anthropic,
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
			r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Intro. "}}"#
				.to_string()
				+ "\n\n",
		);
		let frame1 = Bytes::from(
			r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello. "}}"#
				.to_string()
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
