//! Google Gemini (`generateContent`/`streamGenerateContent`) shape.
//! [`crate::llm::vertex`] reuses these functions: Vertex AI's Gemini models
//! serve the identical `candidates[].content.parts[]`/`usageMetadata` JSON,
//! differing only in host/path and auth, which are outside this crate.

use bytes::Bytes;
use serde_json::{json, Value};

use crate::llm::{u64_field, ProviderAdapter};
use crate::stream::{Chunk, ChunkKind, Tokens};

pub struct Gemini;

pub(crate) fn extract_contents(payload: &Value) -> Option<Vec<Bytes>> {
	let candidates = payload.get("candidates")?.as_array()?;
	if candidates.is_empty() {
		return None;
	}
	let max_index = candidates
		.iter()
		.filter_map(|c| c.get("index").and_then(Value::as_u64))
		.max()
		.unwrap_or(0) as usize;
	let mut contents: Vec<Bytes> = (0..=max_index).map(|_| Bytes::new()).collect();
	let mut any_text = false;
	for candidate in candidates {
		let idx = candidate.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
		let text: String = candidate
			.get("content")
			.and_then(|c| c.get("parts"))
			.and_then(Value::as_array)
			.map(|parts| {
				parts
					.iter()
					.filter_map(|p| p.get("text").and_then(Value::as_str))
					.collect::<String>()
			})
			.unwrap_or_default();
		if !text.is_empty() && idx < contents.len() {
			contents[idx] = Bytes::copy_from_slice(text.as_bytes());
			any_text = true;
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
	if let Some(candidates) = out.get_mut("candidates").and_then(Value::as_array_mut) {
		for candidate in candidates.iter_mut() {
			let idx = candidate.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
			if idx != choice_index {
				continue;
			}
			if let Some(parts) = candidate
				.get_mut("content")
				.and_then(|c| c.get_mut("parts"))
				.and_then(Value::as_array_mut)
			{
				if let Some(first) = parts.first_mut() {
					first["text"] = Value::String(String::from_utf8_lossy(new_bytes).into_owned());
					parts.truncate(1);
				}
			}
		}
	}
	out
}

pub(crate) fn update_usage(payload: &Value, tokens: Tokens) -> Value {
	let mut out = payload.clone();
	out["usageMetadata"] = json!({
		"promptTokenCount": tokens.prompt,
		"candidatesTokenCount": tokens.completion,
		"totalTokenCount": tokens.prompt + tokens.completion,
	});
	out
}

pub(crate) fn get_model(payload: &Value) -> Option<String> {
	payload.get("modelVersion").and_then(Value::as_str).map(String::from)
}

pub(crate) fn tokens(payload: &Value) -> Tokens {
	Tokens {
		prompt: u64_field(payload, &["usageMetadata", "promptTokenCount"]).unwrap_or(0),
		completion: u64_field(payload, &["usageMetadata", "candidatesTokenCount"]).unwrap_or(0),
	}
}

pub(crate) fn finish_reason(payload: &Value) -> Option<&str> {
	payload.get("candidates")?.as_array()?.first()?.get("finishReason")?.as_str()
}

pub(crate) fn classify(payload: Option<&Value>, _raw: &[u8]) -> ChunkKind {
	let Some(payload) = payload else {
		return ChunkKind::Done;
	};
	let Some(candidates) = payload.get("candidates").and_then(Value::as_array) else {
		return ChunkKind::Invalid;
	};
	let Some(candidate) = candidates.first() else {
		return ChunkKind::Invalid;
	};
	let has_text = candidate
		.get("content")
		.and_then(|c| c.get("parts"))
		.and_then(Value::as_array)
		.map(|parts| parts.iter().any(|p| p.get("text").and_then(Value::as_str).is_some_and(|s| !s.is_empty())))
		.unwrap_or(false);
	let finished = candidate.get("finishReason").and_then(Value::as_str).is_some();
	match (finished, has_text) {
		(true, true) => ChunkKind::Finish,
		(true, false) => ChunkKind::FinishNoContent,
		(false, true) => ChunkKind::NormalText,
		(false, false) => ChunkKind::NormalBinary,
	}
}

pub(crate) fn has_function_call_finish_reason(payload: &Value) -> bool {
	payload
		.get("candidates")
		.and_then(Value::as_array)
		.and_then(|c| c.first())
		.and_then(|c| c.get("content"))
		.and_then(|c| c.get("parts"))
		.and_then(Value::as_array)
		.map(|parts| parts.iter().any(|p| p.get("functionCall").is_some()))
		.unwrap_or(false)
}

impl ProviderAdapter for Gemini {
	fn name(&self) -> &'static str {
		"gemini"
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
		if chunk.kind == ChunkKind::Done {
			return true;
		}
		chunk
			.payload
			.as_ref()
			.and_then(finish_reason)
			.is_some()
	}
	fn has_function_call_finish_reason(&self, payload: &Value) -> bool {
		has_function_call_finish_reason(payload)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_candidate_text() {
		let p: Value =
			serde_json::from_str(r#"{"candidates":[{"index":0,"content":{"parts":[{"text":"hi"}]}}]}"#).unwrap();
		assert_eq!(extract_contents(&p).unwrap(), vec![Bytes::from_static(b"hi")]);
	}

	#[test]
	fn prompt_tokens_repeat_is_visible_to_caller() {
		let p1: Value = serde_json::from_str(
			r#"{"candidates":[{"index":0,"content":{"parts":[{"text":"a"}]}}],"usageMetadata":{"promptTokenCount":10,"candidatesTokenCount":1}}"#,
		)
		.unwrap();
		let p2: Value = serde_json::from_str(
			r#"{"candidates":[{"index":0,"content":{"parts":[{"text":"b"}]}}],"usageMetadata":{"promptTokenCount":10,"candidatesTokenCount":2}}"#,
		)
		.unwrap();
		// The adapter just reports what's in each frame; deduplication
		// across frames is the engine's job (§4.5 "Collapse on modification").
		assert_eq!(tokens(&p1).prompt, 10);
		assert_eq!(tokens(&p2).prompt, 10);
	}

	/// A segment boundary landing exactly at the end of a candidate's
	/// content must not trigger a chunk split or raw-byte rewrite; both
	/// frames should pass through byte-identical (see the matching
	/// regression test in `crate::stream::engine`).
	#[tokio::test]
	async fn boundary_at_chunk_end_is_released_byte_identical() {
		use crate::llm::policy::{Action, Builtin, GuardDirectionConfig, RegexRule, RegexRules};
		use crate::llm::AiProvider;
		use crate::stream::engine::{GuardrailEngine, StreamGuardConfig};

		let mut config = StreamGuardConfig::new(
			AiProvider::Gemini,
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
			r#"data: {"candidates":[{"index":0,"content":{"parts":[{"text":"Intro. "}]}}]}"#.to_string() + "\n\n",
		);
		let frame1 = Bytes::from(
			r#"data: {"candidates":[{"index":0,"content":{"parts":[{"text":"Hello. "}]}}]}"#.to_string() + "\n\n",
		);

		assert_eq!(engine.buffer(frame0.clone(), false).await.unwrap(), None);
		let out = engine.buffer(frame1.clone(), false).await.unwrap().unwrap();

		let mut expected = bytes::BytesMut::new();
		expected.extend_from_slice(&frame0);
		expected.extend_from_slice(&frame1);
		assert_eq!(out, expected.freeze());
	}
}
