//! Provider adapters: per-upstream JSON shape knowledge (§2.1/§4.1).
//!
//! Modeled as a tagged union with one variant per upstream, dispatching by
//! tag rather than through a base class/trait object hierarchy — the same
//! choice our teacher makes for its own `AIProvider` enum, and the one the
//! specification calls out explicitly (§9 "Variant over providers instead
//! of inheritance").

pub mod anthropic;
pub mod azure;
pub mod gemini;
pub mod mistral;
pub mod openai;
pub mod pii;
pub mod policy;
pub mod vertex;
pub mod webhook;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::stream::{Chunk, ChunkKind, Tokens};

/// Failure modes a provider adapter can surface. Mirrors the shape of the
/// teacher's `AIError`, trimmed to what the streaming response path
/// actually needs (request-shaping errors like `RequestTooLarge` belong to
/// the request path, which this crate only carries symmetrically via
/// [`policy::RequestGuard`] and does not re-derive a full error taxonomy
/// for).
#[derive(Debug, Error)]
pub enum ProviderError {
	#[error("payload missing expected field `{0}`")]
	MissingField(&'static str),
	#[error("payload shape not recognized for this provider")]
	UnknownShape,
	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),
}

/// One case per supported upstream (§9). `AzureOpenAi` and `Mistral` share
/// OpenAI's JSON shape and delegate to it; `Vertex` shares Gemini's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
	OpenAi,
	AzureOpenAi,
	Anthropic,
	Gemini,
	Vertex,
	Mistral,
}

impl AiProvider {
	pub fn adapter(self) -> &'static dyn ProviderAdapter {
		match self {
			AiProvider::OpenAi => &openai::OpenAi,
			AiProvider::AzureOpenAi => &azure::AzureOpenAi,
			AiProvider::Anthropic => &anthropic::Anthropic,
			AiProvider::Gemini => &gemini::Gemini,
			AiProvider::Vertex => &vertex::Vertex,
			AiProvider::Mistral => &mistral::Mistral,
		}
	}
}

/// Per-provider JSON shape operations (§4.1). All operations are pure over
/// the JSON payload and must handle absent/null fields without panicking —
/// they return `None`/zero rather than fail.
pub trait ProviderAdapter: Send + Sync {
	fn name(&self) -> &'static str;

	/// One entry per choice, in upstream order; `None` for non-text frames.
	fn extract_contents(&self, payload: &Value) -> Option<Vec<Bytes>>;

	/// Replace the text content field for a single choice. Every other
	/// field of `payload` must be byte-identical after re-serialization.
	fn update_contents(&self, payload: &Value, choice_index: usize, new_bytes: &[u8]) -> Value;

	/// Set prompt/completion token fields. Callers (the engine) are
	/// responsible for the "skip when either value is zero" rule (§4.5
	/// step 5) — this just writes what it is given.
	fn update_usage(&self, payload: &Value, tokens: Tokens) -> Value;

	fn get_model(&self, payload: &Value) -> Option<String>;

	/// Gemini/Vertex repeat prompt tokens on every frame; callers must not
	/// sum `prompt` blindly (§4.1, §4.5 step 2).
	fn tokens(&self, payload: &Value) -> Tokens;

	fn classify(&self, payload: Option<&Value>, raw: &[u8]) -> ChunkKind;

	/// Some providers terminate with a textual sentinel (`[DONE]`) rather
	/// than a JSON finish_reason.
	fn is_stream_completed(&self, chunk: &Chunk) -> bool {
		chunk.kind == ChunkKind::Done
	}

	fn has_function_call_finish_reason(&self, payload: &Value) -> bool;
}

/// Best-effort string extraction helper shared by every OpenAI-shaped
/// adapter (OpenAI, Azure OpenAI, Mistral).
pub(crate) fn str_field<'a>(v: &'a Value, path: &[&str]) -> Option<&'a str> {
	let mut cur = v;
	for key in path {
		cur = cur.get(key)?;
	}
	cur.as_str()
}

pub(crate) fn u64_field(v: &Value, path: &[&str]) -> Option<u64> {
	let mut cur = v;
	for key in path {
		cur = cur.get(key)?;
	}
	cur.as_u64()
}
