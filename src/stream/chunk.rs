use bytes::Bytes;
use serde_json::Value;

/// Classification tag for a single parsed SSE frame (§2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
	/// Textual delta present.
	NormalText,
	/// Non-text delta (e.g. audio) or otherwise unclassifiable content-bearing frame.
	NormalBinary,
	/// `finish_reason` set, with trailing textual content in the same frame.
	Finish,
	/// `finish_reason` set, no textual content.
	FinishNoContent,
	/// The `data: [DONE]` sentinel (or provider-equivalent stream terminator).
	Done,
	/// Frame could not be parsed into a known shape.
	Invalid,
}

impl ChunkKind {
	/// Chunks counted by `has_content_chunks_at_least` (§4.4).
	pub fn is_content_bearing(self) -> bool {
		matches!(self, ChunkKind::NormalText | ChunkKind::Finish)
	}

	/// Chunks the collapse step must preserve verbatim rather than fold
	/// into the rewritten head chunk (§4.5 "Collapse on modification").
	pub fn is_preserved_on_collapse(self) -> bool {
		matches!(self, ChunkKind::Done | ChunkKind::FinishNoContent | ChunkKind::Invalid)
	}
}

/// A single parsed SSE frame plus derived metadata (§3 Chunk).
///
/// Invariant: if `contents` is `Some`, `raw` is the canonical serialization
/// of `payload`, and for each choice index `i` the text content field
/// inside `payload` for choice `i` decodes to exactly `contents[i]`.
#[derive(Debug, Clone)]
pub struct Chunk {
	pub raw: Bytes,
	pub payload: Option<Value>,
	pub contents: Option<Vec<Bytes>>,
	pub kind: ChunkKind,
}

impl Chunk {
	pub fn content_len(&self, choice: usize) -> usize {
		self
			.contents
			.as_ref()
			.and_then(|c| c.get(choice))
			.map(|b| b.len())
			.unwrap_or(0)
	}

	pub fn done(raw: Bytes) -> Self {
		Chunk {
			raw,
			payload: None,
			contents: None,
			kind: ChunkKind::Done,
		}
	}

	pub fn invalid(raw: Bytes) -> Self {
		Chunk {
			raw,
			payload: None,
			contents: None,
			kind: ChunkKind::Invalid,
		}
	}
}
