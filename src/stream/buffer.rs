use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};

use bytes::{Bytes, BytesMut};
use tracing::error;

use super::boundary::ContentView;
use super::chunk::{Chunk, ChunkKind};
use super::Tokens;

/// Process-wide observability counter (§5 "Shared state"). Updated on
/// every append/pop; not used for control flow.
pub static TOTAL_BYTES_BUFFERED: AtomicI64 = AtomicI64::new(0);

pub fn total_bytes_buffered() -> i64 {
	TOTAL_BYTES_BUFFERED.load(Ordering::Relaxed)
}

/// One per in-flight response (§3 StreamState). Mutated only by the
/// guardrail engine's handler for this stream; never shared across
/// streams.
#[derive(Debug, Default)]
pub struct StreamState {
	pub fifo: VecDeque<Chunk>,
	reconstructed: Vec<BytesMut>,
	pub leftover: Bytes,
	pub model: Option<String>,
	pub tokens: Tokens,
	pub is_function_calling: bool,
	pub is_completed: bool,
}

impl StreamState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn choice_count(&self) -> usize {
		self.reconstructed.len()
	}

	/// Push `chunk` to the tail; if it carries content, extend each
	/// `reconstructed[i]`. The first content-bearing chunk establishes the
	/// choice count (§4.4 `append`).
	pub fn append(&mut self, chunk: Chunk) {
		if let Some(contents) = &chunk.contents {
			if self.reconstructed.is_empty() {
				self.reconstructed = contents.iter().map(|_| BytesMut::new()).collect();
			}
			if contents.len() != self.reconstructed.len() {
				error!(
					expected = self.reconstructed.len(),
					got = contents.len(),
					"choice count mismatch on append; extending matching indices only"
				);
			}
			for (i, buf) in self.reconstructed.iter_mut().enumerate() {
				if let Some(c) = contents.get(i) {
					buf.extend_from_slice(c);
				}
			}
		}
		TOTAL_BYTES_BUFFERED.fetch_add(chunk.raw.len() as i64, Ordering::Relaxed);
		self.fifo.push_back(chunk);
	}

	/// Pop the head chunk, stripping its contents from the front of each
	/// `reconstructed[i]`. Returns `None` if the fifo is empty.
	pub fn pop(&mut self) -> Option<Chunk> {
		let chunk = self.fifo.pop_front()?;
		if let Some(contents) = &chunk.contents {
			for (i, c) in contents.iter().enumerate() {
				if let Some(buf) = self.reconstructed.get_mut(i) {
					if buf.starts_with(c.as_ref()) {
						let remainder = buf.split_off(c.len());
						*buf = remainder;
					} else {
						error!(
							choice = i,
							"reconstructed buffer does not start with popped chunk's content; buffer left untouched"
						);
					}
				}
			}
		}
		TOTAL_BYTES_BUFFERED.fetch_sub(chunk.raw.len() as i64, Ordering::Relaxed);
		Some(chunk)
	}

	/// Concatenate `raw` of every buffered chunk, clear the fifo and the
	/// reconstructed shadow, and return the bytes.
	pub fn pop_all(&mut self) -> Bytes {
		let mut out = BytesMut::new();
		while let Some(chunk) = self.fifo.pop_front() {
			TOTAL_BYTES_BUFFERED.fetch_sub(chunk.raw.len() as i64, Ordering::Relaxed);
			out.extend_from_slice(&chunk.raw);
		}
		for buf in &mut self.reconstructed {
			buf.clear();
		}
		out.freeze()
	}

	/// Pop `n` chunks (or everything, if `n >= len(fifo)`).
	pub fn pop_n(&mut self, n: usize) -> Bytes {
		if n >= self.fifo.len() {
			return self.pop_all();
		}
		let mut out = BytesMut::new();
		for _ in 0..n {
			if let Some(chunk) = self.pop() {
				out.extend_from_slice(&chunk.raw);
			}
		}
		out.freeze()
	}

	/// Snapshot of `reconstructed`, decoded as UTF-8. Lossy decoding is used
	/// defensively (a straddling multi-byte codepoint across chunks is
	/// resolved by the alignment step before this is called in practice);
	/// invalid UTF-8 becomes the replacement character rather than a panic.
	pub fn content_view(&self) -> Vec<ContentView> {
		self
			.reconstructed
			.iter()
			.map(|buf| ContentView {
				content: String::from_utf8_lossy(buf).into_owned(),
				begin_index: 0,
				end_index: self.fifo.len(),
			})
			.collect()
	}

	/// Count of chunks whose kind is content-bearing (`NormalText` or
	/// `Finish`); `true` if at least `n`.
	pub fn has_content_chunks_at_least(&self, n: usize) -> bool {
		self
			.fifo
			.iter()
			.filter(|c| c.kind.is_content_bearing())
			.count()
			>= n
	}

	/// Rebuild `reconstructed` from `fifo` from scratch. Used after
	/// rewrites that re-organize contents across multiple chunks (boundary
	/// splits, collapses) where incremental bookkeeping would be error
	/// prone.
	pub fn reconstruct(&mut self) {
		let choice_count = self
			.fifo
			.iter()
			.filter_map(|c| c.contents.as_ref().map(|v| v.len()))
			.max()
			.unwrap_or(0);
		let mut buffers: Vec<BytesMut> = (0..choice_count).map(|_| BytesMut::new()).collect();
		for chunk in &self.fifo {
			if let Some(contents) = &chunk.contents {
				for (i, c) in contents.iter().enumerate() {
					if let Some(buf) = buffers.get_mut(i) {
						buf.extend_from_slice(c);
					}
				}
			}
		}
		self.reconstructed = buffers;
	}

	/// Total bytes currently buffered for this stream (sum of `raw` lengths).
	pub fn buffered_len(&self) -> usize {
		self.fifo.iter().map(|c| c.raw.len()).sum()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::stream::chunk::ChunkKind;

	fn text_chunk(raw: &'static str, choice0: &'static str) -> Chunk {
		Chunk {
			raw: Bytes::from_static(raw.as_bytes()),
			payload: None,
			contents: Some(vec![Bytes::from_static(choice0.as_bytes())]),
			kind: ChunkKind::NormalText,
		}
	}

	#[test]
	fn append_then_pop_round_trips_bytes() {
		let mut s = StreamState::new();
		s.append(text_chunk("data: a\n\n", "a"));
		s.append(text_chunk("data: b\n\n", "b"));
		assert_eq!(s.content_view()[0].content, "ab");
		let popped = s.pop().unwrap();
		assert_eq!(popped.raw, Bytes::from_static(b"data: a\n\n"));
		assert_eq!(s.content_view()[0].content, "b");
	}

	#[test]
	fn pop_all_returns_every_raw_byte_and_clears_state() {
		let mut s = StreamState::new();
		s.append(text_chunk("data: a\n\n", "a"));
		s.append(text_chunk("data: b\n\n", "b"));
		let out = s.pop_all();
		assert_eq!(out, Bytes::from_static(b"data: a\n\ndata: b\n\n"));
		assert!(s.fifo.is_empty());
		assert_eq!(s.content_view()[0].content, "");
	}

	#[test]
	fn pop_n_delegates_to_pop_all_when_n_covers_everything() {
		let mut s = StreamState::new();
		s.append(text_chunk("data: a\n\n", "a"));
		s.append(text_chunk("data: b\n\n", "b"));
		let out = s.pop_n(5);
		assert_eq!(out, Bytes::from_static(b"data: a\n\ndata: b\n\n"));
	}

	#[test]
	fn reconstruct_rebuilds_from_fifo() {
		let mut s = StreamState::new();
		s.append(text_chunk("data: a\n\n", "a"));
		s.append(text_chunk("data: b\n\n", "b"));
		s.reconstruct();
		assert_eq!(s.content_view()[0].content, "ab");
	}

	#[test]
	fn has_content_chunks_at_least_counts_only_text_and_finish() {
		let mut s = StreamState::new();
		s.append(text_chunk("data: a\n\n", "a"));
		s.append(Chunk::done(Bytes::from_static(b"data: [DONE]\n\n")));
		assert!(s.has_content_chunks_at_least(1));
		assert!(!s.has_content_chunks_at_least(2));
	}
}
