//! The guardrail engine (§4.5) — the stream-processing "heart" of this
//! crate. [`GuardrailEngine::buffer`] is driven once per inbound
//! [`crate::http::HttpBody`] chunk and decides, for each call, whether to
//! hold bytes back, release them untouched, or release a rewritten segment
//! whose PII/policy-violating content has been masked.
//!
//! Grounded in the teacher's `llm::policy::Policy::apply` for the
//! guard-ordering rule (webhook before regex) and in the specification's own
//! walkthrough of the collapse/alignment algorithm (§4.5, §8 worked
//! examples S1-S6).

use bytes::{Bytes, BytesMut};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::llm::pii::RegexRejection;
use crate::llm::policy::{apply_regex_rules, GuardDirectionConfig};
use crate::llm::webhook::call_response_webhook;
use crate::llm::{AiProvider, ProviderAdapter};

use super::boundary::{default_boundary_regex, find_segment_boundary};
use super::buffer::StreamState;
use super::chunk::{Chunk, ChunkKind};
use super::sse::{self, SseError};
use super::Tokens;

#[derive(Debug, thiserror::Error)]
pub enum GuardrailError {
	#[error(transparent)]
	Sse(#[from] SseError),
	#[error(transparent)]
	Rejected(#[from] RegexRejection),
}

/// Per-stream configuration (§6 "Configuration (per-stream)").
#[derive(Debug, Clone)]
pub struct StreamGuardConfig {
	pub provider: AiProvider,
	/// No choice may be released until its reconstructed content reaches
	/// this many bytes (§4.5 step 1). Default 50, per the specification.
	pub min_segment_length: usize,
	pub boundary_regex: Regex,
	pub guard: GuardDirectionConfig,
}

impl StreamGuardConfig {
	pub fn new(provider: AiProvider, guard: GuardDirectionConfig) -> Self {
		StreamGuardConfig {
			provider,
			min_segment_length: 50,
			boundary_regex: default_boundary_regex(),
			guard,
		}
	}

	fn has_guards(&self) -> bool {
		self.guard.webhook.is_some() || self.guard.regex.is_some()
	}
}

/// Owns one [`StreamState`] for the lifetime of a single HTTP response.
pub struct GuardrailEngine {
	config: StreamGuardConfig,
	client: reqwest::Client,
	state: StreamState,
}

impl GuardrailEngine {
	pub fn new(config: StreamGuardConfig, client: reqwest::Client) -> Self {
		GuardrailEngine {
			config,
			client,
			state: StreamState::new(),
		}
	}

	pub fn model(&self) -> Option<&str> {
		self.state.model.as_deref()
	}

	pub fn is_completed(&self) -> bool {
		self.state.is_completed
	}

	pub fn is_function_calling(&self) -> bool {
		self.state.is_function_calling
	}

	/// Process one inbound body chunk. Returns `Ok(Some(bytes))` with
	/// whatever can be safely released downstream right now, `Ok(None)` if
	/// everything must stay buffered pending more data, or
	/// `Err(GuardrailError::Rejected(_))` if a REJECT-action rule fired —
	/// the caller must terminate the stream and surface a non-2xx response
	/// (§7 "Guardrail rejection").
	pub async fn buffer(&mut self, bytes: Bytes, end_of_stream: bool) -> Result<Option<Bytes>, GuardrailError> {
		if !self.config.has_guards() {
			// Bypass: never buffer more than necessary when nothing configured
			// needs to inspect the content (§4.5 "bypass steps 2-4").
			return Ok(Some(bytes));
		}

		let mut combined = BytesMut::with_capacity(self.state.leftover.len() + bytes.len());
		combined.extend_from_slice(&self.state.leftover);
		combined.extend_from_slice(&bytes);
		let (frames, leftover) = sse::split_frames(&combined.freeze());
		self.state.leftover = leftover;

		let adapter = self.config.provider.adapter();
		for raw in frames {
			self.ingest_frame(adapter, raw);
		}

		if end_of_stream && !self.state.leftover.is_empty() {
			let tail = std::mem::take(&mut self.state.leftover);
			warn!(bytes = tail.len(), "stream ended with an incomplete SSE frame");
			self.state.append(Chunk::invalid(tail));
		}

		if end_of_stream {
			return self.final_flush(adapter).await;
		}

		if !self.min_length_met() {
			return Ok(None);
		}

		match self.align_contents_for_guardrail(adapter)? {
			None => Ok(None),
			Some((k, guard_contents)) => self.collapse_and_emit(adapter, k, guard_contents).await.map(Some),
		}
	}

	fn ingest_frame(&mut self, adapter: &dyn ProviderAdapter, raw: Bytes) {
		let mut chunk = sse::parse_chunk(raw.clone());
		if let Some(payload) = chunk.payload.clone() {
			chunk.contents = adapter.extract_contents(&payload);
			chunk.kind = adapter.classify(Some(&payload), &raw);
			if self.state.model.is_none() {
				self.state.model = adapter.get_model(&payload);
			}
			if adapter.has_function_call_finish_reason(&payload) {
				self.state.is_function_calling = true;
			}
		}
		if adapter.is_stream_completed(&chunk) {
			self.state.is_completed = true;
		}
		self.state.append(chunk);
	}

	fn min_length_met(&self) -> bool {
		let views = self.state.content_view();
		!views.is_empty() && views.iter().all(|v| v.content.len() >= self.config.min_segment_length)
	}

	/// Forward-walk the fifo accumulating `choice`'s content length until it
	/// reaches or passes `end_pos`; returns the index of the chunk whose
	/// content span straddles that position and the offset of `end_pos`
	/// within that chunk's own content. Equivalent to, and simpler than,
	/// walking the fifo from the tail accumulating a "bytes from end"
	/// distance — both locate the same chunk, and a forward cumulative sum
	/// avoids a second subtraction step.
	fn locate_straddle_chunk(&self, choice: usize, end_pos: usize) -> Option<(usize, usize)> {
		let mut cumulative = 0usize;
		for (idx, chunk) in self.state.fifo.iter().enumerate() {
			let clen = chunk.content_len(choice);
			if cumulative + clen >= end_pos {
				return Some((idx, end_pos - cumulative));
			}
			cumulative += clen;
		}
		None
	}

	/// Move the first `local_end` bytes of `choice`'s content in chunk
	/// `straddle_idx` into the previous chunk, leaving the remainder in
	/// place. Both chunks' `raw`/`payload` are re-derived so the split is
	/// invisible to anything reading the SSE stream except for the new
	/// chunk boundary.
	fn split_chunk_at(
		&mut self,
		adapter: &dyn ProviderAdapter,
		choice: usize,
		straddle_idx: usize,
		local_end: usize,
	) -> Result<(), GuardrailError> {
		let full = self.state.fifo[straddle_idx]
			.contents
			.as_ref()
			.and_then(|c| c.get(choice))
			.cloned()
			.unwrap_or_default();
		let prefix = full.slice(0..local_end.min(full.len()));
		let suffix = full.slice(local_end.min(full.len())..);

		{
			let prev = &self.state.fifo[straddle_idx - 1];
			if let (Some(payload), Some(contents)) = (prev.payload.clone(), prev.contents.clone()) {
				let mut merged = contents.get(choice).cloned().unwrap_or_default().to_vec();
				merged.extend_from_slice(&prefix);
				let new_payload = adapter.update_contents(&payload, choice, &merged);
				let new_raw = sse::rewrite_raw(&prev.raw, &new_payload)?;
				let mut new_contents = contents;
				if choice < new_contents.len() {
					new_contents[choice] = Bytes::from(merged);
				}
				let prev = &mut self.state.fifo[straddle_idx - 1];
				prev.payload = Some(new_payload);
				prev.raw = new_raw;
				prev.contents = Some(new_contents);
			}
		}
		{
			let straddle = &self.state.fifo[straddle_idx];
			if let (Some(payload), Some(contents)) = (straddle.payload.clone(), straddle.contents.clone()) {
				let new_payload = adapter.update_contents(&payload, choice, &suffix);
				let new_raw = sse::rewrite_raw(&straddle.raw, &new_payload)?;
				let mut new_contents = contents;
				if choice < new_contents.len() {
					new_contents[choice] = suffix;
				}
				let straddle = &mut self.state.fifo[straddle_idx];
				straddle.payload = Some(new_payload);
				straddle.raw = new_raw;
				straddle.contents = Some(new_contents);
			}
		}
		self.state.reconstruct();
		Ok(())
	}

	/// At least two content-bearing chunks must be buffered before alignment
	/// is worth attempting — with only one, there's no earlier chunk to move
	/// a split prefix into anyway.
	fn has_min_chunks_with_content(&self, min: usize) -> bool {
		self.state
			.fifo
			.iter()
			.filter(|c| matches!(c.kind, ChunkKind::NormalText | ChunkKind::Finish))
			.count()
			>= min
	}

	/// Find the latest segment boundary in every choice's reconstructed
	/// content and decide how many buffered chunks can be safely released.
	/// Returns `None` if any choice currently has no boundary match (§4.5
	/// "policy when some choice has no match": wait for more data), if fewer
	/// than two content-bearing chunks are buffered yet, or if the matched
	/// boundary itself falls before `min_segment_length` (a short segment
	/// isn't worth flushing even though the total buffered content already
	/// cleared the threshold).
	fn align_contents_for_guardrail(
		&mut self,
		adapter: &dyn ProviderAdapter,
	) -> Result<Option<(usize, Vec<String>)>, GuardrailError> {
		if !self.has_min_chunks_with_content(2) {
			return Ok(None);
		}

		let views = self.state.content_view();
		let choice_count = views.len();
		if choice_count == 0 {
			return Ok(None);
		}

		let mut matches = Vec::with_capacity(choice_count);
		for (i, view) in views.iter().enumerate() {
			match find_segment_boundary(i, &view.content, &self.config.boundary_regex) {
				Some(m) if m.end_pos >= self.config.min_segment_length => matches.push(m),
				_ => return Ok(None),
			}
		}

		if choice_count == 1 {
			let end_pos = matches[0].end_pos;
			let guard_content = views[0].content[..end_pos].to_string();
			let Some((straddle_idx, local_end)) = self.locate_straddle_chunk(0, end_pos) else {
				return Ok(None);
			};
			let pop_count = if straddle_idx == 0 {
				if local_end == 0 {
					return Ok(None);
				}
				// No previous chunk exists to absorb the prefix into. Fall
				// back to releasing the whole straddle chunk rather than
				// stalling the stream; this over-includes a little trailing
				// content past the boundary, a known limitation (DESIGN.md).
				1
			} else if local_end == 0 {
				straddle_idx
			} else if local_end == self.state.fifo[straddle_idx].content_len(0) {
				// The boundary falls exactly at the end of the straddle
				// chunk's content: it's already a clean chunk boundary, so it
				// becomes the last chunk in the emitted prefix with no split
				// and no rewrite of either chunk's raw bytes.
				straddle_idx + 1
			} else {
				self.split_chunk_at(adapter, 0, straddle_idx, local_end)?;
				straddle_idx
			};
			return Ok(Some((pop_count, vec![guard_content])));
		}

		// Multi-choice: per the specification's own guidance to implement the
		// single-choice case first rather than guess at the TODO'd original
		// behavior, this computes each choice's straddle point read-only (no
		// splitting) and releases only as far as the earliest one allows.
		let mut pop_counts = Vec::with_capacity(choice_count);
		for (i, m) in matches.iter().enumerate() {
			match self.locate_straddle_chunk(i, m.end_pos) {
				Some((straddle_idx, _)) if straddle_idx > 0 => pop_counts.push(straddle_idx),
				Some(_) => return Ok(None),
				None => return Ok(None),
			}
		}
		let k = *pop_counts.iter().min().unwrap();
		warn!(
			choices = choice_count,
			pop_count = k,
			"multi-choice alignment releases only the minimum boundary-aligned prefix common to all choices"
		);
		let guard_contents = (0..choice_count)
			.map(|i| {
				let take: usize = self.state.fifo.iter().take(k).map(|c| c.content_len(i)).sum();
				views[i].content[..take.min(views[i].content.len())].to_string()
			})
			.collect();
		Ok(Some((k, guard_contents)))
	}

	/// Run every configured guard over the full buffer and release
	/// everything, regardless of `min_segment_length` (§4.5 "final flush on
	/// end_of_stream").
	async fn final_flush(&mut self, adapter: &dyn ProviderAdapter) -> Result<Option<Bytes>, GuardrailError> {
		let k = self.state.fifo.len();
		if k == 0 {
			return Ok(Some(Bytes::new()));
		}
		if self.state.choice_count() == 0 {
			return Ok(Some(self.state.pop_all()));
		}
		let guard_contents: Vec<String> = self.state.content_view().into_iter().map(|v| v.content).collect();
		let out = self.collapse_and_emit(adapter, k, guard_contents).await?;
		Ok(Some(out))
	}

	/// Run the webhook then regex guards over `guard_contents`; if either
	/// modified anything, rewrite the boundary-aligned prefix into a single
	/// head chunk and release it plus any trailing Done/FinishNoContent/
	/// Invalid chunks verbatim (§4.5 "Collapse on modification"). If nothing
	/// was modified, the original bytes are released untouched.
	async fn collapse_and_emit(
		&mut self,
		adapter: &dyn ProviderAdapter,
		k: usize,
		mut guard_contents: Vec<String>,
	) -> Result<Bytes, GuardrailError> {
		if k == 0 {
			return Ok(Bytes::new());
		}

		let mut trailer_count = 0usize;
		for idx in (0..k).rev() {
			if self.state.fifo[idx].kind.is_preserved_on_collapse() {
				trailer_count += 1;
			} else {
				break;
			}
		}
		let num_to_collapse = k - trailer_count;
		if num_to_collapse == 0 {
			return Ok(self.state.pop_n(k));
		}

		let mut modified = false;

		if let Some(webhook) = &self.config.guard.webhook {
			let (was_modified, new_contents) = call_response_webhook(&self.client, webhook, &guard_contents).await;
			if was_modified {
				match new_contents {
					Some(new_contents) if new_contents.len() == guard_contents.len() => {
						guard_contents = new_contents;
						modified = true;
					},
					Some(_) => {
						error!("webhook returned a different choice count than it was given; discarding its result");
					},
					None => {},
				}
			}
		}

		if let Some(rules) = &self.config.guard.regex {
			for content in guard_contents.iter_mut() {
				let (rewritten, was_modified) = apply_regex_rules(rules, content)?;
				if was_modified {
					modified = true;
				}
				*content = rewritten;
			}
		}

		if !modified {
			return Ok(self.state.pop_n(k));
		}

		let head_kind = self.state.fifo[num_to_collapse - 1].kind;
		if !matches!(head_kind, ChunkKind::NormalText | ChunkKind::Finish) {
			error!(
				kind = ?head_kind,
				"collapse target is not a content-bearing chunk; releasing the segment unmodified"
			);
			return Ok(self.state.pop_n(k));
		}

		let mut prompt_tokens = 0u64;
		let mut completion_tokens = 0u64;
		for idx in 0..num_to_collapse {
			if let Some(payload) = &self.state.fifo[idx].payload {
				let t = adapter.tokens(payload);
				// Gemini/Vertex repeat the prompt count on every frame; MAX
				// handles that without double counting. Completion tokens
				// are only ever reported once per delta, so SUM is correct
				// there (§4.5 step 5).
				prompt_tokens = prompt_tokens.max(t.prompt);
				completion_tokens += t.completion;
			}
		}

		for _ in 0..num_to_collapse - 1 {
			self.state.pop();
		}

		let head = self.state.fifo[0].clone();
		let original_raw = head.raw.clone();
		let mut payload = head.payload.clone().unwrap_or(Value::Null);
		for (i, content) in guard_contents.iter().enumerate() {
			payload = adapter.update_contents(&payload, i, content.as_bytes());
		}
		if prompt_tokens != 0 && completion_tokens != 0 {
			payload = adapter.update_usage(
				&payload,
				Tokens {
					prompt: prompt_tokens,
					completion: completion_tokens,
				},
			);
		}
		let new_raw = sse::rewrite_raw(&original_raw, &payload)?;
		let new_contents: Vec<Bytes> = guard_contents.into_iter().map(|s| Bytes::from(s.into_bytes())).collect();

		debug!(chunks_collapsed = num_to_collapse, trailer_count, "collapsed segment on modification");

		self.state.fifo[0] = Chunk {
			raw: new_raw,
			payload: Some(payload),
			contents: Some(new_contents),
			kind: head.kind,
		};
		self.state.reconstruct();

		Ok(self.state.pop_n(1 + trailer_count))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::llm::policy::{Action, Builtin, RegexRule, RegexRules};

	fn no_guard_config() -> StreamGuardConfig {
		StreamGuardConfig::new(AiProvider::OpenAi, GuardDirectionConfig::default())
	}

	fn regex_guard_config(min_segment_length: usize) -> StreamGuardConfig {
		let mut cfg = StreamGuardConfig::new(
			AiProvider::OpenAi,
			GuardDirectionConfig {
				webhook: None,
				regex: Some(RegexRules {
					action: Action::Mask,
					rules: vec![RegexRule::Builtin { builtin: Builtin::CreditCard }],
				}),
			},
		);
		cfg.min_segment_length = min_segment_length;
		cfg
	}

	fn engine(config: StreamGuardConfig) -> GuardrailEngine {
		GuardrailEngine::new(config, reqwest::Client::new())
	}

	fn sse_frame(content: &str, finish_reason: Option<&str>) -> Bytes {
		let payload = match finish_reason {
			Some(reason) => serde_json::json!({
				"id": "1", "model": "gpt-4o",
				"choices": [{"index": 0, "delta": {"content": content}, "finish_reason": reason}],
			}),
			None => serde_json::json!({
				"id": "1", "model": "gpt-4o",
				"choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}],
			}),
		};
		Bytes::from(format!("data: {}\n\n", payload))
	}

	const DONE: &str = "data: [DONE]\n\n";

	#[tokio::test]
	async fn bypasses_buffering_entirely_with_no_guards_configured() {
		let mut e = engine(no_guard_config());
		let frame = sse_frame("hello", None);
		let out = e.buffer(frame.clone(), false).await.unwrap();
		assert_eq!(out, Some(frame));
	}

	#[tokio::test]
	async fn holds_back_short_content_until_min_segment_length() {
		let mut e = engine(regex_guard_config(50));
		let out = e.buffer(sse_frame("short. ", None), false).await.unwrap();
		assert_eq!(out, None);
	}

	#[tokio::test]
	async fn final_flush_releases_everything_below_minimum() {
		let mut e = engine(regex_guard_config(50));
		e.buffer(sse_frame("short", None), false).await.unwrap();
		let out = e.buffer(Bytes::from_static(DONE.as_bytes()), true).await.unwrap().unwrap();
		assert!(out.ends_with(DONE.as_bytes()));
		assert!(String::from_utf8_lossy(&out).contains("short"));
	}

	#[tokio::test]
	async fn masks_pii_on_boundary_and_preserves_trailing_done_chunk() {
		let mut e = engine(regex_guard_config(20));
		let long_text = "My card is 4111111111111111 and that is long enough. ";
		let mut released = BytesMut::new();
		if let Some(out) = e.buffer(sse_frame(long_text, None), false).await.unwrap() {
			released.extend_from_slice(&out);
		}
		if let Some(out) = e.buffer(sse_frame("more", Some("stop")), false).await.unwrap() {
			released.extend_from_slice(&out);
		}
		let out = e
			.buffer(Bytes::from_static(DONE.as_bytes()), true)
			.await
			.unwrap()
			.unwrap();
		released.extend_from_slice(&out);

		let text = String::from_utf8_lossy(&released);
		assert!(text.contains("<CREDIT_CARD>"));
		assert!(!text.contains("4111111111111111"));
		assert!(text.ends_with(DONE));
	}

	/// The latest boundary match can end exactly at a chunk's own content
	/// boundary rather than mid-chunk. That chunk must be included in the
	/// emitted prefix untouched — no split, no rewrite of either chunk's raw
	/// bytes — rather than merged into its predecessor and left behind as an
	/// orphaned, content-empty chunk.
	#[tokio::test]
	async fn boundary_landing_exactly_at_chunk_end_needs_no_split() {
		let mut e = engine(regex_guard_config(10));
		let frame0 = sse_frame("Intro. ", None);
		let frame1 = sse_frame("Hello. ", None);

		let first = e.buffer(frame0.clone(), false).await.unwrap();
		assert_eq!(first, None, "not enough buffered content yet");

		let second = e.buffer(frame1.clone(), false).await.unwrap().unwrap();

		let mut expected = BytesMut::new();
		expected.extend_from_slice(&frame0);
		expected.extend_from_slice(&frame1);
		assert_eq!(
			second,
			expected.freeze(),
			"both chunks must be released byte-identical, with no split-induced rewrite"
		);
	}

	#[tokio::test]
	async fn unmodified_segment_is_released_byte_identical() {
		let mut e = engine(regex_guard_config(10));
		let frame = sse_frame("nothing sensitive here. ", None);
		let out = e.buffer(frame.clone(), false).await.unwrap().unwrap();
		assert_eq!(out, frame);
	}
}
