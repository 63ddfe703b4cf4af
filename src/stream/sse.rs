//! Byte-exact Server-Sent-Events framer (§4.2).
//!
//! The teacher's `parse::sse` module decodes frames with `tokio_sse_codec`
//! and re-encodes them with `SseEncoder`, which is fine for the gateway's
//! uses but loses the original envelope bytes (whitespace, `event:`/`id:`
//! fields, CRLF-vs-LF terminator) on every frame it touches. This
//! specification requires touching only the JSON substring of a rewritten
//! frame and leaving everything else byte-identical, so framing is
//! hand-rolled here instead of reused.

use bytes::{Bytes, BytesMut};
use serde_json::Value;
use thiserror::Error;

use crate::stream::chunk::{Chunk, ChunkKind};

pub const DONE_SENTINEL: &[u8] = b"[DONE]";

#[derive(Debug, Error)]
pub enum SseError {
	#[error("frame has no `data:` field")]
	NoDataField,
	#[error("data field did not produce valid json: {0}")]
	InvalidJson(#[from] serde_json::Error),
	#[error("rewrite target range is not within the original frame")]
	OutOfRange,
}

/// One complete SSE frame located within a byte buffer, plus the byte range
/// of its `data:` field's value (used both to parse the payload and, on
/// rewrite, to splice in a replacement).
#[derive(Debug, Clone)]
pub struct RawFrame {
	pub raw: Bytes,
	/// Byte offset, within `raw`, where the JSON/`[DONE]` value begins.
	pub value_start: usize,
	/// Byte offset, within `raw`, one past the end of the value.
	pub value_end: usize,
}

impl RawFrame {
	pub fn value(&self) -> &[u8] {
		&self.raw[self.value_start..self.value_end]
	}

	/// Locate the first `data:` field in `raw` and record its value's byte
	/// range. Tolerates an optional single leading space after the colon,
	/// per the SSE spec, and either `\n` or `\r\n` line endings.
	pub fn parse(raw: Bytes) -> Result<RawFrame, SseError> {
		let mut offset = 0usize;
		while offset < raw.len() {
			let rest = &raw[offset..];
			let line_len = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
			let mut line_end = line_len;
			if line_end > 0 && rest[line_end - 1] == b'\r' {
				line_end -= 1;
			}
			let line = &rest[..line_end];
			if let Some(value) = line.strip_prefix(b"data:") {
				let mut value_start = offset + 5;
				let value = if let Some(v) = value.strip_prefix(b" ") {
					value_start += 1;
					v
				} else {
					value
				};
				let value_end = value_start + value.len();
				return Ok(RawFrame {
					raw,
					value_start,
					value_end,
				});
			}
			offset += line_len + 1;
		}
		Err(SseError::NoDataField)
	}

	/// Produce a new frame with the same envelope bytes but `new_value`
	/// substituted for the old `data:` field's value.
	pub fn with_value(&self, new_value: &[u8]) -> Result<Bytes, SseError> {
		if self.value_end > self.raw.len() || self.value_start > self.value_end {
			return Err(SseError::OutOfRange);
		}
		let mut out = BytesMut::with_capacity(self.raw.len() - (self.value_end - self.value_start) + new_value.len());
		out.extend_from_slice(&self.raw[..self.value_start]);
		out.extend_from_slice(new_value);
		out.extend_from_slice(&self.raw[self.value_end..]);
		Ok(out.freeze())
	}
}

/// Split `buf` into complete SSE frames (terminated by a blank line, either
/// `\n\n` or `\r\n\r\n`) and a leftover suffix that does not yet form a
/// complete frame. Each returned frame retains its original bytes verbatim,
/// including the terminator; `leftover` is a strict suffix of `buf`.
pub fn split_frames(buf: &Bytes) -> (Vec<Bytes>, Bytes) {
	let mut frames = Vec::new();
	let mut start = 0usize;
	let data = buf.as_ref();
	let mut i = 0usize;
	while i + 1 < data.len() {
		let terminator_len = if data[i] == b'\n' && data[i + 1] == b'\n' {
			Some(2)
		} else if i + 3 < data.len()
			&& data[i] == b'\r'
			&& data[i + 1] == b'\n'
			&& data[i + 2] == b'\r'
			&& data[i + 3] == b'\n'
		{
			Some(4)
		} else {
			None
		};
		if let Some(term) = terminator_len {
			let end = i + term;
			frames.push(buf.slice(start..end));
			start = end;
			i = end;
			continue;
		}
		i += 1;
	}
	(frames, buf.slice(start..))
}

/// Parse a raw SSE frame into a `Chunk` with `payload` absent and
/// `kind = Done` for the `[DONE]` sentinel, and a parsed JSON payload
/// otherwise. Parse failures become `kind = Invalid` rather than an error,
/// matching the engine's "never wedge the stream on a parse failure" rule
/// (§7).
pub fn parse_chunk(raw: Bytes) -> Chunk {
	let frame = match RawFrame::parse(raw.clone()) {
		Ok(f) => f,
		Err(_) => return Chunk::invalid(raw),
	};
	if frame.value() == DONE_SENTINEL {
		return Chunk::done(raw);
	}
	match serde_json::from_slice::<Value>(frame.value()) {
		Ok(payload) => Chunk {
			raw,
			payload: Some(payload),
			contents: None,
			kind: ChunkKind::Invalid, // classifier fills this in once content is extracted
		},
		Err(_) => Chunk::invalid(raw),
	}
}

/// Re-canonicalize `raw` for a chunk whose `payload` has been rewritten:
/// locate the original frame's `data:` value range and splice in the new
/// payload's JSON serialization, preserving every other byte.
pub fn rewrite_raw(original_raw: &Bytes, new_payload: &Value) -> Result<Bytes, SseError> {
	let frame = RawFrame::parse(original_raw.clone())?;
	let new_json = serde_json::to_vec(new_payload)?;
	frame.with_value(&new_json)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_lf_terminated_frames() {
		let buf = Bytes::from_static(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n\n");
		let (frames, leftover) = split_frames(&buf);
		assert_eq!(frames.len(), 2);
		assert_eq!(frames[0], Bytes::from_static(b"data: {\"a\":1}\n\n"));
		assert_eq!(frames[1], Bytes::from_static(b"data: {\"a\":2}\n\n"));
		assert!(leftover.is_empty());
	}

	#[test]
	fn leaves_incomplete_frame_as_leftover() {
		let buf = Bytes::from_static(b"data: {\"a\":1}\n\ndata: {\"a\":2}");
		let (frames, leftover) = split_frames(&buf);
		assert_eq!(frames.len(), 1);
		assert_eq!(leftover, Bytes::from_static(b"data: {\"a\":2}"));
	}

	#[test]
	fn handles_crlf_terminator() {
		let buf = Bytes::from_static(b"data: {\"a\":1}\r\n\r\n");
		let (frames, leftover) = split_frames(&buf);
		assert_eq!(frames.len(), 1);
		assert!(leftover.is_empty());
	}

	#[test]
	fn done_sentinel_has_no_payload() {
		let raw = Bytes::from_static(b"data: [DONE]\n\n");
		let chunk = parse_chunk(raw);
		assert_eq!(chunk.kind, ChunkKind::Done);
		assert!(chunk.payload.is_none());
	}

	#[test]
	fn rewrite_preserves_envelope() {
		let raw = Bytes::from_static(b"event: message\ndata: {\"a\":1,\"b\":2}\n\n");
		let frame = RawFrame::parse(raw.clone()).unwrap();
		let rewritten = frame.with_value(b"{\"a\":9,\"b\":2}").unwrap();
		assert_eq!(
			rewritten,
			Bytes::from_static(b"event: message\ndata: {\"a\":9,\"b\":2}\n\n")
		);
	}
}
