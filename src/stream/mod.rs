pub mod boundary;
pub mod buffer;
pub mod chunk;
pub mod engine;
pub mod sse;

pub use boundary::BoundaryMatch;
pub use buffer::StreamState;
pub use chunk::{Chunk, ChunkKind};

/// Prompt/completion token counts harvested from a provider payload (§4.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tokens {
	pub prompt: u64,
	pub completion: u64,
}
