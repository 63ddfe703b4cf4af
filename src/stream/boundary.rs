use once_cell::sync::Lazy;
use regex::Regex;

/// Default segment-boundary pattern (§4.5): one of `.?!;` followed by one
/// or more spaces and optional trailing newlines, or one or more newlines
/// on their own. Comma is deliberately excluded.
pub const DEFAULT_BOUNDARY_PATTERN: &str = r"([.?!;] +\n*|\n+)";

static DEFAULT_BOUNDARY_REGEX: Lazy<Regex> =
	Lazy::new(|| Regex::new(DEFAULT_BOUNDARY_PATTERN).expect("default boundary pattern is valid"));

pub fn default_boundary_regex() -> Regex {
	DEFAULT_BOUNDARY_REGEX.clone()
}

/// Snapshot of one choice's reconstructed content passed to the guardrail
/// engine (§3 ContentView). `begin_index`/`end_index` are chunk indices
/// into the stream's fifo at the time the view was taken.
#[derive(Debug, Clone)]
pub struct ContentView {
	pub content: String,
	pub begin_index: usize,
	pub end_index: usize,
}

/// The latest sentence-boundary match found inside a `ContentView` (§3).
///
/// `start_pos`/`end_pos` are byte offsets into `content`. The original
/// system indexes by UTF-8 code point (Python strings) and converts to
/// byte offsets before walking the chunk fifo; `regex` on a Rust `&str`
/// already reports match positions as byte offsets landing on code-point
/// boundaries, so that conversion step has no work left to do here — noted
/// in DESIGN.md as a resolved simplification, not a dropped feature.
#[derive(Debug, Clone)]
pub struct BoundaryMatch {
	pub choice_index: usize,
	pub capture: String,
	pub start_pos: usize,
	pub end_pos: usize,
}

/// Find the *latest* match of `re` in `content`. Returns `None` if there is
/// no match, in which case the engine must wait for more content (§4.5
/// "Policy when some choice has no match").
pub fn find_segment_boundary(choice_index: usize, content: &str, re: &Regex) -> Option<BoundaryMatch> {
	re.find_iter(content).last().map(|m| BoundaryMatch {
		choice_index,
		capture: m.as_str().to_string(),
		start_pos: m.start(),
		end_pos: m.end(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn finds_latest_of_several_matches() {
		let re = default_boundary_regex();
		let content = "First sentence. Second sentence. Third";
		let m = find_segment_boundary(0, content, &re).unwrap();
		assert_eq!(m.capture, ". ");
		assert_eq!(&content[m.start_pos..m.end_pos], ". ");
		// it should be the *second* occurrence, not the first
		assert!(m.start_pos > content.find(". ").unwrap());
	}

	#[test]
	fn no_match_returns_none() {
		let re = default_boundary_regex();
		assert!(find_segment_boundary(0, "no boundary here", &re).is_none());
	}

	#[test]
	fn newline_alone_matches() {
		let re = default_boundary_regex();
		let m = find_segment_boundary(0, "line one\nline two", &re).unwrap();
		assert_eq!(m.capture, "\n");
	}
}
