//! Built-in regex-based PII recognizers and the anonymizer used by the
//! response guardrail (§4.6 collaborator interface: `regex_transform`).
//!
//! The upstream system this crate mirrors delegates entity recognition to
//! Microsoft's `presidio-analyzer`/`presidio-anonymizer`. No published Rust
//! crate fills that role, so — as our teacher already does for this same
//! gap — recognizers are implemented directly as small pattern matchers.

mod credit_card_recognizer;
mod email_recognizer;
mod pattern_recognizer;
mod phone_recognizer;
mod recognizer;
mod recognizer_result;
mod us_ssn_recognizer;

use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

pub use recognizer::Recognizer;
pub use recognizer_result::RecognizerResult;

use email_recognizer::EmailRecognizer;
use phone_recognizer::PhoneRecognizer;

pub static EMAIL: Lazy<Box<dyn Recognizer + Sync + Send + 'static>> =
	Lazy::new(|| Box::new(EmailRecognizer::new()));

pub static PHONE: Lazy<Box<dyn Recognizer + Sync + Send + 'static>> =
	Lazy::new(|| Box::new(PhoneRecognizer::new()));

pub static CC: Lazy<Box<dyn Recognizer + Sync + Send + 'static>> =
	Lazy::new(|| Box::new(credit_card_recognizer::CreditCardRecognizer::new()));

pub static SSN: Lazy<Box<dyn Recognizer + Sync + Send + 'static>> =
	Lazy::new(|| Box::new(us_ssn_recognizer::UsSsnRecognizer::new()));

/// A regex guard rejected the content outright (the `REJECT` action).
#[derive(Debug, Error)]
#[error("content rejected by regex rule {rule}: matched {entity_type}")]
pub struct RegexRejection {
	pub rule: String,
	pub entity_type: String,
	pub matched: String,
}

/// What a single built-in/custom rule should do when it finds a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
	Mask,
	Reject,
}

/// Run one recognizer over `content` and either mask or reject matches,
/// depending on `action`. Returns the (possibly rewritten) content and
/// whether anything was changed.
///
/// This is `regex_transform` from the collaborator interface: `label` names
/// the rule for logging/rejection messages, `recognizer` is the entity
/// detector, and masking replaces each match span with `<ENTITY_TYPE>`,
/// highest-scoring non-overlapping matches first.
pub fn regex_transform(
	label: &str,
	content: &str,
	recognizer: &(dyn Recognizer + Sync + Send),
	action: RuleAction,
) -> Result<(String, bool), RegexRejection> {
	let mut results = recognizer.recognize(content);
	if results.is_empty() {
		return Ok((content.to_string(), false));
	}
	if action == RuleAction::Reject {
		let first = results.remove(0);
		return Err(RegexRejection {
			rule: label.to_string(),
			entity_type: first.entity_type,
			matched: first.matched,
		});
	}
	// Highest score first so overlapping weaker matches lose; then sort by
	// start descending so we can replace in place without invalidating
	// earlier byte offsets.
	results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
	let mut claimed: Vec<(usize, usize)> = Vec::new();
	let mut accepted: Vec<&RecognizerResult> = Vec::new();
	for r in &results {
		if claimed
			.iter()
			.any(|&(s, e)| r.start < e && s < r.end)
		{
			continue;
		}
		claimed.push((r.start, r.end));
		accepted.push(r);
	}
	if accepted.is_empty() {
		return Ok((content.to_string(), false));
	}
	accepted.sort_by_key(|r| std::cmp::Reverse(r.start));
	let mut out = content.to_string();
	for r in &accepted {
		debug!(entity = %r.entity_type, rule = label, "masking PII match");
		out.replace_range(r.start..r.end, &format!("<{}>", r.entity_type));
	}
	Ok((out, true))
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
