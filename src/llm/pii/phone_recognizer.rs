use phonenumber::country;
use regex::Regex;

use super::recognizer::Recognizer;
use super::recognizer_result::RecognizerResult;

/// Coarse phone-number-shaped substrings: a `+` or digit, then digits,
/// spaces, dashes, dots or parens, at least 7 digits total. This is a
/// candidate filter only — `phonenumber::parse` does the real validation.
static CANDIDATE: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
	Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\d{2,4}\)?[-.\s]?\d{3,4}[-.\s]?\d{3,4}").unwrap()
});

pub struct PhoneRecognizer {
	regions: Vec<&'static str>,
}

impl PhoneRecognizer {
	pub fn new() -> Self {
		Self {
			regions: vec!["US", "GB", "DE", "IL", "IN", "CA", "BR"],
		}
	}
}

impl Recognizer for PhoneRecognizer {
	fn recognize(&self, text: &str) -> Vec<RecognizerResult> {
		let mut results = Vec::new();
		for m in CANDIDATE.find_iter(text) {
			let candidate = m.as_str();
			for &region in &self.regions {
				let country = match region {
					"US" => country::US,
					"GB" => country::GB,
					"DE" => country::DE,
					"IL" => country::IL,
					"IN" => country::IN,
					"CA" => country::CA,
					"BR" => country::BR,
					_ => continue,
				};
				if let Ok(number) = phonenumber::parse(Some(country), candidate) {
					if number.is_valid() {
						results.push(RecognizerResult {
							entity_type: "PHONE_NUMBER".to_string(),
							matched: candidate.to_string(),
							start: m.start(),
							end: m.end(),
							score: 0.7,
						});
						break;
					}
				}
			}
		}
		results.sort_by_key(|r| (r.start, r.end));
		results.dedup_by_key(|r| (r.start, r.end));
		results
	}

	fn name(&self) -> &str {
		"PHONE_NUMBER"
	}
}
