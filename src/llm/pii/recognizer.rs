use super::recognizer_result::RecognizerResult;

/// A single entity detector. Implementations are stateless and safe to share
/// across requests; each call to `recognize` is independent.
pub trait Recognizer {
	fn recognize(&self, text: &str) -> Vec<RecognizerResult>;
	fn name(&self) -> &str;
}
