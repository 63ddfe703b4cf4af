//! Per-stream guardrail configuration (§6 "Configuration (per-stream)").
//! Grounded in the teacher's `config::parse_config` (file loading) and
//! `llm::policy`'s `schema!`-derived structs (a plain `serde` struct per
//! configuration concern, `deny_unknown_fields`, `camelCase` on the wire).
//!
//! The teacher transcodes YAML through JSON (`serdes::yamlviajson`) to
//! avoid `serde_yaml`'s looser typing of untagged enums and numbers; this
//! crate's configuration shape has no untagged enums deep enough for that
//! to matter, so `serde_yaml` is used directly — a deliberate simplification
//! noted in DESIGN.md, not a dropped dependency.

use std::path::PathBuf;

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::llm::policy::{GuardDirectionConfig, RegexRules};
use crate::llm::webhook::WebhookConfig;
use crate::llm::AiProvider;
use crate::stream::engine::StreamGuardConfig;

/// Where the YAML/JSON configuration document comes from. The specification
/// excludes bootstrapping a live Kubernetes client (§1 Non-goals), so this
/// crate only ships the file-backed implementation; a ConfigMap/CRD-backed
/// source would implement the same trait.
pub trait ConfigSource: Send + Sync {
	fn load(&self) -> anyhow::Result<String>;
}

pub struct FileConfigSource {
	pub path: PathBuf,
}

impl ConfigSource for FileConfigSource {
	fn load(&self) -> anyhow::Result<String> {
		std::fs::read_to_string(&self.path).with_context(|| format!("reading config file {}", self.path.display()))
	}
}

pub struct StaticConfigSource(pub String);

impl ConfigSource for StaticConfigSource {
	fn load(&self) -> anyhow::Result<String> {
		Ok(self.0.clone())
	}
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
	Openai,
	AzureOpenai,
	Anthropic,
	Gemini,
	Vertex,
	Mistral,
}

impl From<ProviderKind> for AiProvider {
	fn from(p: ProviderKind) -> Self {
		match p {
			ProviderKind::Openai => AiProvider::OpenAi,
			ProviderKind::AzureOpenai => AiProvider::AzureOpenAi,
			ProviderKind::Anthropic => AiProvider::Anthropic,
			ProviderKind::Gemini => AiProvider::Gemini,
			ProviderKind::Vertex => AiProvider::Vertex,
			ProviderKind::Mistral => AiProvider::Mistral,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawWebhookConfig {
	pub url: String,
	#[serde(default)]
	pub forward_headers: IndexMap<String, String>,
}

impl From<RawWebhookConfig> for WebhookConfig {
	fn from(raw: RawWebhookConfig) -> Self {
		WebhookConfig {
			url: raw.url,
			forward_headers: raw.forward_headers.into_iter().collect(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawGuardDirectionConfig {
	pub webhook: Option<RawWebhookConfig>,
	pub regex: Option<RegexRules>,
}

impl From<RawGuardDirectionConfig> for GuardDirectionConfig {
	fn from(raw: RawGuardDirectionConfig) -> Self {
		GuardDirectionConfig {
			webhook: raw.webhook.map(WebhookConfig::from),
			regex: raw.regex,
		}
	}
}

fn default_min_segment_length() -> usize {
	50
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawPromptGuardConfig {
	pub provider: ProviderKind,
	#[serde(default = "default_min_segment_length")]
	pub min_segment_length: usize,
	#[serde(default)]
	#[serde(with = "serde_regex")]
	pub boundary_pattern: Option<regex::Regex>,
	#[serde(default)]
	pub request: Option<RawGuardDirectionConfig>,
	#[serde(default)]
	pub response: Option<RawGuardDirectionConfig>,
}

pub fn parse_config(contents: &str) -> anyhow::Result<RawPromptGuardConfig> {
	serde_yaml::from_str(contents).context("parsing prompt guard configuration")
}

/// Build the streaming response-direction engine config. Response guard
/// defaults to no-op (neither webhook nor regex) when the document omits
/// `response` entirely.
pub fn build_stream_guard_config(raw: &RawPromptGuardConfig) -> StreamGuardConfig {
	let guard = raw.response.clone().map(GuardDirectionConfig::from).unwrap_or_default();
	let mut config = StreamGuardConfig::new(raw.provider.into(), guard);
	config.min_segment_length = raw.min_segment_length;
	if let Some(pattern) = &raw.boundary_pattern {
		config.boundary_regex = pattern.clone();
	}
	config
}

pub fn build_request_guard_config(raw: &RawPromptGuardConfig) -> Option<GuardDirectionConfig> {
	raw.request.clone().map(GuardDirectionConfig::from)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_minimal_document() {
		let yaml = "provider: openai\n";
		let raw = parse_config(yaml).unwrap();
		assert_eq!(raw.min_segment_length, 50);
		assert!(raw.response.is_none());
	}

	#[test]
	fn parses_response_regex_guard() {
		let yaml = r#"
provider: gemini
minSegmentLength: 80
response:
  regex:
    action: mask
    rules:
      - builtin: creditCard
"#;
		let raw = parse_config(yaml).unwrap();
		assert_eq!(raw.min_segment_length, 80);
		let cfg = build_stream_guard_config(&raw);
		assert_eq!(cfg.min_segment_length, 80);
		assert!(cfg.guard.regex.is_some());
	}

	#[test]
	fn unknown_field_is_rejected() {
		let yaml = "provider: openai\nbogusField: true\n";
		assert!(parse_config(yaml).is_err());
	}
}
