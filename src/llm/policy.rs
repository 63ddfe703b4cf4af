//! Prompt-guard policy configuration and the request-direction guard
//! (§11 "Supplemented features"). Grounded in the teacher's
//! `llm::policy::Policy`/`PromptGuard` and the original
//! `api/kgateway/policy/ai/prompt_guard.py` dataclasses — `CustomResponse`,
//! `Regex`/`RegexMatch`, `BuiltIn`, `Action`, `Webhook`.
//!
//! The response-direction guard itself (the streaming engine) lives in
//! [`crate::stream::engine`]; this module owns the shared configuration
//! shapes and the regex-rule evaluation both directions use, plus the
//! symmetric but simpler request guard and the single-shot non-streaming
//! response guard.

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::debug;

use crate::llm::pii::{self, RegexRejection, RuleAction};
use crate::llm::webhook::WebhookConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Builtin {
	Ssn,
	CreditCard,
	PhoneNumber,
	Email,
}

impl Builtin {
	fn recognizer(self) -> &'static (dyn pii::Recognizer + Sync + Send) {
		match self {
			Builtin::Ssn => pii::SSN.deref(),
			Builtin::CreditCard => pii::CC.deref(),
			Builtin::PhoneNumber => pii::PHONE.deref(),
			Builtin::Email => pii::EMAIL.deref(),
		}
	}

	fn label(self) -> &'static str {
		match self {
			Builtin::Ssn => "ssn",
			Builtin::CreditCard => "credit_card",
			Builtin::PhoneNumber => "phone_number",
			Builtin::Email => "email",
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegexRule {
	Builtin {
		builtin: Builtin,
	},
	Regex {
		#[serde(with = "serde_regex")]
		pattern: regex::Regex,
		name: String,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomResponse {
	#[serde(default = "default_reject_message")]
	pub message: String,
	#[serde(default = "default_reject_status")]
	pub status_code: u16,
}

fn default_reject_message() -> String {
	"The request was rejected due to inappropriate content".to_string()
}

fn default_reject_status() -> u16 {
	403
}

impl Default for CustomResponse {
	fn default() -> Self {
		CustomResponse {
			message: default_reject_message(),
			status_code: default_reject_status(),
		}
	}
}

impl CustomResponse {
	pub fn as_response(&self) -> http::Response<Bytes> {
		http::Response::builder()
			.status(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::FORBIDDEN))
			.body(Bytes::copy_from_slice(self.message.as_bytes()))
			.expect("status/body are always valid")
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	Mask,
	Reject {
		#[serde(default)]
		response: CustomResponse,
	},
}

impl Default for Action {
	fn default() -> Self {
		Action::Mask
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegexRules {
	#[serde(default)]
	pub action: Action,
	pub rules: Vec<RegexRule>,
}

/// Evaluate `rules` against `content` in order. On the first rule that
/// matches: MASK rewrites and keeps going (a later rule sees the masked
/// text), REJECT stops immediately and returns the rejection.
pub fn apply_regex_rules(rules: &RegexRules, content: &str) -> Result<(String, bool), RegexRejection> {
	let mut current = content.to_string();
	let mut modified = false;
	for rule in &rules.rules {
		let (label, result) = match rule {
			RegexRule::Builtin { builtin } => {
				let action = match &rules.action {
					Action::Mask => RuleAction::Mask,
					Action::Reject { .. } => RuleAction::Reject,
				};
				(builtin.label(), pii::regex_transform(builtin.label(), &current, builtin.recognizer(), action))
			},
			RegexRule::Regex { pattern, name } => {
				if let Some(m) = pattern.find(&current) {
					match &rules.action {
						Action::Mask => {
							let mut next = current.clone();
							next.replace_range(m.range(), &format!("<{name}>"));
							(name.as_str(), Ok((next, true)))
						},
						Action::Reject { .. } => (
							name.as_str(),
							Err(RegexRejection {
								rule: name.clone(),
								entity_type: name.clone(),
								matched: m.as_str().to_string(),
							}),
						),
					}
				} else {
					(name.as_str(), Ok((current.clone(), false)))
				}
			},
		};
		let (next, was_modified) = result?;
		if was_modified {
			debug!(rule = label, "regex rule modified content");
			modified = true;
		}
		current = next;
	}
	Ok((current, modified))
}

/// Per-direction regex + webhook configuration (§6 "Configuration
/// (per-stream)").
#[derive(Debug, Clone, Default)]
pub struct GuardDirectionConfig {
	pub webhook: Option<WebhookConfig>,
	pub regex: Option<RegexRules>,
}

/// Request-direction guard (§11): symmetric to the response streaming
/// engine but single-shot, since the whole request body is already
/// buffered by the time a policy runs. Grounded in the teacher's
/// `Policy::apply`.
pub struct RequestGuard<'a> {
	pub config: &'a GuardDirectionConfig,
}

#[derive(Debug)]
pub enum RequestGuardOutcome {
	Pass,
	Masked(Vec<String>),
	Rejected(http::Response<Bytes>),
}

impl<'a> RequestGuard<'a> {
	pub async fn apply(
		&self,
		client: &reqwest::Client,
		messages: &[String],
	) -> anyhow::Result<RequestGuardOutcome> {
		let mut current: Vec<String> = messages.to_vec();
		let mut any_modified = false;

		if let Some(webhook) = &self.config.webhook {
			let (modified, new_contents) = crate::llm::webhook::call_response_webhook(client, webhook, &current).await;
			if modified {
				if let Some(new_contents) = new_contents {
					if new_contents.len() == current.len() {
						current = new_contents;
						any_modified = true;
					}
				}
			}
		}

		if let Some(rules) = &self.config.regex {
			for msg in current.iter_mut() {
				match apply_regex_rules(rules, msg) {
					Ok((rewritten, modified)) => {
						if modified {
							any_modified = true;
						}
						*msg = rewritten;
					},
					Err(rejection) => {
						let response = match &rules.action {
							Action::Reject { response } => response.as_response(),
							Action::Mask => CustomResponse::default().as_response(),
						};
						debug!(rule = %rejection.rule, "request rejected by regex rule");
						return Ok(RequestGuardOutcome::Rejected(response));
					},
				}
			}
		}

		if any_modified {
			Ok(RequestGuardOutcome::Masked(current))
		} else {
			Ok(RequestGuardOutcome::Pass)
		}
	}
}

/// Non-streaming response guard (§11): single-shot counterpart of the
/// streaming engine for providers/endpoints that return the whole
/// completion body at once. Buffers nothing beyond what's already
/// buffered, runs both guards once, rewrites once.
pub async fn guard_non_streaming_response(
	client: &reqwest::Client,
	config: &GuardDirectionConfig,
	contents: Vec<String>,
) -> Result<(Vec<String>, bool), RegexRejection> {
	let mut current = contents;
	let mut any_modified = false;

	if let Some(webhook) = &config.webhook {
		let (modified, new_contents) = crate::llm::webhook::call_response_webhook(client, webhook, &current).await;
		if modified {
			if let Some(new_contents) = new_contents {
				if new_contents.len() == current.len() {
					current = new_contents;
					any_modified = true;
				}
			}
		}
	}

	if let Some(rules) = &config.regex {
		for content in current.iter_mut() {
			let (rewritten, modified) = apply_regex_rules(rules, content)?;
			if modified {
				any_modified = true;
			}
			*content = rewritten;
		}
	}

	Ok((current, any_modified))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mask_action_rewrites_and_continues() {
		let rules = RegexRules {
			action: Action::Mask,
			rules: vec![RegexRule::Builtin { builtin: Builtin::Email }],
		};
		let (out, modified) = apply_regex_rules(&rules, "email me at a@b.com now").unwrap();
		assert!(modified);
		assert_eq!(out, "email me at <EMAIL_ADDRESS> now");
	}

	#[test]
	fn reject_action_short_circuits() {
		let rules = RegexRules {
			action: Action::Reject {
				response: CustomResponse::default(),
			},
			rules: vec![RegexRule::Builtin { builtin: Builtin::Ssn }],
		};
		let err = apply_regex_rules(&rules, "ssn 123-45-6789").unwrap_err();
		assert_eq!(err.rule, "ssn");
	}

	#[test]
	fn custom_regex_rule_masks_with_name() {
		let rules = RegexRules {
			action: Action::Mask,
			rules: vec![RegexRule::Regex {
				pattern: regex::Regex::new(r"secret-\d+").unwrap(),
				name: "INTERNAL_ID".to_string(),
			}],
		};
		let (out, modified) = apply_regex_rules(&rules, "id is secret-42 here").unwrap();
		assert!(modified);
		assert_eq!(out, "id is <INTERNAL_ID> here");
	}
}
