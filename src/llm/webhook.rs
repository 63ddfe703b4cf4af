//! Response-direction moderation webhook client (§4.6 collaborator
//! interface). Grounded in the teacher's `llm::policy::webhook` module,
//! trimmed to the response side and built directly over `reqwest` rather
//! than the teacher's internal `client::Client` (which carries xDS-derived
//! target resolution this crate does not have).

use serde::{Deserialize, Serialize};
use tracing::{error, info_span, Instrument};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Message {
	pub role: String,
	pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResponseChoice {
	pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResponseChoices {
	pub choices: Vec<ResponseChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct GuardrailsResponseRequest {
	body: ResponseChoices,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct GuardrailsResponseResponse {
	action: ResponseAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct PassAction {
	#[serde(skip_serializing_if = "Option::is_none")]
	reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct MaskAction {
	body: ResponseChoices,
	#[serde(skip_serializing_if = "Option::is_none")]
	reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, rename_all = "snake_case")]
enum ResponseAction {
	Mask(MaskAction),
	Pass(PassAction),
}

/// Config for a single response webhook target (§6 `response_webhook`).
#[derive(Debug, Clone)]
pub struct WebhookConfig {
	pub url: String,
	pub forward_headers: Vec<(String, String)>,
}

/// `call_response_webhook` from the collaborator interface (§4.6).
/// Transport or shape errors are logged and treated as a no-op — the
/// stream keeps flowing with regex guards (if any) still applied.
pub async fn call_response_webhook(
	client: &reqwest::Client,
	config: &WebhookConfig,
	contents: &[String],
) -> (bool, Option<Vec<String>>) {
	let span = info_span!("webhook");
	async move {
		let body = GuardrailsResponseRequest {
			body: ResponseChoices {
				choices: contents
					.iter()
					.map(|c| ResponseChoice {
						message: Message {
							role: "assistant".to_string(),
							content: c.clone(),
						},
					})
					.collect(),
			},
		};
		let mut req = client.post(&config.url).json(&body);
		for (k, v) in &config.forward_headers {
			req = req.header(k, v);
		}
		let result: anyhow::Result<GuardrailsResponseResponse> = async {
			let res = req.send().await?;
			let parsed = res.json::<GuardrailsResponseResponse>().await?;
			Ok(parsed)
		}
		.await;
		match result {
			Ok(GuardrailsResponseResponse {
				action: ResponseAction::Mask(mask),
			}) => {
				if mask.body.choices.len() != contents.len() {
					error!(
						expected = contents.len(),
						got = mask.body.choices.len(),
						"webhook returned wrong choice count; discarding result"
					);
					return (false, None);
				}
				let new_contents = mask.body.choices.into_iter().map(|c| c.message.content).collect();
				(true, Some(new_contents))
			},
			Ok(GuardrailsResponseResponse {
				action: ResponseAction::Pass(_),
			}) => (false, None),
			Err(err) => {
				error!(error = %err, "response webhook call failed; treating as no-op");
				(false, None)
			},
		}
	}
	.instrument(span)
	.await
}
