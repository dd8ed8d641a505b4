use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// One chat-completions round trip. Used for answer synthesis and the
/// intent-classifier fallback; the system prompt is the caller's only lever
/// for constraining the model.
pub async fn complete(
	cfg: &recall_config::LlmProviderConfig,
	system: &str,
	user: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
		"messages": [
			{ "role": "system", "content": system },
			{ "role": "user", "content": user },
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.provider, &cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let status = res.status();

	if !status.is_success() {
		let body = res.text().await.unwrap_or_default();

		return Err(Error::Status { status: status.as_u16(), body });
	}

	let json: Value = res.json().await?;

	parse_chat_response(json)
}

fn parse_chat_response(json: Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(|v| v.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat response is missing message content.".to_string(),
		})?;

	Ok(content.trim().to_string())
}
