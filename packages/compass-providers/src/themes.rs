use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

const THEMES_INSTRUCTIONS: &str = "\
You will receive a set of personal career notes. Identify the main learning topics they suggest \
and reply with a comma-separated list of short topic keywords, nothing else.";

/// Derives search keywords from note text via the themes LLM. Note text, not
/// embedding values, is what the prompt carries; the numbers mean nothing to
/// a language model.
pub async fn derive_themes(
	cfg: &compass_config::LlmProviderConfig,
	notes_text: &[String],
	max_themes: usize,
) -> Result<Vec<String>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let messages = serde_json::json!([
		{ "role": "system", "content": THEMES_INSTRUCTIONS },
		{ "role": "user", "content": notes_text.join("\n\n") },
	]);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});

	if let Some(max_tokens) = cfg.max_tokens {
		body["max_tokens"] = Value::from(max_tokens);
	}

	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_themes_response(json, max_themes)
}

fn parse_themes_response(json: Value, max_themes: usize) -> Result<Vec<String>> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| eyre::eyre!("Themes response is missing message content."))?;
	let themes = content
		.split(',')
		.map(str::trim)
		.filter(|theme| !theme.is_empty())
		.take(max_themes)
		.map(str::to_string)
		.collect();

	Ok(themes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_and_caps_themes() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "rust, databases , web apis, devops, ml, extra" } }
			]
		});
		let themes = parse_themes_response(json, 5).expect("parse failed");

		assert_eq!(themes, vec!["rust", "databases", "web apis", "devops", "ml"]);
	}

	#[test]
	fn drops_empty_segments() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "rust,,  ,sql" } }]
		});
		let themes = parse_themes_response(json, 5).expect("parse failed");

		assert_eq!(themes, vec!["rust", "sql"]);
	}

	#[test]
	fn missing_content_is_an_error() {
		let json = serde_json::json!({ "choices": [] });

		assert!(parse_themes_response(json, 5).is_err());
	}
}
