// std
use std::time::Duration;

// crates.io
use color_eyre::{Result, eyre};
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 32;

/// Content chunks as they arrive from the upstream completion stream. The
/// channel closes after the final chunk; an upstream failure mid-stream is
/// delivered as a terminal `Err`, so consumers can tell a truncated stream
/// from a completed one.
pub type ChatStream = mpsc::Receiver<Result<String>>;

#[derive(Debug, PartialEq)]
enum StreamEvent {
	Content(String),
	Done,
	Skip,
}

pub async fn stream_chat(
	cfg: &compass_config::LlmProviderConfig,
	messages: &[Value],
) -> Result<ChatStream> {
	// The request timeout doubles as the overall stream deadline.
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"stream": true,
	});

	if let Some(max_tokens) = cfg.max_tokens {
		body["max_tokens"] = Value::from(max_tokens);
	}

	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?
		.error_for_status()?;
	let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

	tokio::spawn(async move {
		let mut stream = res.bytes_stream();
		let mut buffer = String::new();

		while let Some(chunk) = stream.next().await {
			let bytes = match chunk {
				Ok(bytes) => bytes,
				Err(err) => {
					let _ = tx.send(Err(eyre::eyre!("Chat stream failed: {err}."))).await;

					return;
				},
			};

			buffer.push_str(&String::from_utf8_lossy(&bytes));

			while let Some(line_end) = buffer.find('\n') {
				let line = buffer[..line_end].trim().to_string();
				buffer = buffer[line_end + 1..].to_string();

				match parse_stream_line(&line) {
					StreamEvent::Content(content) =>
						if tx.send(Ok(content)).await.is_err() {
							// Consumer is gone; stop pulling from upstream.
							return;
						},
					StreamEvent::Done => return,
					StreamEvent::Skip => {},
				}
			}
		}
	});

	Ok(rx)
}

fn parse_stream_line(line: &str) -> StreamEvent {
	let Some(data) = line.strip_prefix("data:").map(str::trim) else {
		return StreamEvent::Skip;
	};

	if data == "[DONE]" {
		return StreamEvent::Done;
	}

	let Ok(json) = serde_json::from_str::<Value>(data) else {
		return StreamEvent::Skip;
	};
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("delta"))
		.and_then(|delta| delta.get("content"))
		.and_then(|c| c.as_str());

	match content {
		Some(content) if !content.is_empty() => StreamEvent::Content(content.to_string()),
		_ => StreamEvent::Skip,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_delta_content() {
		let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;

		assert_eq!(parse_stream_line(line), StreamEvent::Content("Hel".to_string()));
	}

	#[test]
	fn recognizes_done_marker() {
		assert_eq!(parse_stream_line("data: [DONE]"), StreamEvent::Done);
	}

	#[test]
	fn skips_comments_and_empty_deltas() {
		assert_eq!(parse_stream_line(": keep-alive"), StreamEvent::Skip);
		assert_eq!(parse_stream_line(""), StreamEvent::Skip);
		assert_eq!(
			parse_stream_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
			StreamEvent::Skip
		);
	}
}
