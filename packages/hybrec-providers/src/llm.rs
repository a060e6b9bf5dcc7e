use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

static SCORE_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r#"(?i)"?\bscore"?\s*[:=]\s*(-?\d+(?:\.\d+)?)"#).ok());
static RATIONALE_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r#"(?i)"?\brationale"?\s*[:=]\s*"?([^"\n]+)"#).ok());

/// A bounded relevance judgment returned by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
	pub score: f64,
	#[serde(default)]
	pub rationale: String,
}

/// Sends an OpenAI-compatible chat completion and returns the first choice's content.
pub async fn complete(
	cfg: &hybrec_config::LlmProviderConfig,
	messages: &[Value],
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_content(&json)
}

pub fn parse_completion_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing choices[0].message.content.".to_string(),
		})
}

/// Parses a judgment from model output.
///
/// Accepts a JSON object (optionally inside a fenced block) and falls back to `score: n` text.
/// Scores outside `0..=score_max` are rejected.
pub fn parse_judgment(text: &str, score_max: f64) -> Result<Judgment> {
	let trimmed = strip_code_fence(text.trim());
	let judgment = match serde_json::from_str::<Judgment>(trimmed) {
		Ok(judgment) => judgment,
		Err(_) => parse_judgment_text(trimmed)?,
	};

	if !judgment.score.is_finite() || judgment.score < 0.0 || judgment.score > score_max {
		return Err(Error::InvalidResponse {
			message: format!("Judgment score {} is outside 0-{score_max}.", judgment.score),
		});
	}

	Ok(Judgment { score: judgment.score, rationale: judgment.rationale.trim().to_string() })
}

fn parse_judgment_text(text: &str) -> Result<Judgment> {
	let score = SCORE_PATTERN
		.as_ref()
		.and_then(|re| re.captures(text))
		.and_then(|caps| caps.get(1))
		.and_then(|m| m.as_str().parse::<f64>().ok())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Judgment does not contain a numeric score.".to_string(),
		})?;
	let rationale = RATIONALE_PATTERN
		.as_ref()
		.and_then(|re| re.captures(text))
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str().trim().trim_end_matches(',').to_string())
		.unwrap_or_default();

	Ok(Judgment { score, rationale })
}

fn strip_code_fence(text: &str) -> &str {
	let Some(rest) = text.strip_prefix("```") else { return text };
	let rest = rest.trim_start_matches(|ch: char| ch.is_ascii_alphabetic());

	rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "{\"score\": 7}" } }]
		});

		assert_eq!(parse_completion_content(&json).expect("parse failed"), "{\"score\": 7}");
	}

	#[test]
	fn parses_json_judgment() {
		let judgment = parse_judgment(r#"{"score": 8.5, "rationale": " Fits the task. "}"#, 10.0)
			.expect("parse failed");

		assert_eq!(judgment, Judgment { score: 8.5, rationale: "Fits the task.".to_string() });
	}

	#[test]
	fn parses_fenced_json_judgment() {
		let text = "```json\n{\"score\": 3, \"rationale\": \"Weak fit.\"}\n```";
		let judgment = parse_judgment(text, 10.0).expect("parse failed");

		assert_eq!(judgment.score, 3.0);
		assert_eq!(judgment.rationale, "Weak fit.");
	}

	#[test]
	fn falls_back_to_text_pattern() {
		let judgment =
			parse_judgment("Score: 6\nRationale: Partial match.", 10.0).expect("parse failed");

		assert_eq!(judgment.score, 6.0);
		assert_eq!(judgment.rationale, "Partial match.");
	}

	#[test]
	fn rejects_out_of_range_and_missing_scores() {
		assert!(parse_judgment(r#"{"score": 11}"#, 10.0).is_err());
		assert!(parse_judgment(r#"{"score": -1}"#, 10.0).is_err());
		assert!(parse_judgment("I cannot decide.", 10.0).is_err());
	}
}
