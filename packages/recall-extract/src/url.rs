//! URL fetching and the advisory category classifier.
//!
//! A link the user saves is worth keeping even when the page refuses to
//! serve us, so fetch failures degrade to a stub note instead of erroring.

use std::time::Duration;

use reqwest::redirect::Policy;

use crate::{Error, Result, html};

// Some sites serve bot-looking user agents an empty shell.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
	(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
	("video", &["youtube", "vimeo", "twitch"]),
	("social", &["twitter", "x.com", "instagram", "facebook", "linkedin", "reddit"]),
	("code", &["github", "gitlab", "stackoverflow"]),
	("sports", &["cricket", "sports", "espn"]),
	("news", &["news", "bbc", "cnn", "reuters"]),
	("ai_tools", &["ai", "coding", "builder", "emergent", "v0.dev", "mgx", "gamma.app"]),
];

#[derive(Clone, Debug)]
pub struct UrlContent {
	pub url: String,
	pub title: Option<String>,
	pub text: String,
	pub category: &'static str,
	pub accessible: bool,
}

/// Best-effort keyword classification over the URL itself. Advisory only;
/// stored as a metadata tag so listings can group saved links.
pub fn classify(url: &str) -> &'static str {
	let lower = url.to_lowercase();

	for (category, keywords) in CATEGORY_KEYWORDS {
		if keywords.iter().any(|keyword| lower.contains(keyword)) {
			return category;
		}
	}

	"general"
}

pub async fn fetch(url: &str, timeout_ms: u64, max_chars: usize) -> Result<UrlContent> {
	let category = classify(url);
	let client = reqwest::Client::builder()
		.timeout(Duration::from_millis(timeout_ms))
		.user_agent(BROWSER_USER_AGENT)
		.redirect(Policy::limited(5))
		.build()
		.map_err(|err| Error::ExtractionFailed { message: err.to_string() })?;
	let response = match client.get(url).send().await {
		Ok(response) if response.status().is_success() => response,
		Ok(response) =>
			return Ok(inaccessible(url, category, &format!("HTTP {}", response.status()))),
		Err(err) => return Ok(inaccessible(url, category, &err.to_string())),
	};
	let content_type = response
		.headers()
		.get(reqwest::header::CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.unwrap_or("")
		.to_string();
	let body = match response.text().await {
		Ok(body) => body,
		Err(err) => return Ok(inaccessible(url, category, &err.to_string())),
	};
	let (title, text) = if content_type.contains("html") || content_type.is_empty() {
		let readable = html::extract_readable(&body);

		(readable.title, readable.text)
	} else {
		// JSON, XML, plain text: keep the raw body.
		(None, body)
	};
	let text = truncate_chars(text.trim(), max_chars);

	if text.is_empty() {
		return Ok(inaccessible(url, category, "page returned no readable text"));
	}

	Ok(UrlContent { url: url.to_string(), title, text, category, accessible: true })
}

fn inaccessible(url: &str, category: &'static str, reason: &str) -> UrlContent {
	tracing::warn!(url, reason, "URL could not be fetched; storing a stub note.");

	UrlContent {
		url: url.to_string(),
		title: None,
		text: format!("Saved link: {url}\nNote: content could not be fetched ({reason})."),
		category,
		accessible: false,
	}
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => format!("{}...", &text[..idx]),
		None => text.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_by_url_keywords() {
		assert_eq!(classify("https://www.youtube.com/watch?v=abc"), "video");
		assert_eq!(classify("https://github.com/rust-lang/rust"), "code");
		assert_eq!(classify("https://example.org/recipes"), "general");
	}

	#[test]
	fn truncation_respects_char_boundaries() {
		assert_eq!(truncate_chars("héllo", 3), "hél...");
		assert_eq!(truncate_chars("short", 10), "short");
	}

	#[test]
	fn stub_note_records_the_reason() {
		let stub = inaccessible("https://example.org", "general", "HTTP 404");

		assert!(!stub.accessible);
		assert!(stub.text.contains("https://example.org"));
		assert!(stub.text.contains("HTTP 404"));
	}
}
