//! Readable-text extraction from HTML documents.
//!
//! Script and style content never appears in `scraper`'s text nodes, so
//! stripping them is implicit. Content-bearing containers are preferred
//! over a whole-body sweep to keep navigation chrome out of memories.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

const CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=main]"];
const BLOCK_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li, blockquote, pre, td";
// Fragments shorter than this are almost always buttons or labels.
const MIN_FRAGMENT_CHARS: usize = 20;

#[derive(Clone, Debug)]
pub struct Readable {
	pub title: Option<String>,
	pub text: String,
}

pub fn extract_readable(html: &str) -> Readable {
	let document = Html::parse_document(html);
	let title = Selector::parse("title")
		.ok()
		.and_then(|selector| document.select(&selector).next())
		.map(|element| element_text(&element))
		.filter(|title| !title.is_empty());

	for selector_str in CONTENT_SELECTORS {
		let Ok(selector) = Selector::parse(selector_str) else { continue };
		let parts: Vec<String> = document
			.select(&selector)
			.map(|element| element_text(&element))
			.filter(|text| !text.is_empty())
			.collect();

		if !parts.is_empty() {
			return Readable { title, text: parts.join("\n\n") };
		}
	}

	Readable { title, text: body_paragraphs(&document) }
}

/// Collapses an element's text nodes into single-space-separated prose.
fn element_text(element: &ElementRef) -> String {
	let mut out = String::new();

	for node in element.text() {
		let trimmed = node.trim();

		if trimmed.is_empty() {
			continue;
		}
		if !out.is_empty() {
			out.push(' ');
		}

		out.push_str(trimmed);
	}

	out
}

fn body_paragraphs(document: &Html) -> String {
	let Ok(body_selector) = Selector::parse("body") else { return String::new() };
	let Some(body) = document.select(&body_selector).next() else { return String::new() };
	let Ok(selector) = Selector::parse(BLOCK_SELECTOR) else { return element_text(&body) };
	let mut seen = HashSet::new();
	let mut paragraphs = Vec::new();

	// Nested blocks (a paragraph inside a list item) match more than once
	// with the same text; keep the first occurrence in document order.
	for element in body.select(&selector) {
		let text = element_text(&element);

		if text.len() >= MIN_FRAGMENT_CHARS && seen.insert(text.clone()) {
			paragraphs.push(text);
		}
	}

	if paragraphs.is_empty() {
		return element_text(&body);
	}

	paragraphs.join("\n\n")
}
