use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Question,
	StorageRequest,
	ListQuery,
}

/// Outcome of the cheap rule-based pass. `Ambiguous` is the signal for the
/// caller to fall back to the language-model classifier; the rules never
/// guess when neither reading is supported by the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
	Resolved(Intent),
	Ambiguous,
}

const QUESTION_WORDS: [&str; 9] =
	["what", "how", "why", "when", "where", "who", "which", "whose", "whom"];

fn list_re() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();

	RE.get_or_init(|| {
		Regex::new(r"(?i)^(list( all| my| everything)?|show( me)?( all| my| everything)?|what do (you|i) (know|remember|have))\b")
			.expect("List intent pattern must compile.")
	})
}

fn storage_re() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();

	RE.get_or_init(|| {
		Regex::new(r"(?i)^(remember|save|store|note|keep|memorize)( (this|that))?\b")
			.expect("Storage intent pattern must compile.")
	})
}

pub fn classify(raw: &str) -> Classification {
	let text = raw.trim();

	if text.is_empty() {
		return Classification::Ambiguous;
	}
	if list_re().is_match(text) {
		return Classification::Resolved(Intent::ListQuery);
	}
	if storage_re().is_match(text) {
		return Classification::Resolved(Intent::StorageRequest);
	}

	let lower = text.to_lowercase();
	let first_word = lower.split_whitespace().next().unwrap_or("");

	if QUESTION_WORDS.contains(&first_word) || text.ends_with('?') {
		return Classification::Resolved(Intent::Question);
	}
	// Interrogative auxiliaries without a question mark still read as
	// questions ("do I have any notes on rust").
	if matches!(first_word, "do" | "does" | "did" | "is" | "are" | "was" | "were" | "can" | "could")
	{
		return Classification::Resolved(Intent::Question);
	}

	Classification::Ambiguous
}
