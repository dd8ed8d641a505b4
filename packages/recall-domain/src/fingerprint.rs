use unicode_normalization::UnicodeNormalization;

/// Canonical form of a query used as the cache key. Two queries that differ
/// only in case, surrounding punctuation, or whitespace share a fingerprint.
pub fn normalize_query(raw: &str) -> String {
	let folded: String = raw.nfkc().collect::<String>().to_lowercase();
	let mut out = String::with_capacity(folded.len());

	for word in folded.split_whitespace() {
		let trimmed = word.trim_matches(|c: char| c.is_ascii_punctuation());

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

pub fn fingerprint(raw: &str) -> String {
	blake3::hash(normalize_query(raw).as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn collapses_case_whitespace_and_punctuation() {
		assert_eq!(
			normalize_query("  What is   mentioned about Beta?  "),
			"what is mentioned about beta"
		);
	}

	#[test]
	fn equivalent_queries_share_a_fingerprint() {
		assert_eq!(fingerprint("What about Beta?"), fingerprint("what about beta"));
		assert_ne!(fingerprint("what about beta"), fingerprint("what about gamma"));
	}

	#[test]
	fn applies_compatibility_normalization() {
		// Fullwidth forms fold to their ASCII equivalents under NFKC.
		assert_eq!(normalize_query("Ｂｅｔａ"), "beta");
	}
}
