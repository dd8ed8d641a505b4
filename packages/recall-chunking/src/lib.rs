use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub max_chars: u32,
	pub overlap_chars: u32,
}

#[derive(Clone, Debug)]
pub struct Chunk {
	pub chunk_index: i32,
	pub start_offset: usize,
	pub end_offset: usize,
	pub text: String,
}

/// Splits text into chunks that respect semantic boundaries: paragraphs are
/// kept together while they fit the budget, and a paragraph that alone
/// exceeds the budget is split on sentence boundaries with a bounded
/// overlap. Fixed-width slicing is never used.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let max_chars = cfg.max_chars.max(1) as usize;
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_start = 0_usize;
	let mut last_end = 0_usize;

	for (offset, paragraph) in paragraph_bounds(text) {
		if paragraph.trim().is_empty() {
			continue;
		}
		if paragraph.chars().count() > max_chars {
			// Oversized paragraph: flush what we have, then walk its
			// sentences with overlap between consecutive chunks.
			flush(&mut chunks, &mut current, current_start, last_end);

			for piece in split_sentences(paragraph, cfg) {
				push_chunk(
					&mut chunks,
					offset + piece.start_offset,
					offset + piece.end_offset,
					piece.text,
				);
			}

			current_start = offset + paragraph.len();
			last_end = current_start;

			continue;
		}
		if current.chars().count() + paragraph.chars().count() > max_chars {
			flush(&mut chunks, &mut current, current_start, last_end);
		}
		if current.is_empty() {
			current_start = offset;
		} else {
			current.push_str("\n\n");
		}

		current.push_str(paragraph);

		last_end = offset + paragraph.len();
	}

	flush(&mut chunks, &mut current, current_start, last_end);

	chunks
}

fn push_chunk(chunks: &mut Vec<Chunk>, start_offset: usize, end_offset: usize, text: String) {
	let chunk_index = chunks.len() as i32;

	chunks.push(Chunk { chunk_index, start_offset, end_offset, text });
}

fn flush(chunks: &mut Vec<Chunk>, current: &mut String, current_start: usize, last_end: usize) {
	let trimmed = current.trim();

	if !trimmed.is_empty() {
		push_chunk(chunks, current_start, last_end, trimmed.to_string());
	}

	current.clear();
}

fn paragraph_bounds(text: &str) -> Vec<(usize, &str)> {
	let mut out = Vec::new();
	let mut start = 0_usize;

	for segment in text.split("\n\n") {
		out.push((start, segment));

		start += segment.len() + 2;
	}

	out
}

fn split_sentences(paragraph: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let max_chars = cfg.max_chars.max(1) as usize;
	let sentences: Vec<(usize, &str)> = paragraph.split_sentence_bound_indices().collect();
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_start = 0_usize;
	let mut last_end = 0_usize;

	for (idx, sentence) in sentences {
		if current.chars().count() + sentence.chars().count() > max_chars && !current.is_empty() {
			push_chunk(&mut chunks, current_start, last_end, current.trim().to_string());

			let overlap = overlap_tail(&current, cfg.overlap_chars as usize);

			current_start = last_end.saturating_sub(overlap.len());
			current = overlap;
		}
		if current.is_empty() {
			current_start = idx;
		}

		current.push_str(sentence);

		last_end = idx + sentence.len();
	}

	if !current.trim().is_empty() {
		push_chunk(&mut chunks, current_start, last_end, current.trim().to_string());
	}

	chunks
}

fn overlap_tail(text: &str, overlap_chars: usize) -> String {
	if overlap_chars == 0 {
		return String::new();
	}

	// Back up to a sentence boundary within the overlap window so the
	// carried context never starts mid-sentence.
	let mut tail_start = text.len();

	for (idx, _) in text.split_sentence_bound_indices() {
		if text.len() - idx <= overlap_chars {
			tail_start = idx;

			break;
		}
	}

	text[tail_start..].to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_small_text_in_one_chunk() {
		let cfg = ChunkingConfig { max_chars: 200, overlap_chars: 20 };
		let chunks = split_text("Alpha paragraph.\n\nBeta paragraph.", &cfg);

		assert_eq!(chunks.len(), 1);
		assert!(chunks[0].text.contains("Alpha"));
		assert!(chunks[0].text.contains("Beta"));
	}

	#[test]
	fn splits_on_paragraph_boundaries_before_sentences() {
		let cfg = ChunkingConfig { max_chars: 30, overlap_chars: 0 };
		let chunks = split_text("First paragraph here.\n\nSecond paragraph here.", &cfg);

		assert_eq!(chunks.len(), 2);
		assert_eq!(chunks[0].text, "First paragraph here.");
		assert_eq!(chunks[1].text, "Second paragraph here.");
	}

	#[test]
	fn splits_oversized_paragraph_on_sentence_boundaries() {
		let cfg = ChunkingConfig { max_chars: 40, overlap_chars: 0 };
		let text = "One sentence here. Two sentence here. Three sentence here.";
		let chunks = split_text(text, &cfg);

		assert!(chunks.len() >= 2);

		for chunk in &chunks {
			assert!(chunk.text.ends_with('.'), "Chunk should end at a sentence: {}", chunk.text);
		}
	}

	#[test]
	fn overlap_carries_trailing_context() {
		let cfg = ChunkingConfig { max_chars: 50, overlap_chars: 25 };
		let text = "Alpha is first. Beta is second. Gamma is third. Delta is fourth.";
		let chunks = split_text(text, &cfg);

		assert!(chunks.len() >= 2);

		// The chunk after a split starts with text the previous chunk ended
		// with.
		let first = &chunks[0].text;
		let second = &chunks[1].text;
		let carried = second.split('.').next().unwrap_or("").trim();

		assert!(!carried.is_empty());
		assert!(first.contains(carried), "Expected {first:?} to contain {carried:?}");
	}

	#[test]
	fn skips_blank_paragraphs() {
		let cfg = ChunkingConfig { max_chars: 100, overlap_chars: 0 };
		let chunks = split_text("\n\n  \n\nOnly content.\n\n\n\n", &cfg);

		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].text, "Only content.");
	}

	#[test]
	fn chunk_indices_are_sequential() {
		let cfg = ChunkingConfig { max_chars: 25, overlap_chars: 0 };
		let chunks = split_text("Para one here.\n\nPara two here.\n\nPara three here.", &cfg);

		for (expected, chunk) in chunks.iter().enumerate() {
			assert_eq!(chunk.chunk_index, expected as i32);
		}
	}
}
