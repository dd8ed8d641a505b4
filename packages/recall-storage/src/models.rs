use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Where a memory's text originally came from. Stored alongside every
/// point so listings can tell a saved note from an extracted document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
	Text,
	Document,
	Url,
	Image,
	Audio,
}
impl SourceType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Document => "document",
			Self::Url => "url",
			Self::Image => "image",
			Self::Audio => "audio",
		}
	}
}
impl std::str::FromStr for SourceType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"text" => Ok(Self::Text),
			"document" => Ok(Self::Document),
			"url" => Ok(Self::Url),
			"image" => Ok(Self::Image),
			"audio" => Ok(Self::Audio),
			other => Err(format!("Unknown source type {other:?}.")),
		}
	}
}

/// One stored memory chunk, exactly as it lives in the vector store's
/// payload. `source_metadata` carries provenance: filename, page or slide
/// index, url, title, category tag, whatever the extractor recorded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryItem {
	pub id: Uuid,
	pub owner_id: String,
	pub text: String,
	pub source_type: SourceType,
	pub source_metadata: serde_json::Value,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}

/// A memory item paired with its embedding, ready to upsert.
#[derive(Clone, Debug)]
pub struct MemoryRecord {
	pub item: MemoryItem,
	pub vector: Vec<f32>,
}

/// One search result with its similarity score.
#[derive(Clone, Debug)]
pub struct SearchHit {
	pub item: MemoryItem,
	pub score: f32,
}
