//! Content normalization: raw input plus a declared type becomes a list of
//! plain-text chunks with provenance metadata, ready for embedding.
//!
//! Text, markdown, HTML, and URLs are handled in-crate. Binary formats go
//! through the [`DocumentParser`], [`OcrEngine`], and [`AsrEngine`]
//! capability traits so the heavy parsers stay out of this crate and tests
//! can script them.

pub mod html;
pub mod url;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

use std::{pin::Pin, str::FromStr, sync::Arc};

use serde_json::{Value, json};

use recall_chunking::ChunkingConfig;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the caller says the input is. Derived from a filename extension or
/// an explicit API field, never sniffed from content.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeclaredType {
	Text,
	Markdown,
	Html,
	Pdf,
	Docx,
	Pptx,
	Image,
	Audio,
	Url,
}
impl DeclaredType {
	/// The storage-level source kind this declared type maps to.
	pub fn source_kind(self) -> &'static str {
		match self {
			Self::Text | Self::Markdown => "text",
			Self::Html | Self::Pdf | Self::Docx | Self::Pptx => "document",
			Self::Image => "image",
			Self::Audio => "audio",
			Self::Url => "url",
		}
	}
}
impl FromStr for DeclaredType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_lowercase().as_str() {
			"text" | "txt" => Ok(Self::Text),
			"markdown" | "md" => Ok(Self::Markdown),
			"html" | "htm" => Ok(Self::Html),
			"pdf" => Ok(Self::Pdf),
			"docx" => Ok(Self::Docx),
			"pptx" | "ppt" => Ok(Self::Pptx),
			"image" | "png" | "jpg" | "jpeg" | "webp" => Ok(Self::Image),
			"audio" | "mp3" | "ogg" | "wav" | "m4a" => Ok(Self::Audio),
			"url" => Ok(Self::Url),
			other => Err(Error::UnsupportedFormat { declared: other.to_string() }),
		}
	}
}

/// One normalized chunk: plain text plus the provenance a citation needs.
#[derive(Clone, Debug)]
pub struct NormalizedChunk {
	pub text: String,
	pub metadata: Value,
}

/// Page-oriented parse result for pdf and docx inputs. Docx has no real
/// pages, so parsers estimate them (around 400 words per page is the usual
/// yardstick).
pub struct ParsedDocument {
	pub pages: Vec<String>,
}

pub trait DocumentParser: Send + Sync {
	fn parse_pdf<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<ParsedDocument>>;

	fn parse_docx<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<ParsedDocument>>;

	/// Slide texts in presentation order.
	fn parse_slides<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<Vec<String>>>;
}

pub trait OcrEngine: Send + Sync {
	fn image_to_text<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<String>>;
}

pub trait AsrEngine: Send + Sync {
	fn transcribe<'a>(&'a self, bytes: &'a [u8]) -> BoxFuture<'a, Result<String>>;
}

pub struct Normalizer {
	cfg: recall_config::Ingest,
	document_parser: Option<Arc<dyn DocumentParser>>,
	ocr: Option<Arc<dyn OcrEngine>>,
	asr: Option<Arc<dyn AsrEngine>>,
}
impl Normalizer {
	pub fn new(cfg: &recall_config::Ingest) -> Self {
		Self { cfg: cfg.clone(), document_parser: None, ocr: None, asr: None }
	}

	pub fn with_document_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
		self.document_parser = Some(parser);

		self
	}

	pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
		self.ocr = Some(ocr);

		self
	}

	pub fn with_asr(mut self, asr: Arc<dyn AsrEngine>) -> Self {
		self.asr = Some(asr);

		self
	}

	/// Normalizes one input into chunks. `source_name` is the filename or
	/// URL as the caller knows it and lands in every chunk's metadata.
	pub async fn normalize(
		&self,
		bytes: &[u8],
		declared: DeclaredType,
		source_name: Option<&str>,
	) -> Result<Vec<NormalizedChunk>> {
		match declared {
			DeclaredType::Text | DeclaredType::Markdown => {
				let text = decode_utf8(bytes)?;

				self.check_word_limit(&text)?;

				Ok(self.chunk_plain(&text, source_name))
			},
			DeclaredType::Html => {
				let raw = decode_utf8(bytes)?;
				let readable = html::extract_readable(&raw);

				if readable.text.trim().is_empty() {
					return Err(Error::ExtractionFailed {
						message: "HTML document contained no readable text.".to_string(),
					});
				}

				self.check_word_limit(&readable.text)?;

				Ok(self.chunk_with(&readable.text, |chunk_meta| {
					extend(chunk_meta, source_name, &[("title", json!(readable.title))])
				}))
			},
			DeclaredType::Url => {
				let target = decode_utf8(bytes)?;
				let content = url::fetch(
					target.trim(),
					self.cfg.url_fetch_timeout_ms,
					self.cfg.max_url_content_chars as usize,
				)
				.await?;

				Ok(self.chunk_with(&content.text, |chunk_meta| {
					extend(chunk_meta, source_name, &[
						("url", json!(content.url)),
						("title", json!(content.title)),
						("category", json!(content.category)),
						("accessible", json!(content.accessible)),
					])
				}))
			},
			DeclaredType::Pdf | DeclaredType::Docx => {
				let parser = self.document_parser.as_ref().ok_or_else(|| unsupported(declared))?;
				let document = if declared == DeclaredType::Pdf {
					parser.parse_pdf(bytes).await?
				} else {
					parser.parse_docx(bytes).await?
				};
				let page_count = document.pages.len() as u32;

				if page_count > self.cfg.max_pages {
					return Err(Error::ContentTooLarge {
						detail: format!(
							"document has {page_count} pages, limit is {}; split it into \
							 smaller documents",
							self.cfg.max_pages
						),
					});
				}

				Ok(self.chunk_pages(&document.pages, page_count, "page", source_name))
			},
			DeclaredType::Pptx => {
				let parser = self.document_parser.as_ref().ok_or_else(|| unsupported(declared))?;
				let slides = parser.parse_slides(bytes).await?;
				let slide_count = slides.len() as u32;

				if slide_count > self.cfg.max_slides {
					return Err(Error::ContentTooLarge {
						detail: format!(
							"presentation has {slide_count} slides, limit is {}",
							self.cfg.max_slides
						),
					});
				}

				Ok(self.chunk_pages(&slides, slide_count, "slide", source_name))
			},
			DeclaredType::Image => {
				let ocr = self.ocr.as_ref().ok_or_else(|| unsupported(declared))?;
				let text = ocr.image_to_text(bytes).await?;

				if text.trim().is_empty() {
					return Err(Error::ExtractionFailed {
						message: "Image contained no readable text.".to_string(),
					});
				}

				Ok(self.chunk_plain(&text, source_name))
			},
			DeclaredType::Audio => {
				let asr = self.asr.as_ref().ok_or_else(|| unsupported(declared))?;
				let text = asr.transcribe(bytes).await?;

				if text.trim().is_empty() {
					return Err(Error::ExtractionFailed {
						message: "Audio could not be transcribed.".to_string(),
					});
				}

				Ok(self.chunk_plain(&text, source_name))
			},
		}
	}

	fn check_word_limit(&self, text: &str) -> Result<()> {
		let word_count = text.split_whitespace().count() as u32;

		if word_count > self.cfg.max_words {
			return Err(Error::ContentTooLarge {
				detail: format!(
					"content has {word_count} words, limit is {}; split it into smaller notes",
					self.cfg.max_words
				),
			});
		}

		Ok(())
	}

	fn chunking(&self) -> ChunkingConfig {
		ChunkingConfig {
			max_chars: self.cfg.max_chunk_chars,
			overlap_chars: self.cfg.chunk_overlap_chars,
		}
	}

	fn chunk_plain(&self, text: &str, source_name: Option<&str>) -> Vec<NormalizedChunk> {
		self.chunk_with(text, |chunk_meta| extend(chunk_meta, source_name, &[]))
	}

	fn chunk_with(
		&self,
		text: &str,
		decorate: impl Fn(&mut serde_json::Map<String, Value>),
	) -> Vec<NormalizedChunk> {
		let pieces = recall_chunking::split_text(text, &self.chunking());
		let chunk_count = pieces.len();

		pieces
			.into_iter()
			.map(|piece| {
				let mut metadata = serde_json::Map::new();

				metadata.insert("chunk_index".to_string(), json!(piece.chunk_index));
				metadata.insert("chunk_count".to_string(), json!(chunk_count));
				metadata
					.insert("word_count".to_string(), json!(piece.text.split_whitespace().count()));
				decorate(&mut metadata);

				NormalizedChunk { text: piece.text, metadata: Value::Object(metadata) }
			})
			.collect()
	}

	/// One source unit (page or slide) at a time, so provenance stays exact
	/// even when a long page is split further.
	fn chunk_pages(
		&self,
		units: &[String],
		unit_count: u32,
		unit_key: &str,
		source_name: Option<&str>,
	) -> Vec<NormalizedChunk> {
		let mut out = Vec::new();

		for (index, unit) in units.iter().enumerate() {
			if unit.trim().is_empty() {
				continue;
			}

			let count_key = format!("{unit_key}_count");

			out.extend(self.chunk_with(unit, |chunk_meta| {
				extend(chunk_meta, source_name, &[
					(unit_key, json!(index as u32 + 1)),
					(count_key.as_str(), json!(unit_count)),
				])
			}));
		}

		out
	}
}

fn unsupported(declared: DeclaredType) -> Error {
	Error::UnsupportedFormat { declared: format!("{declared:?}").to_lowercase() }
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
	String::from_utf8(bytes.to_vec())
		.map_err(|_| Error::ExtractionFailed { message: "Input is not valid UTF-8.".to_string() })
}

fn extend(
	metadata: &mut serde_json::Map<String, Value>,
	source_name: Option<&str>,
	entries: &[(&str, Value)],
) {
	if let Some(name) = source_name {
		metadata.insert("source_name".to_string(), json!(name));
	}

	for (key, value) in entries {
		metadata.insert((*key).to_string(), value.clone());
	}
}
