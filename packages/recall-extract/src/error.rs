#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unsupported content type {declared:?}.")]
	UnsupportedFormat { declared: String },
	#[error("Content too large: {detail}")]
	ContentTooLarge { detail: String },
	#[error("Extraction failed: {message}")]
	ExtractionFailed { message: String },
}
