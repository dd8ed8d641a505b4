//! The memory engine: ingestion, cache-first retrieval, and the memory
//! lifecycle, glued together over the storage and provider seams.

pub mod answer;
pub mod cache;
pub mod forget;
pub mod ingest;
pub mod list;

use std::sync::Arc;

pub use answer::{AnswerOutcome, AnswerResponse, MemorySummary};
pub use cache::SemanticCache;
pub use ingest::{IngestRequest, IngestResponse};

use recall_config::Config;
use recall_extract::Normalizer;
use recall_providers::{
	ChatProvider, EmbeddingProvider, HttpChatProvider, HttpEmbeddingProvider,
	retry::{RetryPolicy, with_retry},
};
use recall_storage::VectorStore;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	UnsupportedFormat { declared: String },
	ContentTooLarge { detail: String },
	ExtractionFailed { message: String },
	EmbeddingProvider { message: String },
	LanguageModel { message: String },
	StoreUnavailable { message: String },
	CacheInconsistency { message: String },
}
impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::UnsupportedFormat { declared } => {
				write!(f, "Unsupported content type {declared:?}.")
			},
			Self::ContentTooLarge { detail } => write!(f, "Content too large: {detail}"),
			Self::ExtractionFailed { message } => write!(f, "Extraction failed: {message}"),
			Self::EmbeddingProvider { message } => {
				write!(f, "Embedding provider error: {message}")
			},
			Self::LanguageModel { message } => write!(f, "Language model error: {message}"),
			Self::StoreUnavailable { message } => write!(f, "Store unavailable: {message}"),
			Self::CacheInconsistency { message } => write!(f, "Cache inconsistency: {message}"),
		}
	}
}
impl std::error::Error for ServiceError {}
impl From<recall_extract::Error> for ServiceError {
	fn from(err: recall_extract::Error) -> Self {
		match err {
			recall_extract::Error::UnsupportedFormat { declared } => {
				Self::UnsupportedFormat { declared }
			},
			recall_extract::Error::ContentTooLarge { detail } => Self::ContentTooLarge { detail },
			recall_extract::Error::ExtractionFailed { message } => {
				Self::ExtractionFailed { message }
			},
		}
	}
}
impl From<recall_storage::Error> for ServiceError {
	fn from(err: recall_storage::Error) -> Self {
		match err {
			// A wrong-sized vector reached the store: the provider broke
			// the dimension contract, not the store.
			recall_storage::Error::DimensionMismatch { .. } => {
				Self::EmbeddingProvider { message: err.to_string() }
			},
			other => Self::StoreUnavailable { message: other.to_string() },
		}
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, chat: Arc<dyn ChatProvider>) -> Self {
		Self { embedding, chat }
	}

	pub fn http(cfg: &Config) -> Self {
		Self {
			embedding: Arc::new(HttpEmbeddingProvider { cfg: cfg.providers.embedding.clone() }),
			chat: Arc::new(HttpChatProvider { cfg: cfg.providers.llm.clone() }),
		}
	}
}

pub struct RecallService {
	pub cfg: Config,
	pub store: Arc<dyn VectorStore>,
	pub cache: SemanticCache,
	pub normalizer: Normalizer,
	pub providers: Providers,
}
impl RecallService {
	pub fn new(cfg: Config, store: Arc<dyn VectorStore>) -> Self {
		let providers = Providers::http(&cfg);

		Self::with_providers(cfg, store, providers)
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn VectorStore>, providers: Providers) -> Self {
		let cache = SemanticCache::new(&cfg.cache);
		let normalizer = Normalizer::new(&cfg.ingest);

		Self { cfg, store, cache, normalizer, providers }
	}

	/// Swaps in a normalizer carrying external parser/OCR/ASR capabilities.
	pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
		self.normalizer = normalizer;

		self
	}

	pub(crate) fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy::new(self.cfg.retrieval.retry_max_attempts, self.cfg.retrieval.retry_base_delay_ms)
	}

	pub(crate) async fn embed_query(&self, text: &str) -> ServiceResult<Vec<f32>> {
		let vector = with_retry(self.retry_policy(), || self.providers.embedding.embed_query(text))
			.await
			.map_err(|err| ServiceError::EmbeddingProvider { message: err.to_string() })?;

		self.check_dimension(&vector)?;

		Ok(vector)
	}

	pub(crate) async fn embed_passages(&self, texts: &[String]) -> ServiceResult<Vec<Vec<f32>>> {
		let vectors =
			with_retry(self.retry_policy(), || self.providers.embedding.embed_passages(texts))
				.await
				.map_err(|err| ServiceError::EmbeddingProvider { message: err.to_string() })?;

		if vectors.len() != texts.len() {
			return Err(ServiceError::EmbeddingProvider {
				message: format!(
					"Provider returned {} vectors for {} passages.",
					vectors.len(),
					texts.len()
				),
			});
		}

		for vector in &vectors {
			self.check_dimension(vector)?;
		}

		Ok(vectors)
	}

	pub(crate) async fn complete_chat(&self, system: &str, user: &str) -> ServiceResult<String> {
		with_retry(self.retry_policy(), || self.providers.chat.complete(system, user))
			.await
			.map_err(|err| ServiceError::LanguageModel { message: err.to_string() })
	}

	fn check_dimension(&self, vector: &[f32]) -> ServiceResult<()> {
		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if vector.len() != expected {
			return Err(ServiceError::EmbeddingProvider {
				message: format!(
					"Embedding has dimension {}, store expects {expected}.",
					vector.len()
				),
			});
		}

		Ok(())
	}
}
