use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub ingest: Ingest,
	pub retrieval: Retrieval,
	pub cache: Cache,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	#[serde(default)]
	pub api_key: Option<String>,
	pub collection: String,
	pub vector_dim: u32,
}

/// Backing vendor for the embedding and language-model capabilities.
/// Selected once at startup; there is no per-call switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
	Openai,
	Gemini,
	Claude,
	GithubModels,
	Custom,
}
impl ProviderKind {
	pub fn default_api_base(self) -> &'static str {
		match self {
			Self::Openai => "https://api.openai.com/v1",
			Self::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
			Self::Claude => "https://api.anthropic.com/v1",
			Self::GithubModels => "https://models.inference.ai.azure.com",
			Self::Custom => "",
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider: ProviderKind,
	#[serde(default)]
	pub api_base: String,
	pub api_key: String,
	#[serde(default = "default_embedding_path")]
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	/// Providers with asymmetric encoders receive a task-type hint that
	/// distinguishes stored passages from queries.
	#[serde(default)]
	pub asymmetric: bool,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider: ProviderKind,
	#[serde(default)]
	pub api_base: String,
	pub api_key: String,
	#[serde(default = "default_chat_path")]
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Ingest {
	pub max_pages: u32,
	pub max_slides: u32,
	pub max_words: u32,
	pub max_chunk_chars: u32,
	pub chunk_overlap_chars: u32,
	pub url_fetch_timeout_ms: u64,
	pub max_url_content_chars: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Retrieval {
	pub top_k: u32,
	/// Minimum acceptable similarity. Results below it are noise and are
	/// discarded, not returned as low-confidence matches.
	pub score_threshold: f32,
	pub list_top_k: u32,
	#[serde(default)]
	pub list_score_threshold: f32,
	pub synthesize_answers: bool,
	pub retry_max_attempts: u32,
	pub retry_base_delay_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Cache {
	pub enabled: bool,
	pub capacity: u32,
	/// Zero disables age-based expiry.
	#[serde(default)]
	pub ttl_secs: u64,
}

fn default_embedding_path() -> String {
	"/embeddings".to_string()
}

fn default_chat_path() -> String {
	"/chat/completions".to_string()
}
