pub mod chat;
pub mod embedding;
pub mod retry;

mod error;

pub use error::{Error, Result};

use std::pin::Pin;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use recall_config::{EmbeddingProviderConfig, LlmProviderConfig, ProviderKind};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Embedding capability as the service sees it. The HTTP implementation
/// lives here; tests substitute a deterministic one.
pub trait EmbeddingProvider: Send + Sync {
	fn embed_passages<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

	fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// One-shot chat completion capability.
pub trait ChatProvider: Send + Sync {
	fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, Result<String>>;
}

pub struct HttpEmbeddingProvider {
	pub cfg: EmbeddingProviderConfig,
}
impl EmbeddingProvider for HttpEmbeddingProvider {
	fn embed_passages<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed_passages(&self.cfg, texts))
	}

	fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(embedding::embed_query(&self.cfg, text))
	}
}

pub struct HttpChatProvider {
	pub cfg: LlmProviderConfig,
}
impl ChatProvider for HttpChatProvider {
	fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, Result<String>> {
		Box::pin(chat::complete(&self.cfg, system, user))
	}
}

pub fn auth_headers(
	provider: ProviderKind,
	api_key: &str,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	match provider {
		ProviderKind::Claude => {
			headers.insert(HeaderName::from_static("x-api-key"), api_key.parse()?);
			headers.insert(HeaderName::from_static("anthropic-version"), "2023-06-01".parse()?);
		},
		_ => {
			headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
		},
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
