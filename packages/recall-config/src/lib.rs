mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, EmbeddingProviderConfig, Ingest, LlmProviderConfig, ProviderKind, Providers,
	Qdrant, Retrieval, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	// Vectors within one store must share dimensionality. Changing models
	// requires a fresh collection, never silent dimension mixing.
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, provider, api_base, api_key) in [
		(
			"embedding",
			cfg.providers.embedding.provider,
			&cfg.providers.embedding.api_base,
			&cfg.providers.embedding.api_key,
		),
		("llm", cfg.providers.llm.provider, &cfg.providers.llm.api_base, &cfg.providers.llm.api_key),
	] {
		if api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
		if provider == ProviderKind::Custom && api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_base is required for the custom provider."),
			});
		}
	}

	if cfg.providers.embedding.timeout_ms == 0 || cfg.providers.llm.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "Provider timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.ingest.max_pages == 0 {
		return Err(Error::Validation {
			message: "ingest.max_pages must be greater than zero.".to_string(),
		});
	}
	if cfg.ingest.max_slides == 0 {
		return Err(Error::Validation {
			message: "ingest.max_slides must be greater than zero.".to_string(),
		});
	}
	if cfg.ingest.max_words == 0 {
		return Err(Error::Validation {
			message: "ingest.max_words must be greater than zero.".to_string(),
		});
	}
	if cfg.ingest.max_chunk_chars == 0 {
		return Err(Error::Validation {
			message: "ingest.max_chunk_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.ingest.chunk_overlap_chars >= cfg.ingest.max_chunk_chars {
		return Err(Error::Validation {
			message: "ingest.chunk_overlap_chars must be less than ingest.max_chunk_chars."
				.to_string(),
		});
	}
	if cfg.ingest.url_fetch_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "ingest.url_fetch_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.retrieval.score_threshold)
		|| !cfg.retrieval.score_threshold.is_finite()
	{
		return Err(Error::Validation {
			message: "retrieval.score_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.retrieval.list_score_threshold)
		|| !cfg.retrieval.list_score_threshold.is_finite()
	{
		return Err(Error::Validation {
			message: "retrieval.list_score_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.retrieval.list_top_k < cfg.retrieval.top_k {
		return Err(Error::Validation {
			message: "retrieval.list_top_k must be at least retrieval.top_k.".to_string(),
		});
	}
	if cfg.retrieval.retry_max_attempts == 0 {
		return Err(Error::Validation {
			message: "retrieval.retry_max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.enabled && cfg.cache.capacity == 0 {
		return Err(Error::Validation {
			message: "cache.capacity must be greater than zero when the cache is enabled."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for (provider, api_base) in [
		(cfg.providers.embedding.provider, &mut cfg.providers.embedding.api_base),
		(cfg.providers.llm.provider, &mut cfg.providers.llm.api_base),
	] {
		if api_base.trim().is_empty() {
			*api_base = provider.default_api_base().to_string();
		}

		while api_base.ends_with('/') {
			api_base.pop();
		}
	}

	if let Some(api_key) = cfg.storage.qdrant.api_key.as_deref()
		&& api_key.trim().is_empty()
	{
		cfg.storage.qdrant.api_key = None;
	}
}
