use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Embedding task for providers with asymmetric encoders. Providers that
/// encode passages and queries identically ignore the hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
	Passage,
	Query,
}
impl EmbeddingTask {
	fn as_str(self) -> &'static str {
		match self {
			Self::Passage => "passage",
			Self::Query => "query",
		}
	}
}

pub async fn embed_passages(
	cfg: &recall_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	embed(cfg, texts, EmbeddingTask::Passage).await
}

pub async fn embed_query(
	cfg: &recall_config::EmbeddingProviderConfig,
	text: &str,
) -> Result<Vec<f32>> {
	let mut vectors = embed(cfg, std::slice::from_ref(&text.to_string()), EmbeddingTask::Query).await?;

	vectors.pop().ok_or_else(|| Error::InvalidResponse {
		message: "Embedding provider returned no vectors.".to_string(),
	})
}

async fn embed(
	cfg: &recall_config::EmbeddingProviderConfig,
	texts: &[String],
	task: EmbeddingTask,
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});

	if cfg.asymmetric && let Some(map) = body.as_object_mut() {
		map.insert("input_type".to_string(), Value::from(task.as_str()));
	}

	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.provider, &cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let status = res.status();

	if !status.is_success() {
		let body = res.text().await.unwrap_or_default();

		return Err(Error::Status { status: status.as_u16(), body });
	}

	let json: Value = res.json().await?;

	parse_embedding_response(json)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse { message: "Embedding item missing embedding array.".to_string() }
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn rejects_response_without_data_array() {
		let json = serde_json::json!({ "error": "rate limited" });
		let err = parse_embedding_response(json).expect_err("Expected parse failure.");

		assert!(err.to_string().contains("missing data array"));
	}
}
