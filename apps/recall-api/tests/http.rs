use std::sync::Arc;

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use recall_api::{routes, state::AppState};
use recall_config::{Config, ProviderKind};
use recall_service::{Providers, RecallService};
use recall_testkit::{HashEmbedder, InMemoryStore, ScriptedChat};

const DIM: u32 = 64;

fn test_config() -> Config {
	Config {
		service: recall_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: recall_config::Storage {
			qdrant: recall_config::Qdrant {
				url: "http://localhost:6334".to_string(),
				api_key: None,
				collection: "memories_http_test".to_string(),
				vector_dim: DIM,
			},
		},
		providers: recall_config::Providers {
			embedding: recall_config::EmbeddingProviderConfig {
				provider: ProviderKind::Custom,
				api_base: "http://localhost:0".to_string(),
				api_key: "unused".to_string(),
				path: "/embeddings".to_string(),
				model: "test-embedder".to_string(),
				dimensions: DIM,
				asymmetric: false,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
			llm: recall_config::LlmProviderConfig {
				provider: ProviderKind::Custom,
				api_base: "http://localhost:0".to_string(),
				api_key: "unused".to_string(),
				path: "/chat/completions".to_string(),
				model: "test-chat".to_string(),
				temperature: 0.2,
				max_tokens: 512,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
		},
		ingest: recall_config::Ingest {
			max_pages: 30,
			max_slides: 50,
			max_words: 15_000,
			max_chunk_chars: 2_000,
			chunk_overlap_chars: 200,
			url_fetch_timeout_ms: 1_000,
			max_url_content_chars: 5_000,
		},
		retrieval: recall_config::Retrieval {
			top_k: 5,
			score_threshold: 0.3,
			list_top_k: 50,
			list_score_threshold: 0.0,
			synthesize_answers: false,
			retry_max_attempts: 2,
			retry_base_delay_ms: 1,
		},
		cache: recall_config::Cache { enabled: true, capacity: 16, ttl_secs: 0 },
	}
}

fn test_state() -> (AppState, Arc<InMemoryStore>) {
	let store = Arc::new(InMemoryStore::new(DIM));
	let providers =
		Providers::new(Arc::new(HashEmbedder::new(DIM as usize)), Arc::new(ScriptedChat::empty()));
	let service = RecallService::with_providers(test_config(), store.clone(), providers);

	(AppState::with_service(Arc::new(service)), store)
}

async fn post_json(
	app: axum::Router,
	uri: &str,
	payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri(uri)
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call route.");
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = if bytes.is_empty() {
		serde_json::Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Failed to parse response.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let (state, _) = test_state();
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ingest_then_answer_over_http() {
	let (state, _) = test_state();
	let app = routes::router(state);
	let payload = serde_json::json!({
		"owner_id": "alice",
		"declared_type": "text",
		"content": "The passport is in the top drawer of the desk."
	});
	let (status, json) = post_json(app.clone(), "/v1/memory/ingest", payload).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["stored_chunks"], 1);
	assert_eq!(json["source_type"], "text");

	let payload = serde_json::json!({
		"owner_id": "alice",
		"message": "Where is the passport?"
	});
	let (status, json) = post_json(app, "/v1/memory/answer", payload).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["outcome"]["kind"], "results");
	assert_eq!(json["outcome"]["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn ingest_accepts_base64_content() {
	let (state, store) = test_state();
	let app = routes::router(state);
	let payload = serde_json::json!({
		"owner_id": "alice",
		"declared_type": "text",
		"content_base64": "VGhlIHdpZmkgcGFzc3dvcmQgaXMgaHVtbWluZ2JpcmQu"
	});
	let (status, json) = post_json(app, "/v1/memory/ingest", payload).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["stored_chunks"], 1);
	assert_eq!(store.upsert_calls(), 1);
}

#[tokio::test]
async fn ingest_requires_exactly_one_content_field() {
	let (state, _) = test_state();
	let app = routes::router(state);
	let payload = serde_json::json!({
		"owner_id": "alice",
		"declared_type": "text"
	});
	let (status, json) = post_json(app.clone(), "/v1/memory/ingest", payload).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");

	let payload = serde_json::json!({
		"owner_id": "alice",
		"declared_type": "text",
		"content": "both",
		"content_base64": "Ym90aA=="
	});
	let (status, _) = post_json(app, "/v1/memory/ingest", payload).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ingest_rejects_malformed_base64() {
	let (state, _) = test_state();
	let app = routes::router(state);
	let payload = serde_json::json!({
		"owner_id": "alice",
		"declared_type": "text",
		"content_base64": "not base64!!!"
	});
	let (status, json) = post_json(app, "/v1/memory/ingest", payload).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["fields"][0], "content_base64");
}

#[tokio::test]
async fn unknown_declared_type_maps_to_unsupported_media_type() {
	let (state, _) = test_state();
	let app = routes::router(state);
	let payload = serde_json::json!({
		"owner_id": "alice",
		"declared_type": "xls",
		"content": "quarterly numbers"
	});
	let (status, json) = post_json(app, "/v1/memory/ingest", payload).await;

	assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
	assert_eq!(json["error_code"], "unsupported_format");
}

#[tokio::test]
async fn forget_all_is_two_phase() {
	let (state, store) = test_state();
	let app = routes::router(state);

	for text in ["The car is parked on level 3.", "The dentist appointment is on Tuesday."] {
		let payload = serde_json::json!({
			"owner_id": "alice",
			"declared_type": "text",
			"content": text
		});
		let (status, _) = post_json(app.clone(), "/v1/memory/ingest", payload).await;

		assert_eq!(status, StatusCode::OK);
	}

	let preview = serde_json::json!({ "owner_id": "alice", "confirm": false });
	let (status, json) = post_json(app.clone(), "/v1/memory/forget_all", preview).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["confirmed"], false);
	assert_eq!(json["count"], 2);
	assert_eq!(store.delete_calls(), 0);

	let confirm = serde_json::json!({ "owner_id": "alice", "confirm": true });
	let (status, json) = post_json(app.clone(), "/v1/memory/forget_all", confirm).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["confirmed"], true);
	assert_eq!(json["count"], 2);

	let (status, json) =
		post_json(app, "/v1/memory/list", serde_json::json!({ "owner_id": "alice" })).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn forget_preview_then_confirm_by_id() {
	let (state, _) = test_state();
	let app = routes::router(state);
	let payload = serde_json::json!({
		"owner_id": "alice",
		"declared_type": "text",
		"content": "The locker combination is 4821."
	});
	let (status, _) = post_json(app.clone(), "/v1/memory/ingest", payload).await;

	assert_eq!(status, StatusCode::OK);

	let preview = serde_json::json!({ "owner_id": "alice", "terms": "locker combination" });
	let (status, json) = post_json(app.clone(), "/v1/memory/forget/preview", preview).await;

	assert_eq!(status, StatusCode::OK);

	let matches = json["matches"].as_array().expect("Preview matches.").clone();

	assert!(!matches.is_empty());

	let ids: Vec<serde_json::Value> =
		matches.iter().map(|summary| summary["id"].clone()).collect();
	let confirm = serde_json::json!({ "owner_id": "alice", "ids": ids });
	let (status, json) = post_json(app, "/v1/memory/forget/confirm", confirm).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["deleted"], 1);
}

#[tokio::test]
async fn empty_owner_is_a_bad_request() {
	let (state, _) = test_state();
	let app = routes::router(state);
	let payload = serde_json::json!({ "owner_id": "  ", "message": "anything" });
	let (status, json) = post_json(app, "/v1/memory/answer", payload).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");
}
