use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{IngestRequest, RecallService, ServiceError, ServiceResult};
use recall_domain::intent::{Classification, Intent};
use recall_storage::models::{SearchHit, SourceType};

const CLASSIFY_SYSTEM: &str = "You classify one user message sent to a personal memory \
	assistant. Reply with exactly one word: \"question\" if the user wants information back, \
	\"storage\" if the user wants something remembered, or \"list\" if the user wants an \
	overview of what is stored.";
const ANSWER_SYSTEM: &str = "You answer a question using only the numbered memories provided \
	by the user. If the memories do not contain the answer, say that you don't remember. Never \
	invent facts, and never use knowledge beyond the memories.";

#[derive(Clone, Debug, Serialize)]
pub struct MemorySummary {
	pub id: Uuid,
	pub text: String,
	pub score: f32,
	pub source_type: SourceType,
	pub source_metadata: serde_json::Value,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl From<&SearchHit> for MemorySummary {
	fn from(hit: &SearchHit) -> Self {
		Self {
			id: hit.item.id,
			text: hit.item.text.clone(),
			score: hit.score,
			source_type: hit.item.source_type,
			source_metadata: hit.item.source_metadata.clone(),
			created_at: hit.item.created_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerOutcome {
	/// Synthesized answer grounded in the cited memories.
	Answer { text: String, sources: Vec<MemorySummary> },
	/// Raw retrieval results, most relevant first.
	Results { items: Vec<MemorySummary> },
	/// The message was a storage request and has been ingested.
	Stored { stored_chunks: u32 },
	/// Retrieval found nothing above the threshold. Deliberately not an
	/// error and deliberately not a made-up answer.
	NothingFound,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnswerResponse {
	pub intent: Intent,
	pub outcome: AnswerOutcome,
}

impl RecallService {
	/// The conversational entry point: classifies the message, then routes
	/// it to storage or cache-first retrieval.
	pub async fn answer(&self, owner_id: &str, raw_query: &str) -> ServiceResult<AnswerResponse> {
		let owner_id = owner_id.trim();
		let query = raw_query.trim();

		if owner_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "owner_id must not be empty.".to_string(),
			});
		}
		if query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must not be empty.".to_string(),
			});
		}

		let intent = self.resolve_intent(query).await;

		match intent {
			Intent::StorageRequest => {
				let response = self
					.ingest(IngestRequest {
						owner_id: owner_id.to_string(),
						content: query.as_bytes().to_vec(),
						declared_type: "text".to_string(),
						source_name: None,
					})
					.await?;

				Ok(AnswerResponse {
					intent,
					outcome: AnswerOutcome::Stored { stored_chunks: response.stored_chunks },
				})
			},
			Intent::Question | Intent::ListQuery => {
				let (top_k, threshold) = if intent == Intent::ListQuery {
					(self.cfg.retrieval.list_top_k, self.cfg.retrieval.list_score_threshold)
				} else {
					(self.cfg.retrieval.top_k, self.cfg.retrieval.score_threshold)
				};
				let fingerprint = recall_domain::fingerprint::fingerprint(query);

				if let Some(cached) = self.cache.get(owner_id, &fingerprint) {
					// Thresholds are runtime config: re-validate cached
					// scores instead of trusting insertion-time filtering.
					let hits: Vec<SearchHit> =
						cached.into_iter().filter(|hit| hit.score >= threshold).collect();

					tracing::debug!(owner_id, fingerprint, "Answer served from cache.");

					return self.finish(intent, query, hits).await;
				}

				// Snapshotted before the store read: a deletion landing
				// mid-flight bumps it and the put below becomes a no-op.
				let generation = self.cache.generation(owner_id);
				let vector = self.embed_query(query).await?;
				let hits = self.store.search(owner_id, &vector, top_k, threshold).await?;

				self.cache.put(owner_id, &fingerprint, hits.clone(), generation);

				self.finish(intent, query, hits).await
			},
		}
	}

	async fn resolve_intent(&self, query: &str) -> Intent {
		match recall_domain::intent::classify(query) {
			Classification::Resolved(intent) => intent,
			Classification::Ambiguous => self.classify_with_llm(query).await,
		}
	}

	/// LLM fallback for messages the rule classifier cannot place. Any
	/// failure here degrades to Question: retrieval is read-only, storage
	/// is not.
	async fn classify_with_llm(&self, query: &str) -> Intent {
		match self.complete_chat(CLASSIFY_SYSTEM, query).await {
			Ok(reply) => {
				let reply = reply.to_lowercase();

				if reply.contains("storage") {
					Intent::StorageRequest
				} else if reply.contains("list") {
					Intent::ListQuery
				} else {
					Intent::Question
				}
			},
			Err(err) => {
				tracing::warn!(error = %err, "Intent classification fell back to question.");

				Intent::Question
			},
		}
	}

	async fn finish(
		&self,
		intent: Intent,
		query: &str,
		hits: Vec<SearchHit>,
	) -> ServiceResult<AnswerResponse> {
		if hits.is_empty() {
			return Ok(AnswerResponse { intent, outcome: AnswerOutcome::NothingFound });
		}

		let items: Vec<MemorySummary> = hits.iter().map(MemorySummary::from).collect();

		if intent == Intent::Question && self.cfg.retrieval.synthesize_answers {
			match self.synthesize(query, &hits).await {
				Ok(text) =>
					return Ok(AnswerResponse {
						intent,
						outcome: AnswerOutcome::Answer { text, sources: items },
					}),
				Err(err) => {
					tracing::warn!(error = %err, "Answer synthesis failed; returning raw results.");
				},
			}
		}

		Ok(AnswerResponse { intent, outcome: AnswerOutcome::Results { items } })
	}

	async fn synthesize(&self, query: &str, hits: &[SearchHit]) -> ServiceResult<String> {
		let mut context = String::new();

		for (index, hit) in hits.iter().enumerate() {
			context.push_str(&format!("{}. {}\n", index + 1, hit.item.text));
		}

		let user = format!("Memories:\n{context}\nQuestion: {query}");

		self.complete_chat(ANSWER_SYSTEM, &user).await
	}
}
