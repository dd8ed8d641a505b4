//! Hermetic doubles for the storage and provider seams.
//!
//! [`InMemoryStore`] mirrors the vector-store contract over a `Vec` and
//! counts calls, so tests can assert that a cached query never reached the
//! store. [`HashEmbedder`] is a deterministic bag-of-words embedder whose
//! cosine similarity approximates token overlap, which makes relevance
//! assertions readable: texts sharing words score high, disjoint texts
//! score near zero.

use std::{
	collections::VecDeque,
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};

use uuid::Uuid;

use recall_providers::{ChatProvider, EmbeddingProvider};
use recall_storage::{
	BoxFuture, Error, Result, VectorStore, ensure_dims,
	models::{MemoryItem, MemoryRecord, SearchHit, SourceType},
	rank_hits,
};

pub struct InMemoryStore {
	vector_dim: u32,
	records: Mutex<Vec<MemoryRecord>>,
	failing: AtomicBool,
	search_calls: AtomicUsize,
	upsert_calls: AtomicUsize,
	delete_calls: AtomicUsize,
}
impl InMemoryStore {
	pub fn new(vector_dim: u32) -> Self {
		Self {
			vector_dim,
			records: Mutex::new(Vec::new()),
			failing: AtomicBool::new(false),
			search_calls: AtomicUsize::new(0),
			upsert_calls: AtomicUsize::new(0),
			delete_calls: AtomicUsize::new(0),
		}
	}

	/// When set, every store call fails until cleared.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn search_calls(&self) -> usize {
		self.search_calls.load(Ordering::SeqCst)
	}

	pub fn upsert_calls(&self) -> usize {
		self.upsert_calls.load(Ordering::SeqCst)
	}

	pub fn delete_calls(&self) -> usize {
		self.delete_calls.load(Ordering::SeqCst)
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn items(&self) -> Vec<MemoryItem> {
		self.lock().iter().map(|record| record.item.clone()).collect()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MemoryRecord>> {
		self.records.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn check_failing(&self) -> Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(Error::InvalidPayload("Injected store failure.".to_string()));
		}

		Ok(())
	}
}
impl VectorStore for InMemoryStore {
	fn upsert<'a>(&'a self, records: &'a [MemoryRecord]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.upsert_calls.fetch_add(1, Ordering::SeqCst);
			self.check_failing()?;
			ensure_dims(records, self.vector_dim)?;

			let mut stored = self.lock();

			for record in records {
				stored.retain(|existing| existing.item.id != record.item.id);
				stored.push(record.clone());
			}

			Ok(())
		})
	}

	fn search<'a>(
		&'a self,
		owner_id: &'a str,
		vector: &'a [f32],
		top_k: u32,
		score_threshold: f32,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>> {
		Box::pin(async move {
			self.search_calls.fetch_add(1, Ordering::SeqCst);
			self.check_failing()?;

			let mut hits: Vec<SearchHit> = self
				.lock()
				.iter()
				.filter(|record| record.item.owner_id == owner_id)
				.map(|record| SearchHit {
					item: record.item.clone(),
					score: cosine(vector, &record.vector),
				})
				.filter(|hit| hit.score >= score_threshold)
				.collect();

			rank_hits(&mut hits);
			hits.truncate(top_k as usize);

			Ok(hits)
		})
	}

	fn delete<'a>(&'a self, owner_id: &'a str, ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.delete_calls.fetch_add(1, Ordering::SeqCst);
			self.check_failing()?;

			let mut stored = self.lock();
			let before = stored.len();

			stored.retain(|record| {
				record.item.owner_id != owner_id || !ids.contains(&record.item.id)
			});

			Ok((before - stored.len()) as u64)
		})
	}

	fn delete_all<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.delete_calls.fetch_add(1, Ordering::SeqCst);
			self.check_failing()?;

			let mut stored = self.lock();
			let before = stored.len();

			stored.retain(|record| record.item.owner_id != owner_id);

			Ok((before - stored.len()) as u64)
		})
	}

	fn count<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.check_failing()?;

			Ok(self.lock().iter().filter(|record| record.item.owner_id == owner_id).count() as u64)
		})
	}
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
	let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
	let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a * norm_b)
}

/// Deterministic embedder: tokens hash into buckets, counts are
/// L2-normalized. No network, no model, stable across runs.
pub struct HashEmbedder {
	pub dimensions: usize,
}
impl HashEmbedder {
	pub fn new(dimensions: usize) -> Self {
		Self { dimensions }
	}

	pub fn embed(&self, text: &str) -> Vec<f32> {
		let mut vector = vec![0.0_f32; self.dimensions];

		for token in text.to_lowercase().split_whitespace() {
			let token = token.trim_matches(|c: char| c.is_ascii_punctuation());

			if token.is_empty() {
				continue;
			}

			let hash = blake3::hash(token.as_bytes());
			let bucket = u64::from_le_bytes(
				hash.as_bytes()[..8].try_into().unwrap_or([0; 8]),
			) as usize % self.dimensions;

			vector[bucket] += 1.0;
		}

		let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

		if norm > 0.0 {
			for value in &mut vector {
				*value /= norm;
			}
		}

		vector
	}
}
impl EmbeddingProvider for HashEmbedder {
	fn embed_passages<'a>(
		&'a self,
		texts: &'a [String],
	) -> recall_providers::BoxFuture<'a, recall_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(texts.iter().map(|text| self.embed(text)).collect()) })
	}

	fn embed_query<'a>(
		&'a self,
		text: &'a str,
	) -> recall_providers::BoxFuture<'a, recall_providers::Result<Vec<f32>>> {
		Box::pin(async move { Ok(self.embed(text)) })
	}
}

/// Chat double that replays scripted responses in order. Running out of
/// script is a test bug and surfaces as a provider error.
pub struct ScriptedChat {
	responses: Mutex<VecDeque<String>>,
	calls: AtomicUsize,
}
impl ScriptedChat {
	pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
			calls: AtomicUsize::new(0),
		}
	}

	/// A chat double with no script: every call fails.
	pub fn empty() -> Self {
		Self { responses: Mutex::new(VecDeque::new()), calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl ChatProvider for ScriptedChat {
	fn complete<'a>(
		&'a self,
		_system: &'a str,
		_user: &'a str,
	) -> recall_providers::BoxFuture<'a, recall_providers::Result<String>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let mut responses = self.responses.lock().unwrap_or_else(|err| err.into_inner());

			responses.pop_front().ok_or_else(|| recall_providers::Error::InvalidResponse {
				message: "Scripted chat ran out of responses.".to_string(),
			})
		})
	}
}

/// A minimal stored item for tests that only care about text and owner.
pub fn text_item(owner_id: &str, text: &str) -> MemoryItem {
	MemoryItem {
		id: Uuid::new_v4(),
		owner_id: owner_id.to_string(),
		text: text.to_string(),
		source_type: SourceType::Text,
		source_metadata: serde_json::Value::Null,
		created_at: time::OffsetDateTime::now_utc(),
	}
}
