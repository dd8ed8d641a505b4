//! Vector-store contract and the Qdrant implementation behind it.
//!
//! Everything above this crate talks to [`VectorStore`]; tests swap in an
//! in-memory double without touching the retrieval or lifecycle logic.

pub mod models;
pub mod qdrant;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

use std::{cmp::Ordering, pin::Pin};

use uuid::Uuid;

use crate::models::{MemoryRecord, SearchHit};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Storage contract for memory points.
///
/// `upsert` is all-or-nothing: either every record lands or none do.
/// `delete` and `delete_all` return the number of points actually removed,
/// and deleting ids that no longer exist is not an error.
pub trait VectorStore: Send + Sync {
	fn upsert<'a>(&'a self, records: &'a [MemoryRecord]) -> BoxFuture<'a, Result<()>>;

	fn search<'a>(
		&'a self,
		owner_id: &'a str,
		vector: &'a [f32],
		top_k: u32,
		score_threshold: f32,
	) -> BoxFuture<'a, Result<Vec<SearchHit>>>;

	fn delete<'a>(&'a self, owner_id: &'a str, ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>>;

	fn delete_all<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<u64>>;

	fn count<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<u64>>;
}

/// Rejects a batch if any vector's length disagrees with the store's
/// configured dimension, before anything is written.
pub fn ensure_dims(records: &[MemoryRecord], vector_dim: u32) -> Result<()> {
	for record in records {
		let actual = record.vector.len() as u32;

		if actual != vector_dim {
			return Err(Error::DimensionMismatch { expected: vector_dim, actual });
		}
	}

	Ok(())
}

/// Orders hits by score descending, breaking ties by recency then id so
/// equal-scored results are stable across stores.
pub fn rank_hits(hits: &mut [SearchHit]) {
	hits.sort_by(|left, right| {
		cmp_f32_desc(left.score, right.score)
			.then_with(|| right.item.created_at.cmp(&left.item.created_at))
			.then_with(|| left.item.id.cmp(&right.item.id))
	});
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
