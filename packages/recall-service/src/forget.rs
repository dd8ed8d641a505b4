//! Memory lifecycle: two-phase forgetting.
//!
//! There is no delete-by-terms shortcut. Callers preview matches first and
//! confirm with explicit ids, so an ambiguous phrase can never silently
//! delete the wrong memory. Every confirmed deletion invalidates the
//! owner's cached results before it is acknowledged.

use uuid::Uuid;

use crate::{MemorySummary, RecallService, ServiceError, ServiceResult};

impl RecallService {
	/// Read-only, idempotent: similarity search over the owner's memories
	/// with the relaxed listing threshold, so near-matches show up in the
	/// preview rather than surprising the user later.
	pub async fn preview_forget(
		&self,
		owner_id: &str,
		terms: &str,
	) -> ServiceResult<Vec<MemorySummary>> {
		let owner_id = validated_owner(owner_id)?;
		let terms = terms.trim();

		if terms.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "forget terms must not be empty.".to_string(),
			});
		}

		let vector = self.embed_query(terms).await?;
		let hits = self
			.store
			.search(
				owner_id,
				&vector,
				self.cfg.retrieval.list_top_k,
				self.cfg.retrieval.list_score_threshold,
			)
			.await?;

		Ok(hits.iter().map(MemorySummary::from).collect())
	}

	/// The only mutating call. Ids that no longer exist are skipped, not
	/// errors, so a retried confirmation stays idempotent.
	pub async fn confirm_forget(&self, owner_id: &str, ids: &[Uuid]) -> ServiceResult<u64> {
		let owner_id = validated_owner(owner_id)?;

		if ids.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "confirm_forget requires at least one id.".to_string(),
			});
		}

		let deleted = self.store.delete(owner_id, ids).await?;

		self.invalidate_owner(owner_id)?;

		tracing::info!(owner_id, deleted, "Memories deleted.");

		Ok(deleted)
	}

	/// How many memories `forget_all` would remove.
	pub async fn preview_forget_all(&self, owner_id: &str) -> ServiceResult<u64> {
		let owner_id = validated_owner(owner_id)?;

		Ok(self.store.count(owner_id).await?)
	}

	pub async fn forget_all(&self, owner_id: &str) -> ServiceResult<u64> {
		let owner_id = validated_owner(owner_id)?;
		let deleted = self.store.delete_all(owner_id).await?;

		self.invalidate_owner(owner_id)?;

		tracing::info!(owner_id, deleted, "All memories deleted.");

		Ok(deleted)
	}

	/// Cache consistency protocol: runs after the store delete and before
	/// the deletion is acknowledged, so no later read can serve a result
	/// referencing a deleted memory.
	fn invalidate_owner(&self, owner_id: &str) -> ServiceResult<()> {
		self.cache.invalidate_all(owner_id);

		if self.cache.owner_entries(owner_id) > 0 {
			tracing::error!(owner_id, "Cache entries survived invalidation; retrying once.");
			self.cache.invalidate_all(owner_id);

			if self.cache.owner_entries(owner_id) > 0 {
				return Err(ServiceError::CacheInconsistency {
					message: format!("Cached results for {owner_id} could not be invalidated."),
				});
			}
		}

		Ok(())
	}
}

fn validated_owner(owner_id: &str) -> ServiceResult<&str> {
	let owner_id = owner_id.trim();

	if owner_id.is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "owner_id must not be empty.".to_string(),
		});
	}

	Ok(owner_id)
}
