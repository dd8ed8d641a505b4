use crate::{MemorySummary, RecallService, ServiceError, ServiceResult};

// Probe text for an unqualified listing. With the list threshold at its
// default of zero the search degenerates to "the nearest list_top_k items",
// which is exactly what an overview wants.
const DEFAULT_LIST_PROBE: &str = "everything I have saved";

impl RecallService {
	/// Breadth-first overview of an owner's memories: relaxed top_k and
	/// threshold, optionally focused by a query.
	pub async fn list(
		&self,
		owner_id: &str,
		query: Option<&str>,
	) -> ServiceResult<Vec<MemorySummary>> {
		let owner_id = owner_id.trim();

		if owner_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "owner_id must not be empty.".to_string(),
			});
		}

		let probe = match query.map(str::trim) {
			Some(query) if !query.is_empty() => query,
			_ => DEFAULT_LIST_PROBE,
		};
		let vector = self.embed_query(probe).await?;
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
}
