use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{RecallService, ServiceError, ServiceResult};
use recall_extract::DeclaredType;
use recall_storage::models::{MemoryItem, MemoryRecord, SourceType};

#[derive(Clone, Debug)]
pub struct IngestRequest {
	pub owner_id: String,
	pub content: Vec<u8>,
	/// Filename extension or explicit type tag, e.g. "pdf", "md", "url".
	pub declared_type: String,
	pub source_name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct IngestResponse {
	pub stored_chunks: u32,
	pub source_type: String,
}

impl RecallService {
	/// Normalizes, embeds, and stores one input. All chunks of the input go
	/// to the store in a single upsert: either the whole document is
	/// remembered or none of it is.
	pub async fn ingest(&self, req: IngestRequest) -> ServiceResult<IngestResponse> {
		let owner_id = req.owner_id.trim();

		if owner_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "owner_id must not be empty.".to_string(),
			});
		}
		if req.content.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "content must not be empty.".to_string(),
			});
		}

		let declared: DeclaredType = req.declared_type.parse()?;
		let chunks =
			self.normalizer.normalize(&req.content, declared, req.source_name.as_deref()).await?;

		if chunks.is_empty() {
			return Err(ServiceError::ExtractionFailed {
				message: "Input produced no text to remember.".to_string(),
			});
		}

		let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
		let vectors = self.embed_passages(&texts).await?;
		let source_type: SourceType = declared
			.source_kind()
			.parse()
			.map_err(|message| ServiceError::InvalidRequest { message })?;
		let now = OffsetDateTime::now_utc();
		let records: Vec<MemoryRecord> = chunks
			.into_iter()
			.zip(vectors)
			.map(|(chunk, vector)| MemoryRecord {
				item: MemoryItem {
					id: Uuid::new_v4(),
					owner_id: owner_id.to_string(),
					text: chunk.text,
					source_type,
					source_metadata: chunk.metadata,
					created_at: now,
				},
				vector,
			})
			.collect();

		self.store.upsert(&records).await?;

		tracing::info!(
			owner_id,
			chunks = records.len(),
			source_type = source_type.as_str(),
			"Stored memory chunks."
		);

		Ok(IngestResponse {
			stored_chunks: records.len() as u32,
			source_type: source_type.as_str().to_string(),
		})
	}
}
