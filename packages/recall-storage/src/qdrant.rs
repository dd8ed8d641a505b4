use std::collections::HashMap;

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
		DeletePointsBuilder, Distance, FieldType, Filter, PointId, PointStruct, Query,
		QueryPointsBuilder, ScoredPoint, UpsertPointsBuilder, Value, VectorParamsBuilder,
		point_id::PointIdOptions, value::Kind,
	},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
	BoxFuture, Error, Result, VectorStore, ensure_dims,
	models::{MemoryItem, MemoryRecord, SearchHit, SourceType},
	rank_hits,
};

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &recall_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).api_key(cfg.api_key.clone()).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection and the `owner_id` payload index when they do
	/// not exist yet. Safe to call on every startup.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		self.client
			.create_collection(CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
				VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
			))
			.await?;
		self.client
			.create_field_index(CreateFieldIndexCollectionBuilder::new(
				self.collection.clone(),
				"owner_id",
				FieldType::Keyword,
			))
			.await?;

		Ok(())
	}

	async fn count_filtered(&self, filter: Filter) -> Result<u64> {
		let response = self
			.client
			.count(CountPointsBuilder::new(self.collection.clone()).filter(filter).exact(true))
			.await?;

		Ok(response.result.map(|result| result.count).unwrap_or(0))
	}
}
impl VectorStore for QdrantStore {
	fn upsert<'a>(&'a self, records: &'a [MemoryRecord]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			ensure_dims(records, self.vector_dim)?;

			if records.is_empty() {
				return Ok(());
			}

			let points = records.iter().map(record_to_point).collect::<Result<Vec<_>>>()?;

			self.client
				.upsert_points(
					UpsertPointsBuilder::new(self.collection.clone(), points).wait(true),
				)
				.await?;

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
			let mut search = QueryPointsBuilder::new(self.collection.clone())
				.query(Query::new_nearest(vector.to_vec()))
				.filter(owner_filter(owner_id))
				.limit(top_k as u64)
				.with_payload(true);

			if score_threshold > 0.0 {
				search = search.score_threshold(score_threshold);
			}

			let response = self.client.query(search).await?;
			let mut hits: Vec<SearchHit> =
				response.result.iter().filter_map(point_to_hit).collect();

			rank_hits(&mut hits);

			Ok(hits)
		})
	}

	fn delete<'a>(&'a self, owner_id: &'a str, ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			if ids.is_empty() {
				return Ok(0);
			}

			let filter = Filter::all([
				Condition::matches("owner_id", owner_id.to_string()),
				Condition::has_id(ids.iter().map(|id| PointId::from(id.to_string()))),
			]);
			let matched = self.count_filtered(filter.clone()).await?;

			if matched == 0 {
				return Ok(0);
			}

			self.client
				.delete_points(
					DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true),
				)
				.await?;

			Ok(matched)
		})
	}

	fn delete_all<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let filter = owner_filter(owner_id);
			let matched = self.count_filtered(filter.clone()).await?;

			if matched == 0 {
				return Ok(0);
			}

			self.client
				.delete_points(
					DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true),
				)
				.await?;

			Ok(matched)
		})
	}

	fn count<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { self.count_filtered(owner_filter(owner_id)).await })
	}
}

fn owner_filter(owner_id: &str) -> Filter {
	Filter::all([Condition::matches("owner_id", owner_id.to_string())])
}

fn record_to_point(record: &MemoryRecord) -> Result<PointStruct> {
	let item = &record.item;
	let mut payload = Payload::new();

	payload.insert("owner_id", serde_json::Value::from(item.owner_id.clone()));
	payload.insert("text", serde_json::Value::from(item.text.clone()));
	payload.insert("source_type", serde_json::Value::from(item.source_type.as_str()));
	payload.insert("source_metadata", item.source_metadata.clone());
	payload.insert("created_at", serde_json::Value::from(format_timestamp(item.created_at)?));

	Ok(PointStruct::new(item.id.to_string(), record.vector.clone(), payload))
}

fn point_to_hit(point: &ScoredPoint) -> Option<SearchHit> {
	let Some(id) = point.id.as_ref().and_then(point_id_to_uuid) else {
		tracing::warn!("Search hit is missing a uuid point id.");

		return None;
	};
	let Some(item) = payload_to_item(id, &point.payload) else {
		tracing::warn!(id = %id, "Search hit has an unreadable payload.");

		return None;
	};

	Some(SearchHit { item, score: point.score })
}

fn payload_to_item(id: Uuid, payload: &HashMap<String, Value>) -> Option<MemoryItem> {
	let owner_id = payload_string(payload, "owner_id")?;
	let text = payload_string(payload, "text")?;
	let source_type: SourceType = payload_string(payload, "source_type")?.parse().ok()?;
	let source_metadata =
		payload.get("source_metadata").map(value_to_json).unwrap_or(serde_json::Value::Null);
	let created_at = payload_rfc3339(payload, "created_at")?;

	Some(MemoryItem { id, owner_id, text, source_type, source_metadata, created_at })
}

fn value_to_json(value: &Value) -> serde_json::Value {
	match &value.kind {
		None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
		Some(Kind::BoolValue(value)) => serde_json::Value::Bool(*value),
		Some(Kind::IntegerValue(value)) => serde_json::Value::from(*value),
		Some(Kind::DoubleValue(value)) => serde_json::Value::from(*value),
		Some(Kind::StringValue(value)) => serde_json::Value::from(value.clone()),
		Some(Kind::ListValue(list)) =>
			serde_json::Value::Array(list.values.iter().map(value_to_json).collect()),
		Some(Kind::StructValue(fields)) => serde_json::Value::Object(
			fields
				.fields
				.iter()
				.map(|(key, value)| (key.clone(), value_to_json(value)))
				.collect(),
		),
	}
}

fn format_timestamp(ts: OffsetDateTime) -> Result<String> {
	ts.format(&Rfc3339)
		.map_err(|_| Error::InvalidPayload("Failed to format created_at timestamp.".to_string()))
}

fn point_id_to_uuid(point_id: &PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

fn payload_rfc3339(payload: &HashMap<String, Value>, key: &str) -> Option<OffsetDateTime> {
	let text = payload_string(payload, key)?;

	OffsetDateTime::parse(text.as_str(), &Rfc3339).ok()
}
