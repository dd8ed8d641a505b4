use std::sync::Arc;

use recall_service::RecallService;
use recall_storage::qdrant::QdrantStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RecallService>,
}
impl AppState {
	pub async fn new(config: recall_config::Config) -> color_eyre::Result<Self> {
		let store = QdrantStore::new(&config.storage.qdrant)?;

		store.ensure_collection().await?;

		let service = RecallService::new(config, Arc::new(store));

		Ok(Self { service: Arc::new(service) })
	}

	pub fn with_service(service: Arc<RecallService>) -> Self {
		Self { service }
	}
}
