use std::sync::Arc;

use compass_service::CompassService;
use compass_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CompassService>,
}
impl AppState {
	pub async fn new(config: compass_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.storage.qdrant.vector_dim).await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collections().await?;

		let service = CompassService::new(config, db, qdrant);

		Ok(Self { service: Arc::new(service) })
	}
}
