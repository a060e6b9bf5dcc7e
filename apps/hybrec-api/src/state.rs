use std::sync::Arc;

use hybrec_service::{RecommendService, Sources};
use hybrec_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RecommendService>,
}
impl AppState {
	pub async fn new(config: hybrec_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = RecommendService::new(config, Sources::postgres(db.pool));

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: RecommendService) -> Self {
		Self { service: Arc::new(service) }
	}
}
