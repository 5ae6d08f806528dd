use std::sync::Arc;

use costar_service::CostarService;
use costar_storage::DurableCache;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CostarService>,
}
impl AppState {
	pub async fn new(config: costar_config::Config) -> color_eyre::Result<Self> {
		let durable = DurableCache::open(&config.storage).await;
		let service = CostarService::new(config, durable)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: CostarService) -> Self {
		Self { service: Arc::new(service) }
	}
}
