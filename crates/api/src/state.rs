use std::sync::Arc;

use crate::{config::Config, services::RedemptionService, stores::RedemptionStore};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Redemption state store (health checks go straight to it).
    pub store: Arc<dyn RedemptionStore>,
    /// Redemption orchestrator used by the handlers.
    pub redemption: RedemptionService,
}
