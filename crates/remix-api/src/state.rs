//! Application state.

use std::sync::Arc;
use std::time::Instant;

use remix_media::MediaResult;
use remix_pipeline::{PipelineConfig, RemixOrchestrator};

use crate::config::ApiConfig;
use crate::system::SystemMonitor;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<RemixOrchestrator>,
    pub system: Arc<SystemMonitor>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the production pipeline.
    pub fn new(config: ApiConfig, pipeline: PipelineConfig) -> MediaResult<Self> {
        let orchestrator = RemixOrchestrator::from_config(pipeline)?;
        Ok(Self::from_parts(config, Arc::new(orchestrator)))
    }

    /// Assemble state around an existing orchestrator.
    pub fn from_parts(config: ApiConfig, orchestrator: Arc<RemixOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            system: Arc::new(SystemMonitor::new()),
            started_at: Instant::now(),
        }
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        self.orchestrator.config()
    }
}
