use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, GraderKind};
use crate::random_grader::RandomGrader;
use crate::remote_grader::RemoteGrader;
use crate::types::{PredictionRequest, PredictionResult};

#[async_trait]
pub trait Grader {
    async fn grade(&self, request: &PredictionRequest) -> Result<PredictionResult>;
}

/// Builds the grader selected by `GRADER`.
pub fn from_config(config: &Config) -> Result<Arc<dyn Grader + Send + Sync>> {
    match config.grader {
        GraderKind::Random => {
            tracing::info!("Using random grader, predictions are fabricated");
            Ok(Arc::new(RandomGrader::new()?))
        }
        GraderKind::Remote => {
            let Some(base_url) = config.ml_service_url.as_deref() else {
                bail!("--ml-service-url must be provided when --grader=remote");
            };
            tracing::info!(ml_service_url = %base_url, "Using remote grader");
            Ok(Arc::new(RemoteGrader::new(base_url)?))
        }
    }
}
