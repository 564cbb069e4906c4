//! Detection backends.
//!
//! The engine only talks to a [`DetectionBackend`]. [`mock::MockBackend`] synthesizes
//! evidence locally; [`remote::RemoteBackend`] calls a detection service over HTTP.
//! Anything implementing the trait is a drop-in replacement for either.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, BackendKind};
use crate::core::classifier::Assessment;
use crate::core::error::ShieldError;
use crate::core::types::{ThreatIntelligence, UsageStats};

pub mod mock;
pub mod remote;

#[async_trait]
pub trait DetectionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw observations for one URL. The engine classifies them.
    async fn assess(&self, url: &str) -> Result<Assessment, ShieldError>;

    /// Full, unfiltered threat snapshot.
    async fn threats(&self) -> Result<Vec<ThreatIntelligence>, ShieldError>;

    async fn usage(&self) -> Result<UsageStats, ShieldError>;
}

pub fn build_backend(config: &AppConfig) -> Result<Arc<dyn DetectionBackend>, ShieldError> {
    match config.backend {
        BackendKind::Mock => Ok(Arc::new(mock::MockBackend::from_config(config))),
        BackendKind::Remote => Ok(Arc::new(remote::RemoteBackend::new(config)?)),
    }
}
