//! Call interception and manual event entry points.
//!
//! [`ApiHook`] ties a validated [`HookConfig`] to a [`Sink`] and hands out
//! [`Monitored`] endpoints and an [`EventRecorder`]. Both paths share one
//! [`Pipeline`].

mod error;
mod extract;
mod interceptor;
mod pipeline;
mod recorder;

use std::sync::Arc;

use crate::audit::{Alert, EventSeverity, Parameters};
use crate::config::HookConfig;
use crate::sink::{open_sink, Sink};

pub use error::HookError;
pub use extract::{
    CallerExtractor, CallerInfo, KeyExtractor, DEFAULT_METHOD, DEFAULT_SOURCE_IP, DEFAULT_USER_ID,
};
pub use interceptor::{Interceptor, MonitorOptions, Monitored, SecurityLevel};
pub use pipeline::Pipeline;
pub use recorder::EventRecorder;

/// Entry point for monitoring calls and recording events.
#[derive(Debug, Clone)]
pub struct ApiHook {
    config: Arc<HookConfig>,
    interceptor: Interceptor,
    recorder: EventRecorder,
}

impl ApiHook {
    /// Build a hook that writes to `sink`, reading caller metadata with
    /// [`KeyExtractor`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: HookConfig, sink: Arc<dyn Sink>) -> Result<Self, HookError> {
        Self::with_extractor(config, sink, KeyExtractor::new())
    }

    /// Build a hook with a custom caller extractor.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_extractor(
        config: HookConfig,
        sink: Arc<dyn Sink>,
        extractor: impl CallerExtractor + 'static,
    ) -> Result<Self, HookError> {
        let pipeline = Arc::new(Pipeline::from_config(&config, sink)?);
        tracing::info!(
            sensitive_fields = config.security.sensitive_fields.len(),
            storage = config.logging.storage.as_str(),
            "API hook initialized"
        );
        Ok(Self {
            config: Arc::new(config),
            interceptor: Interceptor::with_extractor(pipeline.clone(), extractor),
            recorder: EventRecorder::new(pipeline),
        })
    }

    /// Build a hook writing to the sink named in `config.logging`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the sink cannot be
    /// opened.
    pub async fn from_config(config: HookConfig) -> Result<Self, HookError> {
        config.validate()?;
        let sink = open_sink(&config.logging).await?;
        Self::new(config, sink)
    }

    #[must_use]
    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    #[must_use]
    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    #[must_use]
    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    /// Wrap an endpoint.
    pub fn monitor(&self, endpoint: impl Into<String>, options: MonitorOptions) -> Monitored {
        self.interceptor.wrap(endpoint, options)
    }

    /// Record a manual event. See [`EventRecorder::record`].
    pub async fn log_event(
        &self,
        event_type: &str,
        severity: EventSeverity,
        message: &str,
        metadata: Option<Parameters>,
    ) -> Option<Alert> {
        self.recorder
            .record(event_type, severity, message, metadata)
            .await
    }
}
