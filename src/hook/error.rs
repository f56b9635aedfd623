//! Hook construction errors.

use crate::audit::SinkError;
use crate::config::ConfigError;

/// Errors that can occur while building an [`ApiHook`](super::ApiHook).
#[derive(thiserror::Error, Debug)]
pub enum HookError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configured sink could not be opened.
    #[error("Failed to open sink: {0}")]
    Sink(#[from] SinkError),
}
