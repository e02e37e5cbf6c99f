//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::decoder::PdfDecoder;
use crate::limits::ResourceLimits;
use crate::service::ParseService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    parse_service: ParseService,
}

impl AppState {
    /// Create application state around a decoder
    pub fn new(config: Config, decoder: Arc<dyn PdfDecoder>) -> Self {
        Self::with_limits(config, decoder, ResourceLimits::DEFAULT)
    }

    /// Same as [`AppState::new`] with explicit ceilings
    pub fn with_limits(config: Config, decoder: Arc<dyn PdfDecoder>, limits: ResourceLimits) -> Self {
        let parse_service = ParseService::new(decoder, limits, config.upload.temp_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                parse_service,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the parsing pipeline
    pub fn parse_service(&self) -> &ParseService {
        &self.inner.parse_service
    }
}
