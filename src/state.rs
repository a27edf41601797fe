//! Application state management

use std::sync::Arc;

use crate::assembler::DocumentAssembler;
use crate::config::Config;
use crate::render::{default_rasterizer, Rasterizer};
use crate::transparency::{ThresholdProvider, TransparencyService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    assembler: DocumentAssembler,
    transparency: TransparencyService,
    threshold: ThresholdProvider,
}

impl AppState {
    /// Create state with the best rasterizer this build offers
    pub fn new(config: Config) -> Self {
        Self::with_rasterizer(config, default_rasterizer())
    }

    pub fn with_rasterizer(config: Config, rasterizer: Arc<dyn Rasterizer>) -> Self {
        let assembler = DocumentAssembler::new(rasterizer, config.assembly.rotated_page_scale);
        let transparency = TransparencyService::new(&config.transparency);
        let threshold = ThresholdProvider::new(config.transparency.threshold);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                assembler,
                transparency,
                threshold,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the document assembler
    pub fn assembler(&self) -> &DocumentAssembler {
        &self.inner.assembler
    }

    /// Get the configured transparency service
    pub fn transparency(&self) -> &TransparencyService {
        &self.inner.transparency
    }

    /// Local threshold pass, used by `/convert_signature` regardless of mode
    pub fn threshold(&self) -> &ThresholdProvider {
        &self.inner.threshold
    }
}
