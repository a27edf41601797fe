//! Transparency service
//!
//! Picks a provider from configuration and applies it to signature assets.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{SignError, SignResult};
use crate::placement::{drawn_signature_name, AssetId, DrawingCapture, PlacementStore};

use super::provider::{RemoteProvider, ThresholdProvider, TransparencyProvider};
use super::types::{TransparencyConfig, TransparencyMode};

/// Background removal for uploaded and drawn signatures
pub struct TransparencyService {
    provider: Option<Arc<dyn TransparencyProvider>>,
    process_drawn: bool,
}

impl TransparencyService {
    pub fn new(config: &TransparencyConfig) -> Self {
        let provider: Option<Arc<dyn TransparencyProvider>> = match config.mode {
            TransparencyMode::Local => Some(Arc::new(ThresholdProvider::new(config.threshold))),
            TransparencyMode::Remote => match &config.remote_url {
                Some(url) => Some(Arc::new(RemoteProvider::new(url))),
                None => {
                    warn!("Remote transparency mode without a URL, using local threshold pass");
                    Some(Arc::new(ThresholdProvider::new(config.threshold)))
                }
            },
            TransparencyMode::Disabled => None,
        };

        Self {
            provider,
            process_drawn: config.process_drawn,
        }
    }

    pub fn with_provider(provider: Arc<dyn TransparencyProvider>, process_drawn: bool) -> Self {
        Self {
            provider: Some(provider),
            process_drawn,
        }
    }

    pub fn mode(&self) -> TransparencyMode {
        self.provider
            .as_ref()
            .map_or(TransparencyMode::Disabled, |p| p.mode())
    }

    pub async fn is_available(&self) -> bool {
        match &self.provider {
            Some(p) => p.is_available().await,
            None => false,
        }
    }

    /// Remove the background of a stored asset
    ///
    /// On success the asset's bytes are replaced in one step and it is marked
    /// processed; on failure the store is untouched. Returns whether the
    /// asset changed.
    pub async fn process_asset(&self, store: &mut PlacementStore, id: AssetId) -> SignResult<bool> {
        let asset = store.asset(id).ok_or(SignError::AssetNotFound(id))?;
        if asset.is_background_processed {
            return Ok(false);
        }
        let Some(provider) = &self.provider else {
            return Ok(false);
        };

        let bytes = asset.image_bytes.clone();
        let processed = provider.remove_background(&bytes).await?;
        let revision = store.replace_asset_bytes(id, processed, true)?;
        info!(asset_id = %id, revision, mode = ?provider.mode(), "Background removed");
        Ok(true)
    }

    /// Store a drawn signature as a new asset
    ///
    /// Fails with `NothingToCommit` when nothing was drawn.
    pub async fn save_drawing(
        &self,
        store: &mut PlacementStore,
        capture: &dyn DrawingCapture,
    ) -> SignResult<AssetId> {
        if capture.is_empty() {
            return Err(SignError::NothingToCommit(
                "draw a signature first".to_string(),
            ));
        }
        let png = capture.to_png()?;
        let name = drawn_signature_name(Utc::now());

        let (bytes, processed) = match (&self.provider, self.process_drawn) {
            (Some(provider), true) => (provider.remove_background(&png).await?, true),
            _ => (png, false),
        };

        let id = store.add_asset(bytes, name, processed);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::provider::MockProvider;
    use super::*;
    use crate::error::SignResult;

    struct FakeDrawing(Option<Vec<u8>>);

    impl DrawingCapture for FakeDrawing {
        fn is_empty(&self) -> bool {
            self.0.is_none()
        }

        fn to_png(&self) -> SignResult<Vec<u8>> {
            self.0
                .clone()
                .ok_or_else(|| SignError::NothingToCommit("empty".to_string()))
        }
    }

    #[tokio::test]
    async fn test_process_asset_replaces_bytes() {
        let mock = Arc::new(MockProvider::returning(Some(vec![7, 7, 7])));
        let service = TransparencyService::with_provider(mock.clone(), true);
        let mut store = PlacementStore::new();
        let id = store.add_asset(vec![1, 2, 3], "upload.jpg", false);

        assert!(service.process_asset(&mut store, id).await.unwrap());
        let asset = store.asset(id).unwrap();
        assert_eq!(asset.image_bytes.as_slice(), &[7, 7, 7]);
        assert!(asset.is_background_processed);
        assert_eq!(asset.revision, 1);

        // Already processed
        assert!(!service.process_asset(&mut store, id).await.unwrap());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_processing_leaves_asset_untouched() {
        let service = TransparencyService::with_provider(Arc::new(MockProvider::returning(None)), true);
        let mut store = PlacementStore::new();
        let id = store.add_asset(vec![1, 2, 3], "upload.png", false);

        let err = service.process_asset(&mut store, id).await.unwrap_err();
        assert!(matches!(err, SignError::ServiceError { status: Some(503), .. }));

        let asset = store.asset(id).unwrap();
        assert_eq!(asset.image_bytes.as_slice(), &[1, 2, 3]);
        assert!(!asset.is_background_processed);
    }

    #[tokio::test]
    async fn test_process_unknown_asset() {
        let service = TransparencyService::new(&TransparencyConfig::default());
        let mut store = PlacementStore::new();
        assert!(matches!(
            service.process_asset(&mut store, AssetId::new()).await,
            Err(SignError::AssetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_mode_skips_processing() {
        let config = TransparencyConfig {
            mode: TransparencyMode::Disabled,
            ..Default::default()
        };
        let service = TransparencyService::new(&config);
        let mut store = PlacementStore::new();
        let id = store.add_asset(vec![1], "a.png", false);

        assert_eq!(service.mode(), TransparencyMode::Disabled);
        assert!(!service.is_available().await);
        assert!(!service.process_asset(&mut store, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_drawing() {
        let mock = Arc::new(MockProvider::returning(Some(vec![9])));
        let service = TransparencyService::with_provider(mock.clone(), true);
        let mut store = PlacementStore::new();

        assert!(matches!(
            service.save_drawing(&mut store, &FakeDrawing(None)).await,
            Err(SignError::NothingToCommit(_))
        ));
        assert!(store.assets().is_empty());

        let id = service
            .save_drawing(&mut store, &FakeDrawing(Some(vec![1, 2])))
            .await
            .unwrap();
        let asset = store.asset(id).unwrap();
        assert!(asset.display_name.starts_with("signature_"));
        assert!(asset.display_name.ends_with(".png"));
        assert_eq!(asset.image_bytes.as_slice(), &[9]);
        assert!(asset.is_background_processed);
    }

    #[tokio::test]
    async fn test_save_drawing_without_eager_processing() {
        let mock = Arc::new(MockProvider::returning(Some(vec![9])));
        let service = TransparencyService::with_provider(mock.clone(), false);
        let mut store = PlacementStore::new();

        let id = service
            .save_drawing(&mut store, &FakeDrawing(Some(vec![1, 2])))
            .await
            .unwrap();
        assert_eq!(store.asset(id).unwrap().image_bytes.as_slice(), &[1, 2]);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_remote_without_url_falls_back_to_local() {
        let config = TransparencyConfig {
            mode: TransparencyMode::Remote,
            remote_url: None,
            ..Default::default()
        };
        assert_eq!(TransparencyService::new(&config).mode(), TransparencyMode::Local);
    }
}
