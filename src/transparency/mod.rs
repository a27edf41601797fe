//! Transparency processing
//!
//! Removes opaque backgrounds from signature images before they are placed.
//! Uploads are processed on demand, drawings eagerly on save; both go through
//! the same [`TransparencyProvider`] chosen by [`TransparencyMode`].

mod provider;
mod service;
mod threshold;
mod types;

pub use provider::{RemoteProvider, ThresholdProvider, TransparencyProvider};
pub use service::TransparencyService;
pub use threshold::remove_background;
pub use types::{ThresholdOptions, TransparencyConfig, TransparencyMode};
