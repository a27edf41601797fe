//! Route modules for the PDF signing server
//!
//! Endpoints:
//! - GET /health - liveness and version
//! - POST /convert_signature - make a signature image's background transparent
//! - POST /sign - stamp signatures into a PDF

pub mod convert;
pub mod health;
pub mod sign;

mod form;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the application router
pub fn router(state: AppState) -> Router {
    let limit = state.config().server.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/convert_signature", post(convert::convert_signature))
        .route("/sign", post(sign::sign_pdf))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum_test::TestServer;

    use crate::config::Config;
    use crate::render::testing::RecordingRasterizer;
    use crate::state::AppState;

    pub fn server_with(config: Config, rasterizer: RecordingRasterizer) -> TestServer {
        let state = AppState::with_rasterizer(config, Arc::new(rasterizer));
        TestServer::new(super::router(state)).unwrap()
    }

    pub fn server() -> TestServer {
        server_with(Config::default(), RecordingRasterizer::default())
    }
}
