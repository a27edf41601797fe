//! Health check

use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::EditorConfig;
use crate::state::AppState;
use crate::transparency::TransparencyMode;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub transparency_mode: TransparencyMode,
    /// Defaults the placement editor should start from
    pub editor: EditorConfig,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        transparency_mode: state.transparency().mode(),
        editor: state.config().editor,
    })
}
