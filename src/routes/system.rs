use std::sync::Arc;

use poem::web::Data;
use poem_openapi::{OpenApi, Tags, payload::Json};

use crate::{
    AppState,
    schemas::system::{DependencyProbeResponse, HealthResponse},
};

#[derive(Tags)]
enum ApiSystemTags {
    System,
}

pub struct ApiSystem;

#[OpenApi()]
impl ApiSystem {
    /// Dependency Probe
    ///
    /// Exercise each chart pipeline component and report `OK` or the
    /// error it raised. Always answers 200.
    #[oai(
        path = "/http_trigger",
        method = "get",
        method = "post",
        tag = "ApiSystemTags::System"
    )]
    async fn http_trigger(&self, state: Data<&Arc<AppState>>) -> DependencyProbeResponse {
        tracing::info!("dependency probe requested");
        DependencyProbeResponse::Ok(Json(Arc::clone(&state.probe).run_blocking().await))
    }

    /// Health Check
    #[oai(
        path = "/health",
        method = "get",
        method = "post",
        method = "put",
        method = "patch",
        method = "delete",
        tag = "ApiSystemTags::System"
    )]
    async fn health(&self) -> Json<HealthResponse> {
        Json(HealthResponse::default())
    }
}
