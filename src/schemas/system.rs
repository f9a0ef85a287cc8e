use std::collections::BTreeMap;

use poem_openapi::{ApiResponse, Object, payload::Json};

pub const SERVICE_NAME: &str = "psychro-chart-generator";

#[derive(Object, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
        }
    }
}

#[derive(ApiResponse)]
pub enum DependencyProbeResponse {
    /// Component name to `OK` or `ERROR: <kind>: <message>`
    #[oai(status = 200, content_type = "application/json")]
    Ok(Json<BTreeMap<String, String>>),
}
