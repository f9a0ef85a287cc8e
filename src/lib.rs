use std::sync::Arc;

use poem::{
    EndpointExt, Route,
    middleware::{AddData, AddDataEndpoint, Cors, CorsEndpoint},
};
use poem_openapi::OpenApiService;

use crate::core::engine::ChartEngine;
use crate::core::probe::DependencyProbe;
use crate::settings::Config;

use crate::routes::{chart::ApiChart, system::ApiSystem};

pub mod core;
pub mod routes;
pub mod schemas;
pub mod settings;

pub struct AppState {
    pub engine: Arc<ChartEngine>,
    pub probe: Arc<DependencyProbe>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            engine: Arc::new(ChartEngine::new()),
            probe: Arc::new(DependencyProbe::default()),
        }
    }
}

pub fn init_openapi_route(
    app_state: Arc<AppState>,
    config: &Config,
) -> CorsEndpoint<AddDataEndpoint<Route, Arc<AppState>>> {
    let prefix = config.prefix();
    let openapi_route = OpenApiService::new(
        (ApiChart, ApiSystem),
        "Psychrometric Chart Generator API",
        "1.0",
    )
    .server(prefix.clone());

    let openapi_json_endpoint = openapi_route.spec_endpoint();
    let ui = openapi_route.swagger_ui();
    Route::new()
        .nest(prefix, openapi_route)
        .nest("/docs", ui)
        .at("openapi.json", openapi_json_endpoint)
        .with(AddData::new(app_state))
        .with(Cors::new())
}
