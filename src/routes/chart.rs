use std::sync::Arc;

use poem::web::Data;
use poem_openapi::{OpenApi, Tags, payload::Json};

use crate::{
    AppState,
    core::request::ChartRequest,
    schemas::{
        chart::{ChartSuccessResponse, GenerateChartResponse},
        common::InternalServerErrorResponse,
    },
};

#[derive(Tags)]
enum ApiChartTags {
    Chart,
}

pub struct ApiChart;

#[OpenApi()]
impl ApiChart {
    /// Generate Psychrometric Chart
    ///
    /// Render a psychrometric chart in SI units and return it as a base64
    /// encoded PNG. The body is optional; missing fields, an empty body or
    /// a body that is not JSON fall back to the defaults.
    ///
    /// # Example Request
    /// ```json
    /// {
    ///   "temp_min": 0,
    ///   "temp_max": 40,
    ///   "title": "My Chart"
    /// }
    /// ```
    #[oai(
        path = "/generate_psychro_chart",
        method = "get",
        method = "post",
        tag = "ApiChartTags::Chart"
    )]
    async fn generate_psychro_chart(
        &self,
        body: Vec<u8>,
        state: Data<&Arc<AppState>>,
    ) -> GenerateChartResponse {
        tracing::info!("processing psychrometric chart request");

        let request = match ChartRequest::from_body(&body) {
            Ok(req) => req,
            Err(e) => {
                return GenerateChartResponse::InternalServerError(Json(
                    InternalServerErrorResponse::new("route.chart", "parse_request", &e),
                ));
            }
        };

        tracing::info!(
            "parameters: temp_min={}, temp_max={}",
            request.temp_min,
            request.temp_max
        );

        match state.engine.render_base64(request.clone()).await {
            Ok(image) => {
                tracing::info!("chart generated, {} base64 bytes", image.len());
                GenerateChartResponse::Ok(Json(ChartSuccessResponse::new(image, &request)))
            }
            Err(e) => GenerateChartResponse::InternalServerError(Json(
                InternalServerErrorResponse::new("route.chart", "generate_psychro_chart", &e),
            )),
        }
    }
}
