use poem_openapi::{ApiResponse, Object, payload::Json};
use serde_json::Value as JsonValue;

use super::common::{InternalServerErrorResponse, STATUS_SUCCESS};
use crate::core::request::ChartRequest;

pub const CHART_FORMAT_PNG: &str = "png";
pub const SUCCESS_MESSAGE: &str = "Chart generated successfully";

/// Parameters the chart was generated with, after defaults were applied.
#[derive(Object, Debug, Clone)]
pub struct ChartParameters {
    /// Lower dry bulb temperature limit (°C)
    pub temp_min: JsonValue,

    /// Upper dry bulb temperature limit (°C)
    pub temp_max: JsonValue,

    /// Chart title, as sent
    pub title: JsonValue,
}

impl From<&ChartRequest> for ChartParameters {
    fn from(request: &ChartRequest) -> Self {
        Self {
            temp_min: request.temp_min.clone(),
            temp_max: request.temp_max.clone(),
            title: request.title.clone(),
        }
    }
}

#[derive(Object, Debug)]
pub struct ChartSuccessResponse {
    /// Always `success`
    pub status: String,

    pub message: String,

    /// Image format of `image_base64`
    pub chart_format: String,

    /// Base64 encoded PNG image
    pub image_base64: String,

    pub parameters: ChartParameters,
}

impl ChartSuccessResponse {
    pub fn new(image_base64: String, request: &ChartRequest) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: SUCCESS_MESSAGE.to_string(),
            chart_format: CHART_FORMAT_PNG.to_string(),
            image_base64,
            parameters: request.into(),
        }
    }
}

#[derive(ApiResponse)]
pub enum GenerateChartResponse {
    #[oai(status = 200, content_type = "application/json")]
    Ok(Json<ChartSuccessResponse>),

    #[oai(status = 500, content_type = "application/json")]
    InternalServerError(Json<InternalServerErrorResponse>),
}
