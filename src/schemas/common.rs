use poem_openapi::Object;

use crate::core::error::ChartError;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

#[derive(Object, Debug)]
pub struct InternalServerErrorResponse {
    /// Always `error`
    pub status: String,

    /// What went wrong
    pub message: String,
}

impl InternalServerErrorResponse {
    pub fn new(filepath: &str, function: &str, err: &ChartError) -> Self {
        tracing::error!(
            "error: on {}::{} kind: {} error: {}",
            filepath,
            function,
            err.kind(),
            err
        );
        Self {
            status: STATUS_ERROR.to_string(),
            message: err.to_string(),
        }
    }
}
