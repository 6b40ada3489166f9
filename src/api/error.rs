//! Actix Web error adapters for Game Runner errors.
//!
//! Every failed request answers `{"success": false, "message": ...}` with the
//! status from [`Error::status_code`].

use crate::error::Error;
use actix_web::{HttpRequest, HttpResponse, ResponseError, error::JsonPayloadError, http::StatusCode, web};
use serde_json::json;

impl ResponseError for Error {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(Error::status_code(self))
            .content_type("application/json")
            .json(json!({
                "success": false,
                "message": self.to_string(),
            }))
    }

    fn status_code(&self) -> StatusCode {
        Error::status_code(self)
    }
}

/// JSON extractor settings that report malformed bodies as validation errors
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error_handler)
}

fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "Rejected request body");
    Error::Validation(format!("invalid request body: {}", err)).into()
}
