use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::{CatalogError, FinanceError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Finance(#[from] FinanceError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Catalog(CatalogError::InvalidPage { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Finance(FinanceError::NotFound(_) | FinanceError::NoData { .. }) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Finance(FinanceError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Finance(_) => StatusCode::BAD_GATEWAY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("❌ {} - {}", status, self);
        }
        let body = Json(json!({
            "code": status.as_u16(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
