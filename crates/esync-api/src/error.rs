use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.code, "message": self.message }));
        (self.status, body).into_response()
    }
}

impl From<esync_blobstore::BlobStoreError> for ApiError {
    fn from(e: esync_blobstore::BlobStoreError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<esync_drive::DriveError> for ApiError {
    fn from(e: esync_drive::DriveError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<esync_dispatcher::DispatchError> for ApiError {
    fn from(e: esync_dispatcher::DispatchError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<esync_search::SearchError> for ApiError {
    fn from(e: esync_search::SearchError) -> Self {
        match e {
            esync_search::SearchError::NotFound => ApiError::not_found("artifact not found"),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<esync_embed::EmbedError> for ApiError {
    fn from(e: esync_embed::EmbedError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<esync_router::RouterError> for ApiError {
    fn from(e: esync_router::RouterError) -> Self {
        ApiError::internal(e.to_string())
    }
}

impl From<esync_scheduler::SchedulerError> for ApiError {
    fn from(e: esync_scheduler::SchedulerError) -> Self {
        ApiError::internal(e.to_string())
    }
}
