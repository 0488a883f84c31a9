use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::entities::favorite::FavoriteTargetError;
use crate::entities::sea_orm_active_enums::StatusTransitionError;

/// Failure of the single generation call. Either kind fails the whole request.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Non-success HTTP status, transport failure, or a reply without
    /// `candidates[0].content.parts[0].text`.
    #[error("Gemini API error: {status:?} - {body}")]
    Provider { status: Option<u16>, body: String },

    /// The reply text did not contain a usable itinerary JSON object.
    #[error("Invalid itinerary JSON from model: {0}")]
    Format(String),
}

/// Failure talking to the place or weather provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// HTTP succeeded but the JSON envelope carried a failure status
    /// (`REQUEST_DENIED`, `OVER_QUERY_LIMIT`, ...).
    #[error("provider status {status}: {message:?}")]
    Api {
        status: String,
        message: Option<String>,
    },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("place provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Transition(#[from] StatusTransitionError),

    #[error("request was cancelled")]
    Cancelled,
}

impl From<FavoriteTargetError> for PlannerError {
    fn from(err: FavoriteTargetError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl PlannerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Generation(_)
            | Self::Provider(_)
            | Self::Database(_)
            | Self::Transition(_)
            | Self::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short tag for metrics labels and span fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Generation(GenerationError::Provider { .. }) => "generation_provider",
            Self::Generation(GenerationError::Format(_)) => "generation_format",
            Self::Provider(_) => "place_provider",
            Self::Database(_) => "database",
            Self::Transition(_) => "status_transition",
            Self::Cancelled => "cancelled",
        }
    }
}

impl IntoResponse for PlannerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Server-side details stay in logs and the request audit trail
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
