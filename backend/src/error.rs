//! Error handling for the Carestock service
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{MovementError, ScheduleError};
use thiserror::Error;

use crate::store::StoreError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_es: String },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid movement: {0}")]
    InvalidMovement(String),

    // Job errors
    #[error("Job {job} exceeded its {seconds}s budget")]
    JobTimeout { job: String, seconds: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<MovementError> for AppError {
    fn from(err: MovementError) -> Self {
        match err {
            MovementError::InsufficientStock { .. } => AppError::InsufficientStock(err.to_string()),
            MovementError::NonPositiveQuantity
            | MovementError::NegativeAdjustment
            | MovementError::QuantityOutOfRange => {
                AppError::Validation {
                    field: "quantity".to_string(),
                    message: err.to_string(),
                    message_es: "La cantidad no es válida".to_string(),
                }
            }
            MovementError::InvalidRoute { .. } | MovementError::PoolNotLinked => {
                AppError::InvalidMovement(err.to_string())
            }
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::InvalidStatusTransition { .. } => {
                AppError::InvalidStateTransition(err.to_string())
            }
            _ => AppError::ValidationError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_es: "No tiene permiso para realizar esta acción".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized {
                message,
                message_es,
            } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_es: message_es.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("Datos no válidos: {}", msg),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_es: format!("No se encontró {}", resource),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("No se puede cambiar el estado: {}", msg),
                    field: None,
                },
            ),
            AppError::InsufficientStock(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("Existencias insuficientes: {}", msg),
                    field: Some("quantity".to_string()),
                },
            ),
            AppError::InvalidMovement(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_MOVEMENT".to_string(),
                    message_en: msg.clone(),
                    message_es: format!("Movimiento no válido: {}", msg),
                    field: None,
                },
            ),
            AppError::JobTimeout { job, seconds } => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorDetail {
                    code: "JOB_TIMEOUT".to_string(),
                    message_en: format!("Job {} exceeded its {}s budget", job, seconds),
                    message_es: format!("La tarea {} excedió su límite de {}s", job, seconds),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Configuration error: {}", msg),
                    message_es: format!("Error de configuración: {}", msg),
                    field: None,
                },
            ),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "STORAGE_ERROR".to_string(),
                    message_en: "A storage error occurred".to_string(),
                    message_es: "Ocurrió un error de almacenamiento".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_es: "Error interno del servidor".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
