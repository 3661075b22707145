//! Authentication middleware
//!
//! JWT authentication and permission checks for caregivers

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::Actor;

use crate::error::{AppError, AppResult, ErrorDetail, ErrorResponse};
use crate::AppState;

/// Authenticated caregiver extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub user_name: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let permission = format!("{}:{}", resource, action);
        self.permissions.contains(&permission)
    }

    /// The identity stamped on ledger entries written by this user
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id.clone(), self.user_name.clone())
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
}

/// Authentication middleware that validates bearer JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let claims = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(msg) => return unauthorized_response(&msg),
    };

    if claims.sub.trim().is_empty() {
        return unauthorized_response("Invalid user ID in token");
    }

    let auth_user = AuthUser {
        user_id: claims.sub,
        user_name: claims.name,
        permissions: claims.permissions,
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_es: "No autorizado".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required".to_string(),
                message_es: "Debe iniciar sesión".to_string(),
            })
    }
}

/// Permission guard for use in handlers
pub fn check_permission(user: &AuthUser, resource: &str, action: &str) -> AppResult<()> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.user_id,
            permission = %format!("{}:{}", resource, action),
            "Permission denied"
        );
        Err(AppError::InsufficientPermissions)
    }
}
