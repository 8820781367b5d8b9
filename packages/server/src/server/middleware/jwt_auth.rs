use crate::common::{AppError, AppResult, CompanyId, UserId};
use crate::domains::auth::JwtService;
use axum::{middleware::Next, response::Response, Extension};
use std::sync::Arc;
use tracing::debug;

/// Authenticated user information from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub company_id: Option<CompanyId>,
}

/// JWT authentication middleware
///
/// Extracts JWT token from Authorization header, verifies it, and adds AuthUser to request extensions.
/// If no token or invalid token, request continues without AuthUser; handlers decide whether that is allowed.
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let auth_user = extract_auth_user(&request, &jwt_service);

    if let Some(user) = auth_user {
        debug!(
            "Authenticated user: {} (company: {:?})",
            user.user_id, user.company_id
        );
        request.extensions_mut().insert(user);
    } else {
        debug!("No valid authentication token");
    }

    next.run(request).await
}

/// Reject requests that arrived without a valid token
pub fn require_auth(auth: Option<Extension<AuthUser>>) -> AppResult<AuthUser> {
    auth.map(|Extension(user)| user)
        .ok_or(AppError::AuthenticationRequired)
}

/// Extract and verify JWT token from request
fn extract_auth_user(
    request: &axum::http::Request<axum::body::Body>,
    jwt_service: &JwtService,
) -> Option<AuthUser> {
    // Get Authorization header
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    // Extract token (handle both "Bearer <token>" and raw token)
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str);

    let claims = jwt_service.verify_token(token).ok()?;

    Some(AuthUser {
        user_id: claims.user_id,
        company_id: claims.company_id,
    })
}
