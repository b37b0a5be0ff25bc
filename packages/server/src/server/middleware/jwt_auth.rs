use crate::common::{Actor, Role};
use crate::server::auth::JwtService;
use axum::{middleware::Next, response::Response};
use std::sync::Arc;
use tracing::debug;

/// Authenticated operator from a verified bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id.clone(), self.roles.clone())
    }

    pub fn highest_role(&self) -> Option<Role> {
        self.roles.iter().copied().max()
    }
}

/// JWT authentication middleware
///
/// Verifies the bearer token, if any, and adds AuthUser to request
/// extensions. Requests without a valid token continue unauthenticated.
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(user) = extract_auth_user(&request, &jwt_service) {
        debug!(user = %user.user_id, roles = ?user.roles, "Authenticated request");
        request.extensions_mut().insert(user);
    } else {
        debug!("No valid authentication token");
    }

    next.run(request).await
}

/// Verify a raw token into an AuthUser
pub fn auth_user_from_token(token: &str, jwt_service: &JwtService) -> Option<AuthUser> {
    let claims = jwt_service.verify_token(token).ok()?;
    Some(AuthUser {
        roles: claims.roles(),
        user_id: claims.sub,
    })
}

fn extract_auth_user(
    request: &axum::http::Request<axum::body::Body>,
    jwt_service: &JwtService,
) -> Option<AuthUser> {
    let auth_str = request.headers().get("authorization")?.to_str().ok()?;

    // Accept both "Bearer <token>" and a raw token
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str);

    auth_user_from_token(token, jwt_service)
}
