use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::warn;

use agora_types::api::Claims;

use crate::auth::{AppState, SESSION_COOKIE, expired_session_cookie};
use crate::error::ApiError;

/// Identity resolved from the session cookie and attached to the request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl CurrentUser {
    pub fn to_response(&self) -> agora_types::api::UserResponse {
        agora_types::api::UserResponse {
            id: crate::parse_row_id(&self.id),
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: crate::parse_created_at(&self.created_at),
        }
    }
}

/// Optional viewer identity. Always present as an extension behind
/// [`resolve_user`]; `None` means anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

/// Stage 1, permissive: resolve the session cookie to a user if possible and
/// attach it. Never rejects — an invalid signature or a vanished user clears
/// the cookie on the way out and the request continues anonymous.
pub async fn resolve_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = CookieJar::from_headers(req.headers())
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    let Some(token) = token else {
        req.extensions_mut().insert(MaybeUser(None));
        return next.run(req).await;
    };

    match session_user(&state, &token) {
        Some(user) => {
            req.extensions_mut().insert(MaybeUser(Some(user)));
            next.run(req).await
        }
        None => {
            req.extensions_mut().insert(MaybeUser(None));
            let mut response = next.run(req).await;
            if let Ok(value) = HeaderValue::from_str(&expired_session_cookie().to_string()) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            response
        }
    }
}

/// Stage 2, strict: 401 unless stage 1 attached a user. Re-inserts the
/// identity as a bare extension so protected handlers can require it.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<MaybeUser>()
        .and_then(|maybe| maybe.0.clone())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

fn session_user(state: &AppState, token: &str) -> Option<CurrentUser> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &token_validation(),
    )
    .ok()?;

    // A storage failure here also falls open to anonymous; stage 1 never errors.
    match state.db.get_user_by_username(&data.claims.username) {
        Ok(Some(row)) => Some(CurrentUser {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }),
        Ok(None) => None,
        Err(e) => {
            warn!("session user lookup failed: {:#}", e);
            None
        }
    }
}

pub(crate) fn token_validation() -> Validation {
    // Session tokens carry no exp claim; the cookie's Max-Age bounds the session.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_token;

    #[test]
    fn minted_tokens_decode_without_an_exp_claim() {
        let token = create_token("secret", "alice").unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &token_validation(),
        )
        .unwrap();
        assert_eq!(data.claims.username, "alice");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("secret", "alice").unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &token_validation(),
        );
        assert!(result.is_err());
    }
}
