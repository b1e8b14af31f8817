use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use jsonwebtoken::{EncodingKey, Header, encode};
use time::Duration;
use uuid::Uuid;

use agora_db::Database;
use agora_db::models::UserRow;
use agora_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, UserResponse};

use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub const SESSION_COOKIE: &str = "token";
pub const SESSION_MAX_AGE: Duration = Duration::days(7);

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Uniqueness first, both fields reported together
    let mut errors = HashMap::new();
    if state.db.get_user_by_email(&req.email)?.is_some() {
        errors.insert(
            "email".to_string(),
            "Email address is already in use".to_string(),
        );
    }
    if state.db.get_user_by_username(&req.username)?.is_some() {
        errors.insert(
            "username".to_string(),
            "Username is already taken".to_string(),
        );
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Field-level validators, also accumulated
    let errors = validate_registration(&req);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    state
        .db
        .create_user(&user_id.to_string(), &req.username, &req.email, &password_hash)?;

    // Read the row back so the response carries the stored timestamp
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or_else(|| anyhow::anyhow!("user row missing after insert"))?;

    Ok(Json(user_response(&user)))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = HashMap::new();
    if req.username.is_empty() {
        errors.insert(
            "username".to_string(),
            "Username must not be empty".to_string(),
        );
    }
    if req.password.is_empty() {
        errors.insert(
            "password".to_string(),
            "Password must not be empty".to_string(),
        );
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Unknown username is a distinct 404, not a generic credentials error.
    // Deliberate disclosure tradeoff, preserved from the product decision.
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or_else(|| ApiError::NotFound("Username is not registered".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized("Password is incorrect".to_string()))?;

    let token = create_token(&state.jwt_secret, &user.username)?;

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(LoginResponse {
            user: user_response(&user),
            token,
        }),
    ))
}

pub async fn logout(
    jar: CookieJar,
    Extension(_user): Extension<CurrentUser>,
) -> impl IntoResponse {
    (
        jar.add(expired_session_cookie()),
        Json(serde_json::json!({ "success": true })),
    )
}

pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(user.to_response())
}

pub(crate) fn create_token(secret: &str, username: &str) -> anyhow::Result<String> {
    // Username is the only claim; session lifetime comes from the cookie.
    let claims = Claims {
        username: username.to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .max_age(SESSION_MAX_AGE)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

pub(crate) fn user_response(row: &UserRow) -> UserResponse {
    UserResponse {
        id: crate::parse_row_id(&row.id),
        username: row.username.clone(),
        email: row.email.clone(),
        created_at: crate::parse_created_at(&row.created_at),
    }
}

fn validate_registration(req: &RegisterRequest) -> HashMap<String, String> {
    let mut errors = HashMap::new();

    if !is_valid_email(&req.email) {
        errors.insert(
            "email".to_string(),
            "Email must be a valid address".to_string(),
        );
    }

    if req.username.len() < 3 || req.username.len() > 32 {
        errors.insert(
            "username".to_string(),
            "Username must be 3 to 32 characters".to_string(),
        );
    } else if !req
        .username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.insert(
            "username".to_string(),
            "Username may only contain letters, digits and underscores".to_string(),
        );
    }

    if req.password.len() < 6 {
        errors.insert(
            "password".to_string(),
            "Password must be at least 6 characters".to_string(),
        );
    }

    errors
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain.split('.').count() >= 2 && domain.split('.').all(|part| !part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        let errors = validate_registration(&request("a@example.com", "alice", "hunter2"));
        assert!(errors.is_empty());
    }

    #[test]
    fn all_field_errors_are_collected_together() {
        let errors = validate_registration(&request("nope", "ab", ""));
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn username_charset_is_restricted() {
        let errors = validate_registration(&request("a@example.com", "al ice", "hunter2"));
        assert!(errors.contains_key("username"));

        let errors = validate_registration(&request("a@example.com", "al_ice9", "hunter2"));
        assert!(errors.is_empty());
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("a@example.com"));
        assert!(is_valid_email("a.b@sub.example.com"));
        assert!(!is_valid_email("example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@example"));
        assert!(!is_valid_email("a@exa@mple.com"));
    }

    #[test]
    fn password_hashing_roundtrip() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"hunter2", &salt)
            .unwrap()
            .to_string();

        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"hunter2", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong", &parsed)
                .is_err()
        );
    }

    #[test]
    fn session_cookie_lives_seven_days() {
        let cookie = session_cookie("abc".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
    }

    #[test]
    fn expired_cookie_clears_the_session() {
        let cookie = expired_session_cookie();
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.value(), "");
    }
}
