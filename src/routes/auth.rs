/// Session endpoints
///
/// Login, token refresh, logout, and current-user lookup. The access token
/// travels in the response body; the refresh token only ever travels in an
/// HTTP-only cookie scoped to the refresh validity window.

use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    web, HttpRequest, HttpResponse,
};
use serde::{Deserialize, Serialize};

use crate::auth::service::AuthService;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::middleware::AuthenticatedUser;

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body returned by login and refresh. The refresh token is deliberately
/// absent; it lives in the cookie.
#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

fn refresh_cookie(auth: &AuthService, value: String) -> Cookie<'static> {
    Cookie::build(REFRESH_TOKEN_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(auth.config().refresh_token_expiry))
        .finish()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(REFRESH_TOKEN_COOKIE, "")
        .path("/")
        .http_only(true)
        .finish();
    cookie.make_removal();
    cookie
}

fn token_response(auth: &AuthService, pair: crate::auth::TokenPair) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(refresh_cookie(auth, pair.refresh_token))
        .json(AccessTokenResponse {
            access_token: pair.access_token,
            token_type: "Bearer".to_string(),
            expires_in: auth.config().access_token_expiry,
        })
}

/// POST /auth/login
///
/// # Errors
/// - 401: Invalid credentials (unknown email or wrong password, uniformly)
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let user_id = auth.authenticate(&form.email, &form.password).await?;
    let pair = auth.issue_tokens(user_id).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "user logged in"
    );

    Ok(token_response(&auth, pair))
}

/// POST /auth/refresh
///
/// Exchanges the refresh token carried by the cookie for a new pair. The
/// presented token is consumed: replaying it after a successful refresh is
/// rejected.
///
/// # Errors
/// - 401: Missing, invalid, expired, or already-rotated refresh token
pub async fn refresh(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let cookie = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .ok_or(AuthError::MissingToken)?;
    let pair = auth.refresh_tokens(cookie.value()).await?;

    tracing::info!(request_id = %context.request_id, "tokens rotated");

    Ok(token_response(&auth, pair))
}

/// DELETE /auth/logout
///
/// Requires a valid access token. Deletes the server-side refresh
/// association and clears the cookie; the presented access token itself
/// stays valid until it expires.
pub async fn logout(
    user: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.logout(user.user_id).await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(serde_json::json!({
            "message": "You have successfully logged out."
        })))
}

/// GET /auth/me
pub async fn get_current_user(
    user: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let record = auth.current_user(user.user_id).await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: record.id.to_string(),
        email: record.email,
        created_at: record.created_at.to_rfc3339(),
    }))
}
