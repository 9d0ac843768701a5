/// Account endpoints
///
/// Registration and account deletion.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::service::AuthService;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::middleware::AuthenticatedUser;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register
///
/// # Errors
/// - 400: Validation failure (field-level reasons in the body)
/// - 409: Email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let user_id = auth.register(&form.email, &form.password).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "registration completed"
    );

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "You have successfully registered"
    })))
}

/// DELETE /users/{id}
///
/// Requires a valid access token, and the caller must be the target
/// account.
///
/// # Errors
/// - 403: Caller is not the target account
/// - 404: No such user
pub async fn delete_user(
    path: web::Path<Uuid>,
    user: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let target = path.into_inner();

    if target != user.user_id {
        return Err(AuthError::Forbidden.into());
    }

    auth.delete_account(target).await?;

    Ok(HttpResponse::NoContent().finish())
}
