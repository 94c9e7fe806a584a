use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::HrmError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

/// Rejects requests without a valid access token and stores the decoded
/// [`AuthUser`] in the request extensions for handlers.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    match principal(&req) {
        Ok(auth_user) => {
            req.extensions_mut().insert(auth_user);
            next.call(req).await
        }
        Err(err) => {
            tracing::debug!(path = %req.path(), error = %err, "Rejected unauthenticated request");
            Ok(req.into_response(err.error_response()))
        }
    }
}

fn principal(req: &ServiceRequest) -> Result<AuthUser, HrmError> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| HrmError::Unauthorized("App config missing".into()))?;

    let header_value = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| HrmError::Unauthorized("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| HrmError::Unauthorized("Invalid Authorization header encoding".into()))?;

    let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
        HrmError::Unauthorized("Authorization header must start with Bearer".into())
    })?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|e| HrmError::Unauthorized(format!("Invalid or expired token: {e}")))?;

    AuthUser::from_claims(claims)
}
