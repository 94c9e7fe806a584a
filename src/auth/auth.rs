use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::HrmError;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

/// The authenticated principal of a request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    #[schema(value_type = String, example = "hr")]
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// Only access tokens authenticate API calls.
    pub fn from_claims(claims: Claims) -> Result<Self, HrmError> {
        if claims.token_type != TokenType::Access {
            return Err(HrmError::Unauthorized("Access token required".into()));
        }
        let role =
            Role::from_id(claims.role).ok_or_else(|| HrmError::Unauthorized("Invalid role".into()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_admin(&self) -> Result<(), HrmError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(HrmError::Forbidden("Admin only".into()))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), HrmError> {
        if self.role.is_manager() {
            Ok(())
        } else {
            Err(HrmError::Forbidden("HR/Admin only".into()))
        }
    }

    /// HR and admins see everyone; anyone else only their own employee record.
    pub fn can_access_employee(&self, employee_id: u64) -> bool {
        self.role.is_manager() || self.employee_id == Some(employee_id)
    }

    pub fn require_access_to(&self, employee_id: u64) -> Result<(), HrmError> {
        if self.can_access_employee(employee_id) {
            Ok(())
        } else {
            Err(HrmError::Forbidden("Not allowed to access this employee".into()))
        }
    }

    /// The caller's own employee id, for self-service routes.
    pub fn own_employee_id(&self) -> Result<u64, HrmError> {
        self.employee_id
            .ok_or_else(|| HrmError::Forbidden("No employee profile".into()))
    }

    /// Resolves the employee a read is about: managers may name anyone (or
    /// must name someone), everyone else is pinned to themselves.
    pub fn scope_employee(&self, requested: Option<u64>) -> Result<u64, HrmError> {
        match requested {
            Some(id) => self.require_access_to(id).map(|_| id),
            None if self.role.is_manager() => self
                .employee_id
                .ok_or_else(|| HrmError::Validation("employee_id is required".into())),
            None => self.own_employee_id(),
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, HrmError> {
    // Set by `auth_middleware` on the protected scope.
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = bearer_token(req).ok_or_else(|| HrmError::Unauthorized("Missing token".into()))?;
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| HrmError::Unauthorized("Config missing".into()))?;
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| HrmError::Unauthorized("Invalid token".into()))?;

    AuthUser::from_claims(claims)
}

impl FromRequest for AuthUser {
    type Error = HrmError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
