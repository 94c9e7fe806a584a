use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

/// Who a token is issued to.
pub struct TokenSubject {
    pub user_id: u64,
    pub username: String,
    pub role: u8,
    pub employee_id: Option<u64>,
}

impl From<&Claims> for TokenSubject {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.sub.clone(),
            role: claims.role,
            employee_id: claims.employee_id,
        }
    }
}

/// Signs a token of `token_type` valid for `ttl` seconds and returns it with
/// its claims (the refresh flow stores the `jti`).
pub fn issue_token(
    subject: &TokenSubject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        role: subject.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id: subject.employee_id,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 12,
            username: "hr.lead".into(),
            role: 2,
            employee_id: Some(1001),
        }
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let (token, issued) = issue_token(&subject(), TokenType::Access, "s3cret", 900).unwrap();

        let claims = verify_token(&token, "s3cret").unwrap();

        assert_eq!(claims.user_id, 12);
        assert_eq!(claims.sub, "hr.lead");
        assert_eq!(claims.employee_id, Some(1001));
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = issue_token(&subject(), TokenType::Refresh, "s3cret", 900).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn every_token_gets_a_fresh_jti() {
        let (_, a) = issue_token(&subject(), TokenType::Refresh, "s3cret", 900).unwrap();
        let (_, b) = issue_token(&subject(), TokenType::Refresh, "s3cret", 900).unwrap();
        assert_ne!(a.jti, b.jti);
    }
}
