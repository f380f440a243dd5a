use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Token claims minted by the identity context. We only consume them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub merchant_id: String,
    pub role: String,
    pub exp: usize,
}

/// Who is calling, and for which tenant. Every service operation re-checks
/// the tenant boundary against this context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub merchant_id: Uuid,
    pub role: String,
}

pub fn ensure_merchant(ctx: &AuthContext, merchant_id: Uuid) -> Result<(), AppError> {
    if ctx.merchant_id != merchant_id {
        return Err(AppError::TenantBoundary);
    }
    Ok(())
}

pub fn ensure_role(ctx: &AuthContext, role: &str) -> Result<(), AppError> {
    if ctx.role != role {
        return Err(AppError::PermissionDenied);
    }
    Ok(())
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::BadRequest("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

        if !auth_str.starts_with("Bearer ") {
            return Err(AppError::BadRequest("Invalid Authorization scheme".into()));
        }
        let token = auth_str.trim_start_matches("Bearer ").trim();

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::BadRequest("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;
        let merchant_id = Uuid::parse_str(&decoded.claims.merchant_id)
            .map_err(|_| AppError::BadRequest("Invalid merchant id in token".into()))?;

        Ok(AuthContext {
            user_id,
            merchant_id,
            role: decoded.claims.role.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(merchant_id: Uuid) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            merchant_id,
            role: "merchant".into(),
        }
    }

    #[test]
    fn merchant_boundary_enforced() {
        let merchant = Uuid::new_v4();
        assert!(ensure_merchant(&ctx(merchant), merchant).is_ok());
        assert!(matches!(
            ensure_merchant(&ctx(merchant), Uuid::new_v4()),
            Err(AppError::TenantBoundary)
        ));
    }

    #[test]
    fn role_check() {
        let c = ctx(Uuid::new_v4());
        assert!(ensure_role(&c, "merchant").is_ok());
        assert!(matches!(
            ensure_role(&c, "admin"),
            Err(AppError::PermissionDenied)
        ));
    }
}
