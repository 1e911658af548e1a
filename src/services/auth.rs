use crate::db::models::{Sesion, Usuario};
use crate::db::queries;
use crate::error::AppError;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

pub const SESSION_COOKIE: &str = "dreampay_session";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::Validation(
            "La contraseña no puede estar vacía".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("invalid stored password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Only the SHA-256 digest of the cookie token ever reaches the database.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Database-backed sessions: the cookie carries a random token, the
/// `sesiones` table its digest and expiry.
#[derive(Clone)]
pub struct SesionService {
    pool: PgPool,
    ttl_hours: i64,
}

impl SesionService {
    pub fn new(pool: PgPool, ttl_hours: i64) -> Self {
        Self { pool, ttl_hours }
    }

    /// Creates a session row and returns the raw token for the cookie.
    /// Expired rows are reaped opportunistically here.
    pub async fn iniciar(&self, usuario: &Usuario) -> Result<String, AppError> {
        let reaped = queries::delete_sesiones_expiradas(&self.pool).await?;
        if reaped > 0 {
            tracing::debug!(reaped, "expired sessions removed");
        }

        let token = generate_token();
        let sesion = Sesion::new(usuario.id, hash_token(&token), self.ttl_hours);
        queries::insert_sesion(&self.pool, &sesion).await?;
        Ok(token)
    }

    /// Resolves the current user from a cookie token, ignoring expired rows.
    pub async fn resolver(&self, token: &str) -> Result<Option<Usuario>, AppError> {
        let usuario = queries::get_usuario_by_sesion(&self.pool, &hash_token(token)).await?;
        Ok(usuario)
    }

    pub async fn cerrar(&self, token: &str) -> Result<(), AppError> {
        queries::delete_sesion(&self.pool, &hash_token(token)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip_verifies() {
        let hash = hash_password("secreto123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "secreto123").unwrap());
        assert!(!verify_password(&hash, "otra-cosa").unwrap());
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(hash_password("").is_err());
    }

    #[test]
    fn tokens_are_unique_and_hashed_consistently() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), hash_token(&b));
    }
}
