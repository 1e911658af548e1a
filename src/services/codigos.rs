use crate::db::queries;
use crate::error::AppError;
use rand::Rng;
use rand::rngs::OsRng;
use sqlx::PgPool;

/// Bound on collision retries. The 8-digit space holds 10^8 codes, so
/// hitting this means the space is effectively exhausted (or the database
/// is returning garbage) and looping further would never terminate.
const MAX_INTENTOS: u32 = 100;

/// Produces an 8-digit decimal room code from a cryptographically strong
/// source, retrying on collision against existing salas.
pub async fn generar_codigo(pool: &PgPool) -> Result<String, AppError> {
    for _ in 0..MAX_INTENTOS {
        let codigo = format!("{:08}", OsRng.gen_range(0..100_000_000u32));
        if !queries::codigo_exists(pool, &codigo).await? {
            return Ok(codigo);
        }
        tracing::debug!(codigo = %codigo, "room code collision, retrying");
    }

    tracing::error!("room code generation exhausted {} attempts", MAX_INTENTOS);
    Err(AppError::CodeSpaceExhausted)
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::rngs::OsRng;

    #[test]
    fn generated_codes_are_eight_decimal_digits() {
        for _ in 0..1000 {
            let codigo = format!("{:08}", OsRng.gen_range(0..100_000_000u32));
            assert_eq!(codigo.len(), 8);
            assert!(codigo.chars().all(|ch| ch.is_ascii_digit()));
        }
    }
}
