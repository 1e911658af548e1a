use crate::db::models::{Miembro, Sala, Sesion, Transaccion, Usuario, estado};
use chrono::Utc;
use sqlx::{PgPool, Result};
use uuid::Uuid;

// --- Usuario Queries ---

pub async fn insert_usuario(pool: &PgPool, usuario: &Usuario) -> Result<Usuario> {
    sqlx::query_as::<_, Usuario>(
        r#"
        INSERT INTO usuarios (
            id, nombre, apellido_paterno, apellido_materno, email, password_hash,
            wallet_pointer, fecha_registro
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(usuario.id)
    .bind(&usuario.nombre)
    .bind(&usuario.apellido_paterno)
    .bind(&usuario.apellido_materno)
    .bind(&usuario.email)
    .bind(&usuario.password_hash)
    .bind(&usuario.wallet_pointer)
    .bind(usuario.fecha_registro)
    .fetch_one(pool)
    .await
}

pub async fn get_usuario(pool: &PgPool, id: Uuid) -> Result<Usuario> {
    sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_usuario_by_email(pool: &PgPool, email: &str) -> Result<Option<Usuario>> {
    sqlx::query_as::<_, Usuario>("SELECT * FROM usuarios WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

// --- Sala Queries ---

pub async fn insert_sala(pool: &PgPool, sala: &Sala) -> Result<Sala> {
    sqlx::query_as::<_, Sala>(
        r#"
        INSERT INTO salas (
            id, codigo, nombre_producto, descripcion, precio, condicion,
            creador_id, fecha_creacion, activa
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(sala.id)
    .bind(&sala.codigo)
    .bind(&sala.nombre_producto)
    .bind(&sala.descripcion)
    .bind(&sala.precio)
    .bind(&sala.condicion)
    .bind(sala.creador_id)
    .bind(sala.fecha_creacion)
    .bind(sala.activa)
    .fetch_one(pool)
    .await
}

pub async fn get_sala(pool: &PgPool, id: Uuid) -> Result<Option<Sala>> {
    sqlx::query_as::<_, Sala>("SELECT * FROM salas WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_sala_by_codigo(pool: &PgPool, codigo: &str) -> Result<Option<Sala>> {
    sqlx::query_as::<_, Sala>("SELECT * FROM salas WHERE codigo = $1")
        .bind(codigo)
        .fetch_optional(pool)
        .await
}

pub async fn codigo_exists(pool: &PgPool, codigo: &str) -> Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM salas WHERE codigo = $1")
        .bind(codigo)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn list_salas_activas_by_creador(pool: &PgPool, creador_id: Uuid) -> Result<Vec<Sala>> {
    sqlx::query_as::<_, Sala>(
        "SELECT * FROM salas WHERE creador_id = $1 AND activa ORDER BY fecha_creacion DESC",
    )
    .bind(creador_id)
    .fetch_all(pool)
    .await
}

pub async fn get_ultima_sala_by_creador(pool: &PgPool, creador_id: Uuid) -> Result<Option<Sala>> {
    sqlx::query_as::<_, Sala>(
        "SELECT * FROM salas WHERE creador_id = $1 ORDER BY fecha_creacion DESC LIMIT 1",
    )
    .bind(creador_id)
    .fetch_optional(pool)
    .await
}

/// Soft deactivation. Only flips rows owned by `creador_id`; returns whether
/// a row actually changed so the handler can distinguish not-owner.
pub async fn desactivar_sala(pool: &PgPool, sala_id: Uuid, creador_id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE salas SET activa = FALSE WHERE id = $1 AND creador_id = $2")
        .bind(sala_id)
        .bind(creador_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// --- Miembro Queries ---

pub async fn insert_miembro(pool: &PgPool, miembro: &Miembro) -> Result<Miembro> {
    sqlx::query_as::<_, Miembro>(
        r#"
        INSERT INTO miembros (id, sala_id, usuario_id, rol, fecha_union)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(miembro.id)
    .bind(miembro.sala_id)
    .bind(miembro.usuario_id)
    .bind(&miembro.rol)
    .bind(miembro.fecha_union)
    .fetch_one(pool)
    .await
}

pub async fn get_miembro(pool: &PgPool, sala_id: Uuid, usuario_id: Uuid) -> Result<Option<Miembro>> {
    sqlx::query_as::<_, Miembro>("SELECT * FROM miembros WHERE sala_id = $1 AND usuario_id = $2")
        .bind(sala_id)
        .bind(usuario_id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_miembro(pool: &PgPool, sala_id: Uuid, usuario_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM miembros WHERE sala_id = $1 AND usuario_id = $2")
        .bind(sala_id)
        .bind(usuario_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_miembros(pool: &PgPool, sala_id: Uuid) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM miembros WHERE sala_id = $1")
        .bind(sala_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// --- Transaccion Queries ---

pub async fn insert_transaccion(pool: &PgPool, tx: &Transaccion) -> Result<Transaccion> {
    sqlx::query_as::<_, Transaccion>(
        r#"
        INSERT INTO transacciones (
            id, sala_id, usuario_id, receiver_wallet, monto, moneda, estado,
            payment_id, quote_id, interaction_url, continue_uri, continue_token,
            error_message, fecha_creacion, fecha_completado
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(tx.id)
    .bind(tx.sala_id)
    .bind(tx.usuario_id)
    .bind(&tx.receiver_wallet)
    .bind(&tx.monto)
    .bind(&tx.moneda)
    .bind(&tx.estado)
    .bind(&tx.payment_id)
    .bind(&tx.quote_id)
    .bind(&tx.interaction_url)
    .bind(&tx.continue_uri)
    .bind(&tx.continue_token)
    .bind(&tx.error_message)
    .bind(tx.fecha_creacion)
    .bind(tx.fecha_completado)
    .fetch_one(pool)
    .await
}

pub async fn get_transaccion(pool: &PgPool, id: Uuid) -> Result<Option<Transaccion>> {
    sqlx::query_as::<_, Transaccion>("SELECT * FROM transacciones WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_transacciones_by_usuario(pool: &PgPool, usuario_id: Uuid) -> Result<Vec<Transaccion>> {
    sqlx::query_as::<_, Transaccion>(
        "SELECT * FROM transacciones WHERE usuario_id = $1 ORDER BY fecha_creacion DESC",
    )
    .bind(usuario_id)
    .fetch_all(pool)
    .await
}

/// Stores the gateway continuation handle on the freshly initiated row so a
/// callback arriving on any session or process can complete the payment.
pub async fn guardar_continuacion(
    pool: &PgPool,
    id: Uuid,
    continue_uri: &str,
    continue_token: &str,
    quote_id: Option<&str>,
    interaction_url: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE transacciones
        SET continue_uri = $2, continue_token = $3, quote_id = $4, interaction_url = $5
        WHERE id = $1 AND estado = 'initiated'
        "#,
    )
    .bind(id)
    .bind(continue_uri)
    .bind(continue_token)
    .bind(quote_id)
    .bind(interaction_url)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Forward-only transition to `completed`. The `estado = 'initiated'` guard
/// keeps a second callback (or a late one) from touching a terminal row.
pub async fn marcar_completada(pool: &PgPool, id: Uuid, payment_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE transacciones
        SET estado = $2, payment_id = $3, fecha_completado = $4,
            continue_uri = NULL, continue_token = NULL
        WHERE id = $1 AND estado = 'initiated'
        "#,
    )
    .bind(id)
    .bind(estado::COMPLETED)
    .bind(payment_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Forward-only transition to `failed`, recording what the gateway said (or
/// the transport error). Continuation columns are cleared on both terminal
/// paths.
pub async fn marcar_fallida(pool: &PgPool, id: Uuid, error_message: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE transacciones
        SET estado = $2, error_message = $3,
            continue_uri = NULL, continue_token = NULL
        WHERE id = $1 AND estado = 'initiated'
        "#,
    )
    .bind(id)
    .bind(estado::FAILED)
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

// --- Sesion Queries ---

pub async fn insert_sesion(pool: &PgPool, sesion: &Sesion) -> Result<Sesion> {
    sqlx::query_as::<_, Sesion>(
        r#"
        INSERT INTO sesiones (id, usuario_id, token_hash, fecha_creacion, fecha_expiracion)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(sesion.id)
    .bind(sesion.usuario_id)
    .bind(&sesion.token_hash)
    .bind(sesion.fecha_creacion)
    .bind(sesion.fecha_expiracion)
    .fetch_one(pool)
    .await
}

pub async fn get_usuario_by_sesion(pool: &PgPool, token_hash: &str) -> Result<Option<Usuario>> {
    sqlx::query_as::<_, Usuario>(
        r#"
        SELECT u.* FROM usuarios u
        JOIN sesiones s ON s.usuario_id = u.id
        WHERE s.token_hash = $1 AND s.fecha_expiracion > NOW()
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

pub async fn delete_sesion(pool: &PgPool, token_hash: &str) -> Result<()> {
    sqlx::query("DELETE FROM sesiones WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_sesiones_expiradas(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sesiones WHERE fecha_expiracion <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
