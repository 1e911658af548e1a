use crate::AppState;
use crate::db::models::{Miembro, Sala};
use crate::db::queries;
use crate::error::AppError;
use crate::handlers::{redirect_error, redirect_mensaje};
use crate::middleware::auth::PageUser;
use crate::services::codigos;
use crate::validation;
use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::error::ErrorKind;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub struct CrearSalaForm {
    pub nombre_producto: String,
    pub descripcion: Option<String>,
    pub precio: String,
    pub condicion: String,
}

#[derive(Debug, Deserialize)]
pub struct UnirsePorCodigoForm {
    pub codigo: String,
}

pub async fn crear_sala_page(PageUser(_usuario): PageUser) -> Json<serde_json::Value> {
    Json(json!({
        "page": "crear-sala",
        "fields": ["nombre_producto", "descripcion", "precio", "condicion"],
        "condiciones": validation::CONDICIONES,
    }))
}

pub async fn crear_sala(
    State(state): State<AppState>,
    PageUser(usuario): PageUser,
    Form(form): Form<CrearSalaForm>,
) -> Result<Redirect, AppError> {
    if validation::validate_required("nombre_producto", &form.nombre_producto).is_err() {
        return Ok(redirect_error("/crear-sala", "Falta el nombre del producto"));
    }
    let Ok(precio) = BigDecimal::from_str(form.precio.trim()) else {
        return Ok(redirect_error("/crear-sala", "El precio no es un número válido"));
    };
    if validation::validate_precio(&precio).is_err() {
        return Ok(redirect_error("/crear-sala", "El precio debe ser mayor que cero"));
    }
    if validation::validate_condicion(&form.condicion).is_err() {
        return Ok(redirect_error(
            "/crear-sala",
            "La condición debe ser 'nueva' o 'usada'",
        ));
    }

    let codigo = codigos::generar_codigo(&state.db).await?;
    let sala = Sala::new(
        codigo,
        validation::sanitize_string(&form.nombre_producto),
        form.descripcion
            .as_deref()
            .map(validation::sanitize_string)
            .filter(|d| !d.is_empty()),
        precio,
        form.condicion,
        usuario.id,
    );
    let creada = queries::insert_sala(&state.db, &sala).await?;
    tracing::info!(sala_id = %creada.id, codigo = %creada.codigo, "room created");

    Ok(redirect_mensaje("/compartir-sala", "Sala creada"))
}

/// The most recently created sala of the current user, with its shareable
/// code.
pub async fn compartir_sala(
    State(state): State<AppState>,
    PageUser(usuario): PageUser,
) -> Result<Response, AppError> {
    let Some(sala) = queries::get_ultima_sala_by_creador(&state.db, usuario.id).await? else {
        return Ok(redirect_error("/crear-sala", "Aún no has creado ninguna sala").into_response());
    };

    let enlace = format!("/sala/{}", sala.codigo);
    Ok(Json(json!({
        "page": "compartir-sala",
        "sala": sala,
        "enlace": enlace,
    }))
    .into_response())
}

pub async fn sala_detalle(
    State(state): State<AppState>,
    PageUser(usuario): PageUser,
    Path(codigo): Path<String>,
) -> Result<Response, AppError> {
    let Some(sala) = queries::get_sala_by_codigo(&state.db, &codigo).await? else {
        return Ok(redirect_error("/dashboard", "Sala no encontrada").into_response());
    };

    let es_creador = sala.creador_id == usuario.id;
    let es_miembro = queries::get_miembro(&state.db, sala.id, usuario.id)
        .await?
        .is_some();
    let miembros = queries::count_miembros(&state.db, sala.id).await?;

    Ok(Json(json!({
        "page": "sala",
        "sala": sala,
        "es_creador": es_creador,
        "es_miembro": es_miembro,
        "miembros": miembros,
    }))
    .into_response())
}

/// Join transition of the two-state membership machine. Joining twice is an
/// informational no-op, never an error.
pub async fn unirse(
    State(state): State<AppState>,
    PageUser(usuario): PageUser,
    Path(codigo): Path<String>,
) -> Result<Redirect, AppError> {
    let Some(sala) = queries::get_sala_by_codigo(&state.db, &codigo).await? else {
        return Ok(redirect_error("/dashboard", "Sala no encontrada"));
    };
    let destino = format!("/sala/{}", sala.codigo);

    if sala.creador_id == usuario.id {
        return Ok(redirect_error(
            &destino,
            &AppError::CreatorCannotJoin.to_string(),
        ));
    }
    if queries::get_miembro(&state.db, sala.id, usuario.id)
        .await?
        .is_some()
    {
        return Ok(redirect_mensaje(&destino, "Ya eres miembro de esta sala"));
    }

    let miembro = Miembro::comprador(sala.id, usuario.id);
    match queries::insert_miembro(&state.db, &miembro).await {
        Ok(_) => {
            tracing::info!(sala_id = %sala.id, usuario_id = %usuario.id, "member joined");
            Ok(redirect_mensaje(&destino, "Te has unido a la sala"))
        }
        // Concurrent double-join: the uniqueness constraint makes the second
        // insert collapse into the informational no-op.
        Err(sqlx::Error::Database(db_err)) if db_err.kind() == ErrorKind::UniqueViolation => {
            Ok(redirect_mensaje(&destino, "Ya eres miembro de esta sala"))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn salir(
    State(state): State<AppState>,
    PageUser(usuario): PageUser,
    Path(codigo): Path<String>,
) -> Result<Redirect, AppError> {
    let Some(sala) = queries::get_sala_by_codigo(&state.db, &codigo).await? else {
        return Ok(redirect_error("/dashboard", "Sala no encontrada"));
    };

    if queries::delete_miembro(&state.db, sala.id, usuario.id).await? {
        tracing::info!(sala_id = %sala.id, usuario_id = %usuario.id, "member left");
        Ok(redirect_mensaje("/dashboard", "Has salido de la sala"))
    } else {
        Ok(redirect_error(
            &format!("/sala/{}", sala.codigo),
            &AppError::NotAMember.to_string(),
        ))
    }
}

/// Explicit soft-deactivation path for the `activa` flag, creator only.
pub async fn desactivar(
    State(state): State<AppState>,
    PageUser(usuario): PageUser,
    Path(codigo): Path<String>,
) -> Result<Redirect, AppError> {
    let Some(sala) = queries::get_sala_by_codigo(&state.db, &codigo).await? else {
        return Ok(redirect_error("/dashboard", "Sala no encontrada"));
    };

    if queries::desactivar_sala(&state.db, sala.id, usuario.id).await? {
        tracing::info!(sala_id = %sala.id, "room deactivated");
        Ok(redirect_mensaje("/mis-salas", "Sala desactivada"))
    } else {
        Ok(redirect_error(
            &format!("/sala/{}", sala.codigo),
            "Solo el creador puede desactivar la sala",
        ))
    }
}

/// Join-by-code entry: validates the 8-digit shape and redirects into the
/// room page.
pub async fn unirse_por_codigo(Form(form): Form<UnirsePorCodigoForm>) -> Redirect {
    let codigo = validation::sanitize_string(&form.codigo);
    if validation::validate_codigo(&codigo).is_err() {
        return redirect_error(
            "/dashboard",
            &AppError::InvalidRoomCode.to_string(),
        );
    }
    Redirect::to(&format!("/sala/{}", codigo))
}

pub async fn mis_salas(
    State(state): State<AppState>,
    PageUser(usuario): PageUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let salas = queries::list_salas_activas_by_creador(&state.db, usuario.id).await?;
    Ok(Json(json!({
        "page": "mis-salas",
        "salas": salas,
    })))
}
