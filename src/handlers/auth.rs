use crate::AppState;
use crate::db::models::Usuario;
use crate::db::queries;
use crate::error::AppError;
use crate::handlers::{redirect_error, redirect_mensaje};
use crate::middleware::auth::{PageUser, cookie_token};
use crate::services::auth::{self, SESSION_COOKIE};
use crate::validation;
use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse, Redirect},
};
use serde::Deserialize;
use serde_json::json;
use sqlx::error::ErrorKind;

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub nombre: String,
    pub apellido_paterno: String,
    pub apellido_materno: String,
    pub email: String,
    pub password: String,
    pub wallet_pointer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Page data for the renderer: the fields the signup form expects.
pub async fn signup_page() -> Json<serde_json::Value> {
    Json(json!({
        "page": "signup",
        "fields": ["nombre", "apellido_paterno", "apellido_materno", "email", "password", "wallet_pointer"],
    }))
}

pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, AppError> {
    for (field, value) in [
        ("nombre", &form.nombre),
        ("apellido_paterno", &form.apellido_paterno),
        ("apellido_materno", &form.apellido_materno),
    ] {
        if validation::validate_required(field, value).is_err() {
            return Ok(redirect_error("/signup", &format!("Falta el campo {}", field)));
        }
    }
    if let Err(e) = validation::validate_email(&form.email) {
        return Ok(redirect_error("/signup", &e.to_string()));
    }
    if form.password.len() < 8 {
        return Ok(redirect_error(
            "/signup",
            "La contraseña debe tener al menos 8 caracteres",
        ));
    }
    if let Some(wallet) = form.wallet_pointer.as_deref().filter(|w| !w.trim().is_empty()) {
        if validation::validate_wallet_pointer(wallet).is_err() {
            return Ok(redirect_error(
                "/signup",
                "El wallet pointer debe comenzar con '$'",
            ));
        }
    }

    let email = validation::sanitize_string(&form.email).to_lowercase();
    let usuario = Usuario::new(
        validation::sanitize_string(&form.nombre),
        validation::sanitize_string(&form.apellido_paterno),
        validation::sanitize_string(&form.apellido_materno),
        email.clone(),
        auth::hash_password(&form.password)?,
        form.wallet_pointer
            .as_deref()
            .map(validation::sanitize_string)
            .filter(|w| !w.is_empty()),
    );

    match queries::insert_usuario(&state.db, &usuario).await {
        Ok(creado) => {
            tracing::info!(usuario_id = %creado.id, "user registered");
            Ok(redirect_mensaje("/login", "Cuenta creada, inicia sesión"))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.kind() == ErrorKind::UniqueViolation => {
            Ok(redirect_error(
                "/signup",
                &AppError::DuplicateEmail(email).to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login_page() -> Json<serde_json::Value> {
    Json(json!({
        "page": "login",
        "fields": ["email", "password"],
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<axum::response::Response, AppError> {
    let email = validation::sanitize_string(&form.email).to_lowercase();
    let usuario = queries::get_usuario_by_email(&state.db, &email).await?;

    let Some(usuario) = usuario else {
        return Ok(redirect_error("/login", "Correo o contraseña incorrectos").into_response());
    };
    if !auth::verify_password(&usuario.password_hash, &form.password)? {
        return Ok(redirect_error("/login", "Correo o contraseña incorrectos").into_response());
    }

    let token = state.sesiones.iniciar(&usuario).await?;
    tracing::info!(usuario_id = %usuario.id, "login");

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token
    );
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/dashboard"),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = cookie_token(&headers) {
        state.sesiones.cerrar(&token).await?;
    }

    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/"),
    ))
}

/// Authenticated landing: the user plus their active salas, for the
/// renderer to lay out.
pub async fn dashboard(
    State(state): State<AppState>,
    PageUser(usuario): PageUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let salas = queries::list_salas_activas_by_creador(&state.db, usuario.id).await?;
    Ok(Json(json!({
        "usuario": usuario,
        "salas": salas,
    })))
}
