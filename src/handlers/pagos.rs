use crate::AppState;
use crate::db::models::Transaccion;
use crate::db::queries;
use crate::error::AppError;
use crate::gateway::GatewayError;
use crate::handlers::{redirect_error, redirect_mensaje};
use crate::middleware::auth::ApiUser;
use crate::validation;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

const ERROR_CONEXION: &str = "No se pudo conectar con el servicio de pagos";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentBody {
    pub receiver_wallet: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub amount: Option<BigDecimal>,
    pub sala_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub interact_ref: Option<String>,
}

fn gateway_err(e: GatewayError) -> AppError {
    match e {
        GatewayError::Rejected(msg) => AppError::Gateway(msg),
        GatewayError::NotFound(id) => AppError::TransactionNotFound(id),
        other => {
            tracing::error!(error = %other, "payments service unreachable");
            AppError::Gateway(ERROR_CONEXION.to_string())
        }
    }
}

/// Validates and persists the intent to pay, then hands off to the
/// payments service. The persisted amount is pinned to the sala's price;
/// the declared amount is only checked against it.
#[utoipa::path(
    post,
    path = "/initiate-payment",
    request_body = InitiatePaymentBody,
    responses(
        (status = 200, description = "Payment initiated; body carries transactionId, interactionUrl and quote"),
        (status = 400, description = "Missing field, amount mismatch or malformed wallet pointer"),
        (status = 403, description = "Self payment or inactive room"),
        (status = 404, description = "Room not found"),
        (status = 500, description = "Payments service rejected the request or was unreachable"),
    ),
    tag = "Pagos"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    ApiUser(usuario): ApiUser,
    Json(body): Json<InitiatePaymentBody>,
) -> Result<impl IntoResponse, AppError> {
    let receiver_wallet = body
        .receiver_wallet
        .as_deref()
        .map(validation::sanitize_string)
        .filter(|w| !w.is_empty())
        .ok_or(AppError::MissingField("receiverWallet"))?;
    let amount = body.amount.ok_or(AppError::MissingField("amount"))?;
    let sala_id = body
        .sala_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(AppError::MissingField("salaId"))?;

    let sala_uuid = Uuid::parse_str(sala_id.trim())
        .map_err(|_| AppError::RoomNotFound(sala_id.to_string()))?;
    let sala = queries::get_sala(&state.db, sala_uuid)
        .await?
        .ok_or_else(|| AppError::RoomNotFound(sala_id.to_string()))?;

    if !sala.activa {
        return Err(AppError::RoomInactive);
    }
    if sala.creador_id == usuario.id {
        return Err(AppError::SelfPaymentForbidden);
    }
    if !validation::amount_matches_precio(&amount, &sala.precio) {
        return Err(AppError::AmountMismatch(sala.precio.to_string()));
    }
    if validation::validate_wallet_pointer(&receiver_wallet).is_err() {
        return Err(AppError::InvalidWalletFormat);
    }

    // Anti-tampering: the row always carries the sala price, never the
    // declared amount, even though the two were just checked to match.
    let tx = Transaccion::iniciada(sala.id, usuario.id, receiver_wallet, sala.precio.clone());
    let tx = queries::insert_transaccion(&state.db, &tx).await?;
    tracing::info!(transaccion_id = %tx.id, sala_id = %sala.id, "payment initiated");

    match state
        .payments
        .initiate_payment(&tx.receiver_wallet, &tx.monto, tx.id, &tx.moneda)
        .await
    {
        Ok(initiated) => {
            queries::guardar_continuacion(
                &state.db,
                tx.id,
                &initiated.continue_uri,
                &initiated.continue_token,
                None,
                Some(&initiated.interaction_url),
            )
            .await?;

            Ok(Json(json!({
                "success": true,
                "transactionId": tx.id,
                "interactionUrl": initiated.interaction_url,
                "quote": initiated.quote,
            })))
        }
        Err(e) => {
            // Compensating action: never leave the row dangling at
            // `initiated` when the outward call did not produce a grant.
            let motivo = match &e {
                GatewayError::Rejected(msg) => msg.clone(),
                _ => ERROR_CONEXION.to_string(),
            };
            if let Err(update_err) = queries::marcar_fallida(&state.db, tx.id, &motivo).await {
                tracing::error!(
                    transaccion_id = %tx.id,
                    error = %update_err,
                    "failed to mark transaction as failed"
                );
            }
            Err(gateway_err(e))
        }
    }
}

/// Browser redirect target after the user authorizes the grant at the
/// gateway. Works on any session or process: the continuation handle
/// lives on the transaction row.
pub async fn payment_callback(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Query(params): Query<CallbackQuery>,
) -> Redirect {
    let destino = "/mis-transacciones";

    let Ok(tx_id) = Uuid::parse_str(&transaction_id) else {
        return redirect_error(destino, &AppError::TransactionNotFound(transaction_id).to_string());
    };
    let Some(interact_ref) = params
        .interact_ref
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
    else {
        return redirect_error(destino, &AppError::MissingInteractionRef.to_string());
    };

    let tx = match queries::get_transaccion(&state.db, tx_id).await {
        Ok(Some(tx)) => tx,
        Ok(None) => {
            return redirect_error(
                destino,
                &AppError::TransactionNotFound(transaction_id).to_string(),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "transaction lookup failed");
            return redirect_error(destino, "Error interno");
        }
    };

    let (Some(continue_uri), Some(continue_token)) = (&tx.continue_uri, &tx.continue_token) else {
        // Initiation never stored a grant (or the row is already terminal).
        return redirect_error(
            destino,
            &AppError::TransactionNotFound(transaction_id).to_string(),
        );
    };

    match state
        .payments
        .complete_payment(tx.id, interact_ref, continue_uri, continue_token)
        .await
    {
        Ok(payment_id) => {
            match queries::marcar_completada(&state.db, tx.id, &payment_id).await {
                Ok(true) => {
                    tracing::info!(transaccion_id = %tx.id, payment_id = %payment_id, "payment completed");
                    redirect_mensaje(destino, &format!("Pago completado: {}", payment_id))
                }
                Ok(false) => redirect_mensaje(destino, "El pago ya había sido procesado"),
                Err(e) => {
                    tracing::error!(error = %e, "failed to record completed payment");
                    redirect_error(destino, "Error interno")
                }
            }
        }
        Err(GatewayError::Rejected(msg)) => {
            if let Err(e) = queries::marcar_fallida(&state.db, tx.id, &msg).await {
                tracing::error!(error = %e, "failed to record failed payment");
            }
            redirect_error(destino, &msg)
        }
        Err(e) => {
            // Transport problem: the row stays `initiated`, the user can
            // retry the callback.
            tracing::error!(error = %e, "payments service unreachable during callback");
            redirect_error(destino, ERROR_CONEXION)
        }
    }
}

/// Live status passthrough from the payments service; no local state is
/// consulted or updated.
#[utoipa::path(
    get,
    path = "/payment-status/{transaction_id}",
    params(("transaction_id" = String, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Gateway-reported status, verbatim"),
        (status = 404, description = "Gateway does not know the transaction"),
        (status = 500, description = "Payments service unreachable"),
    ),
    tag = "Pagos"
)]
pub async fn payment_status(
    State(state): State<AppState>,
    ApiUser(_usuario): ApiUser,
    Path(transaction_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tx_id = Uuid::parse_str(&transaction_id)
        .map_err(|_| AppError::TransactionNotFound(transaction_id.clone()))?;

    let status = state
        .payments
        .transaction_status(tx_id)
        .await
        .map_err(gateway_err)?;
    Ok(Json(status))
}

#[utoipa::path(
    get,
    path = "/mis-transacciones",
    responses(
        (status = 200, description = "Transactions of the current user"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "Pagos"
)]
pub async fn mis_transacciones(
    State(state): State<AppState>,
    ApiUser(usuario): ApiUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let transacciones = queries::list_transacciones_by_usuario(&state.db, usuario.id).await?;
    Ok(Json(json!({
        "success": true,
        "transacciones": transacciones,
    })))
}

/// Proxied health check of the payments service.
pub async fn payments_service_health(State(state): State<AppState>) -> impl IntoResponse {
    match state.payments.health().await {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unreachable",
                "error": e.to_string(),
            })),
        ),
    }
}
