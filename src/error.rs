use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application error taxonomy. Every variant maps to a status code and a
/// JSON body carrying `success: false`, so API callers can always branch
/// on the same shape. User-facing messages are in Spanish to match the
/// rest of the surface.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error de base de datos: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Falta el campo requerido: {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("El wallet pointer debe comenzar con '$'")]
    InvalidWalletFormat,

    #[error("El monto no coincide con el precio de la sala ({0})")]
    AmountMismatch(String),

    #[error("El código de sala debe tener exactamente 8 dígitos")]
    InvalidRoomCode,

    #[error("Falta el parámetro interact_ref")]
    MissingInteractionRef,

    #[error("Sala no encontrada: {0}")]
    RoomNotFound(String),

    #[error("Transacción no encontrada: {0}")]
    TransactionNotFound(String),

    #[error("No encontrado: {0}")]
    NotFound(String),

    #[error("No autenticado")]
    Unauthorized,

    #[error("El creador de la sala no puede pagarse a sí mismo")]
    SelfPaymentForbidden,

    #[error("La sala no está activa")]
    RoomInactive,

    #[error("El creador de la sala no puede unirse como comprador")]
    CreatorCannotJoin,

    #[error("No tienes permiso para esta operación")]
    Forbidden,

    #[error("Ya existe una cuenta con el correo {0}")]
    DuplicateEmail(String),

    #[error("No eres miembro de esta sala")]
    NotAMember,

    #[error("No se pudo generar un código de sala único")]
    CodeSpaceExhausted,

    #[error("{0}")]
    Gateway(String),

    #[error("Error interno: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingField(_)
            | AppError::Validation(_)
            | AppError::InvalidWalletFormat
            | AppError::AmountMismatch(_)
            | AppError::InvalidRoomCode
            | AppError::MissingInteractionRef => StatusCode::BAD_REQUEST,
            AppError::RoomNotFound(_)
            | AppError::TransactionNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::SelfPaymentForbidden
            | AppError::RoomInactive
            | AppError::CreatorCannotJoin
            | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DuplicateEmail(_) | AppError::NotAMember => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::CodeSpaceExhausted
            | AppError::Gateway(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        assert_eq!(
            AppError::MissingField("salaId").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AmountMismatch("25.00".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidWalletFormat.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::MissingInteractionRef.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_errors_map_to_404() {
        assert_eq!(
            AppError::RoomNotFound("12345678".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::TransactionNotFound("abc".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn authorization_errors_map_to_403() {
        assert_eq!(
            AppError::SelfPaymentForbidden.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::RoomInactive.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::CreatorCannotJoin.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn gateway_and_internal_errors_map_to_500() {
        assert_eq!(
            AppError::Gateway("conexión rechazada".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::CodeSpaceExhausted.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn amount_mismatch_message_carries_expected_price() {
        let error = AppError::AmountMismatch("25.00".to_string());
        assert!(error.to_string().contains("25.00"));
    }

    #[tokio::test]
    async fn response_body_carries_success_false() {
        let response = AppError::SelfPaymentForbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 403);
    }
}
