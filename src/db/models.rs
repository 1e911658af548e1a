use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Transaction lifecycle states. `pending` and `cancelled` are part of the
/// declared set but no flow produces them today; see DESIGN.md.
pub mod estado {
    pub const INITIATED: &str = "initiated";
    pub const PENDING: &str = "pending";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
    pub const CANCELLED: &str = "cancelled";

    pub const ALL: &[&str] = &[INITIATED, PENDING, COMPLETED, FAILED, CANCELLED];
}

/// Membership roles. The seller side is implied by `salas.creador_id` and
/// never gets a row of its own.
pub mod rol {
    pub const COMPRADOR: &str = "comprador";
}

pub const MONEDA_USD: &str = "USD";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Usuario {
    pub id: Uuid,
    pub nombre: String,
    pub apellido_paterno: String,
    pub apellido_materno: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub wallet_pointer: Option<String>,
    pub fecha_registro: DateTime<Utc>,
}

impl Usuario {
    pub fn new(
        nombre: String,
        apellido_paterno: String,
        apellido_materno: String,
        email: String,
        password_hash: String,
        wallet_pointer: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            nombre,
            apellido_paterno,
            apellido_materno,
            email,
            password_hash,
            wallet_pointer,
            fecha_registro: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Sala {
    pub id: Uuid,
    pub codigo: String,
    pub nombre_producto: String,
    pub descripcion: Option<String>,
    pub precio: BigDecimal,
    pub condicion: String,
    pub creador_id: Uuid,
    pub fecha_creacion: DateTime<Utc>,
    pub activa: bool,
}

impl Sala {
    pub fn new(
        codigo: String,
        nombre_producto: String,
        descripcion: Option<String>,
        precio: BigDecimal,
        condicion: String,
        creador_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            codigo,
            nombre_producto,
            descripcion,
            precio,
            condicion,
            creador_id,
            fecha_creacion: Utc::now(),
            activa: true,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Miembro {
    pub id: Uuid,
    pub sala_id: Uuid,
    pub usuario_id: Uuid,
    pub rol: String,
    pub fecha_union: DateTime<Utc>,
}

impl Miembro {
    pub fn comprador(sala_id: Uuid, usuario_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            sala_id,
            usuario_id,
            rol: rol::COMPRADOR.to_string(),
            fecha_union: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaccion {
    pub id: Uuid,
    pub sala_id: Uuid,
    pub usuario_id: Uuid,
    pub receiver_wallet: String,
    pub monto: BigDecimal,
    pub moneda: String,
    pub estado: String,
    pub payment_id: Option<String>,
    pub quote_id: Option<String>,
    pub interaction_url: Option<String>,
    #[serde(skip_serializing)]
    pub continue_uri: Option<String>,
    #[serde(skip_serializing)]
    pub continue_token: Option<String>,
    pub error_message: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_completado: Option<DateTime<Utc>>,
}

impl Transaccion {
    /// `monto` is always the sala's price, pinned by the caller before
    /// construction; the user-supplied amount never reaches this type.
    pub fn iniciada(
        sala_id: Uuid,
        usuario_id: Uuid,
        receiver_wallet: String,
        monto: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sala_id,
            usuario_id,
            receiver_wallet,
            monto,
            moneda: MONEDA_USD.to_string(),
            estado: estado::INITIATED.to_string(),
            payment_id: None,
            quote_id: None,
            interaction_url: None,
            continue_uri: None,
            continue_token: None,
            error_message: None,
            fecha_creacion: Utc::now(),
            fecha_completado: None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Sesion {
    pub id: Uuid,
    pub usuario_id: Uuid,
    pub token_hash: String,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_expiracion: DateTime<Utc>,
}

impl Sesion {
    pub fn new(usuario_id: Uuid, token_hash: String, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            usuario_id,
            token_hash,
            fecha_creacion: now,
            fecha_expiracion: now + Duration::hours(ttl_hours),
        }
    }

    pub fn expirada(&self) -> bool {
        self.fecha_expiracion <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn transaccion_starts_initiated_with_usd() {
        let tx = Transaccion::iniciada(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "$ilp.interledger-test.dev/bobdev".to_string(),
            BigDecimal::from_str("25.00").unwrap(),
        );
        assert_eq!(tx.estado, estado::INITIATED);
        assert_eq!(tx.moneda, MONEDA_USD);
        assert!(tx.payment_id.is_none());
        assert!(tx.fecha_completado.is_none());
        assert!(tx.continue_uri.is_none());
    }

    #[test]
    fn sala_defaults_to_activa() {
        let sala = Sala::new(
            "12345678".to_string(),
            "Bicicleta".to_string(),
            None,
            BigDecimal::from_str("150.00").unwrap(),
            "usada".to_string(),
            Uuid::new_v4(),
        );
        assert!(sala.activa);
        assert_eq!(sala.codigo.len(), 8);
    }

    #[test]
    fn miembro_comprador_carries_role() {
        let m = Miembro::comprador(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(m.rol, rol::COMPRADOR);
    }

    #[test]
    fn fresh_session_is_not_expired() {
        let s = Sesion::new(Uuid::new_v4(), "abc".to_string(), 24);
        assert!(!s.expirada());
        let vencida = Sesion::new(Uuid::new_v4(), "abc".to_string(), -1);
        assert!(vencida.expirada());
    }

    #[test]
    fn usuario_serialization_hides_password_hash() {
        let u = Usuario::new(
            "Ana".to_string(),
            "García".to_string(),
            "López".to_string(),
            "ana@example.com".to_string(),
            "$argon2id$v=19$...".to_string(),
            Some("$ilp.interledger-test.dev/anadev".to_string()),
        );
        let json = serde_json::to_value(&u).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ana@example.com");
    }
}
