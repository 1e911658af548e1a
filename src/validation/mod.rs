use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;

pub const CODIGO_LEN: usize = 8;
pub const WALLET_SIGIL: char = '$';
pub const CONDICIONES: &[&str] = &["nueva", "usada"];

/// Absolute tolerance when comparing a declared amount against the sala
/// price. The persisted amount is still always the sala price itself.
pub fn tolerancia() -> BigDecimal {
    BigDecimal::from_str("0.01").expect("static decimal")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "no puede estar vacío"));
    }

    Ok(())
}

/// Room codes are exactly 8 decimal digits, nothing else.
pub fn validate_codigo(codigo: &str) -> ValidationResult {
    let codigo = sanitize_string(codigo);
    if codigo.len() != CODIGO_LEN || !codigo.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "codigo",
            format!("debe tener exactamente {} dígitos", CODIGO_LEN),
        ));
    }

    Ok(())
}

/// Wallet pointers use the payment-pointer sigil form, `$domain/user`.
pub fn validate_wallet_pointer(wallet: &str) -> ValidationResult {
    let wallet = sanitize_string(wallet);
    validate_required("wallet", &wallet)?;

    if !wallet.starts_with(WALLET_SIGIL) {
        return Err(ValidationError::new("wallet", "debe comenzar con '$'"));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult {
    let email = sanitize_string(email);
    validate_required("email", &email)?;

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::new("email", "no es un correo válido"));
    }

    Ok(())
}

pub fn validate_precio(precio: &BigDecimal) -> ValidationResult {
    if precio <= &BigDecimal::from(0) {
        return Err(ValidationError::new("precio", "debe ser mayor que cero"));
    }

    Ok(())
}

pub fn validate_condicion(condicion: &str) -> ValidationResult {
    if CONDICIONES.iter().all(|candidate| condicion != *candidate) {
        return Err(ValidationError::new(
            "condicion",
            format!("debe ser una de: {}", CONDICIONES.join(", ")),
        ));
    }

    Ok(())
}

/// The declared amount must match the sala price within ±0.01 absolute.
pub fn amount_matches_precio(amount: &BigDecimal, precio: &BigDecimal) -> bool {
    let diff = amount - precio;
    diff.abs() <= tolerancia()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    #[test]
    fn validates_codigo_format() {
        assert!(validate_codigo("12345678").is_ok());
        assert!(validate_codigo(" 12345678 ").is_ok());
        assert!(validate_codigo("1234567").is_err());
        assert!(validate_codigo("123456789").is_err());
        assert!(validate_codigo("1234567a").is_err());
        assert!(validate_codigo("").is_err());
    }

    #[test]
    fn validates_wallet_sigil() {
        assert!(validate_wallet_pointer("$ilp.interledger-test.dev/bobdev").is_ok());
        assert!(validate_wallet_pointer("https://ilp.interledger-test.dev/bobdev").is_err());
        assert!(validate_wallet_pointer("ilp.interledger-test.dev/bobdev").is_err());
        assert!(validate_wallet_pointer("   ").is_err());
    }

    #[test]
    fn validates_email_shape() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("example.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn validates_precio_positive() {
        assert!(validate_precio(&dec("25.00")).is_ok());
        assert!(validate_precio(&dec("0")).is_err());
        assert!(validate_precio(&dec("-5.00")).is_err());
    }

    #[test]
    fn validates_condicion_values() {
        assert!(validate_condicion("nueva").is_ok());
        assert!(validate_condicion("usada").is_ok());
        assert!(validate_condicion("rota").is_err());
    }

    #[test]
    fn amount_tolerance_is_one_cent_absolute() {
        let precio = dec("25.00");
        assert!(amount_matches_precio(&dec("25.00"), &precio));
        assert!(amount_matches_precio(&dec("25.01"), &precio));
        assert!(amount_matches_precio(&dec("24.99"), &precio));
        assert!(!amount_matches_precio(&dec("25.02"), &precio));
        assert!(!amount_matches_precio(&dec("30.00"), &precio));
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hola\tmundo  "), "hola mundo");
        assert_eq!(sanitize_string("ab\u{0000}cd"), "abcd");
        assert_eq!(sanitize_string(" \n "), "");
    }
}
