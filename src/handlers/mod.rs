pub mod auth;
pub mod pagos;
pub mod salas;

use axum::response::Redirect;
use url::form_urlencoded;

/// Browser flows never land on a blank error page: outcomes travel as a
/// URL-encoded flash message in the query string.
pub fn redirect_con(path: &str, clave: &str, mensaje: &str) -> Redirect {
    let encoded: String = form_urlencoded::byte_serialize(mensaje.as_bytes()).collect();
    Redirect::to(&format!("{}?{}={}", path, clave, encoded))
}

pub fn redirect_error(path: &str, mensaje: &str) -> Redirect {
    redirect_con(path, "error", mensaje)
}

pub fn redirect_mensaje(path: &str, mensaje: &str) -> Redirect {
    redirect_con(path, "mensaje", mensaje)
}

/// Legacy health probe. The `messange` field name is wrong but existing
/// monitors key on it, so it stays.
pub async fn api_status() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "messange": "El servidor de la API está funcionando",
    }))
}

/// Public landing: serves the signup page.
pub async fn landing() -> Redirect {
    Redirect::to("/signup")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_messages_are_url_encoded() {
        let redirect = redirect_error("/login", "Sala no encontrada");
        let response = axum::response::IntoResponse::into_response(redirect);
        let location = response
            .headers()
            .get(axum::http::header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(location, "/login?error=Sala+no+encontrada");
    }

    #[tokio::test]
    async fn api_status_preserves_messange_field() {
        let body = api_status().await.0;
        assert_eq!(body["status"], "ok");
        assert!(body["messange"].as_str().unwrap().contains("funcionando"));
    }
}
