use crate::AppState;
use crate::db::models::Usuario;
use crate::error::AppError;
use crate::services::auth::SESSION_COOKIE;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

/// Pulls the session token out of the Cookie header.
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<Usuario>, AppError> {
    let Some(token) = cookie_token(&parts.headers) else {
        return Ok(None);
    };
    state.sesiones.resolver(&token).await
}

/// Authenticated-identity guard for JSON flows: missing or expired
/// sessions get a 401 with the standard error body.
pub struct ApiUser(pub Usuario);

#[async_trait]
impl FromRequestParts<AppState> for ApiUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await? {
            Some(usuario) => Ok(ApiUser(usuario)),
            None => Err(AppError::Unauthorized),
        }
    }
}

/// Same guard for browser flows: unauthenticated requests are redirected
/// to the login page instead of erroring.
pub struct PageUser(pub Usuario);

pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to("/login?error=Debes%20iniciar%20sesi%C3%B3n").into_response()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await {
            Ok(Some(usuario)) => Ok(PageUser(usuario)),
            Ok(None) => Err(LoginRedirect),
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                Err(LoginRedirect)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; dreampay_session=abc123; lang=es"),
        );
        assert_eq!(cookie_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn missing_cookie_header_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(cookie_token(&headers), None);
    }

    #[test]
    fn unrelated_cookies_yield_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(cookie_token(&headers), None);
    }
}
