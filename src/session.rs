// Archivo: session.rs
// Propósito: usuario que actúa en la petición, tomado de la cabecera
// `X-Usuario`. No autentica: sólo se usa para la bitácora.
use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

pub const USER_HEADER: &str = "x-usuario";
pub const ANONYMOUS: &str = "anonimo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
}

impl<S> FromRequestParts<S> for Session where S: Send + Sync
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.headers
                        .get(USER_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .map(str::trim)
                        .filter(|value| !value.is_empty())
                        .unwrap_or(ANONYMOUS);
        Ok(Session { user: user.to_string() })
    }
}
