//! # Autenticación y logging de errores
//!
//! - Resolución del usuario a partir del header `X-AUTH-TOKEN`
//! - Registro de la cadena completa de errores (`source()`) con `tracing`

use std::error::Error as StdError;

use actix_web::HttpRequest;

use super::{AppError, AppResult};
use crate::db::{SqliteRepo, User};

/// Header con el token de API del usuario
pub const AUTH_HEADER: &str = "X-AUTH-TOKEN";

/// Extrae el token del header `X-AUTH-TOKEN`
///
/// # Retorna
/// `None` si el header no viene en la petición
///
/// # Errores
/// - `Unauthorized`: el header existe pero no es texto o está vacío
fn extract_token(req: &HttpRequest) -> AppResult<Option<String>> {
    let Some(header) = req.headers().get(AUTH_HEADER) else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Header X-AUTH-TOKEN inválido".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AppError::Unauthorized("Token de API vacío".to_string()));
    }

    Ok(Some(token.to_string()))
}

/// Usuario de la petición, o `None` si es anónima
///
/// Un token que no corresponde a ningún usuario corta la petición con
/// `401` aunque el endpoint sea público.
pub async fn current_user(repo: &SqliteRepo, req: &HttpRequest) -> AppResult<Option<User>> {
    let Some(token) = extract_token(req)? else {
        return Ok(None);
    };

    match repo.find_user_by_token(&token).await? {
        Some(user) => {
            tracing::debug!(user_id = user.id, "Authenticated request");
            Ok(Some(user))
        }
        None => Err(AppError::Unauthorized("Token de API desconocido".to_string())),
    }
}

/// Exige un usuario autenticado
pub fn require_user(user: Option<User>) -> AppResult<User> {
    user.ok_or_else(|| AppError::Unauthorized("Autenticación requerida".to_string()))
}

/// Atajo para `require_user(current_user(..))`
pub async fn authenticated_user(repo: &SqliteRepo, req: &HttpRequest) -> AppResult<User> {
    require_user(current_user(repo, req).await?)
}

/// Registra la cadena completa de errores
///
/// # Parámetros
/// - `error`: Error a analizar y registrar
/// - `context`: Contexto opcional para añadir información
pub fn log_error_chain<E>(error: &E, context: Option<&str>)
where
    E: StdError + 'static,
{
    let mut error_chain = Vec::new();
    let mut current_error: Option<&dyn StdError> = Some(error);

    while let Some(err) = current_error {
        error_chain.push(err.to_string());
        current_error = err.source();
    }

    if let Some(ctx) = context {
        tracing::error!(
            context = %ctx,
            error_chain = ?error_chain,
            "Error with full chain (with context)"
        );
    } else {
        tracing::error!(error_chain = ?error_chain, "Error with full chain");
    }
}

/// Extension trait para Results que registra la cadena de errores
///
/// Pensado para errores que no llegan a una respuesta HTTP (los binarios);
/// un `AppError` devuelto por un handler ya se registra al responder.
///
/// ```ignore
/// repo.run_migrations()
///     .await
///     .log_error_context("applying migrations")?;
/// ```
pub trait ErrorLogExt<T, E> {
    /// Loggea la cadena de errores con contexto adicional
    fn log_error_context(self, context: &str) -> Result<T, E>;
}

impl<T, E> ErrorLogExt<T, E> for Result<T, E>
where
    E: StdError + 'static,
{
    fn log_error_context(self, context: &str) -> Result<T, E> {
        if let Err(ref error) = self {
            log_error_chain(error, Some(context));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn missing_header_is_anonymous() {
        let req = TestRequest::default().to_http_request();

        assert!(extract_token(&req).unwrap().is_none());
    }

    #[test]
    fn header_value_is_trimmed() {
        let req = TestRequest::default()
            .insert_header((AUTH_HEADER, " abc123 "))
            .to_http_request();

        assert_eq!(extract_token(&req).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn blank_header_is_rejected() {
        let req = TestRequest::default()
            .insert_header((AUTH_HEADER, "   "))
            .to_http_request();

        assert!(matches!(extract_token(&req), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn log_error_context_passes_the_result_through() {
        let ok: Result<i64, AppError> = Ok(3);
        assert_eq!(ok.log_error_context("counting").unwrap(), 3);

        let err: Result<i64, AppError> = Err(AppError::Internal("boom".into()));
        assert!(matches!(err.log_error_context("counting"), Err(AppError::Internal(m)) if m == "boom"));
    }

    #[test]
    fn require_user_rejects_anonymous() {
        assert!(matches!(require_user(None), Err(AppError::Unauthorized(_))));
    }
}
