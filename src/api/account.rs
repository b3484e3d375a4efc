//! # API de Cuenta
//!
//! Perfil del usuario autenticado:
//! - Consultar el perfil propio
//! - Modificar datos personales y contraseña
//! - Borrar la cuenta

use actix_web::{delete, get, patch, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::middleware::authenticated_user;
use super::security::hash_password;
use super::validation::{self, nullable};
use super::AppResult;
use crate::db::{SqliteRepo, User};

/// Perfil tal y como lo ve el propio usuario
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub guest_number: Option<i64>,
    pub allergy: Option<String>,
    pub roles: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            roles: user.effective_roles(),
            created_at: validation::format_datetime(&user.created_at),
            updated_at: validation::format_optional_datetime(&user.updated_at),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            guest_number: user.guest_number,
            allergy: user.allergy,
        }
    }
}

/// Campos modificables del perfil
///
/// Un campo ausente no se toca; `null` o una cadena vacía lo borra.
#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
    #[serde(default, deserialize_with = "nullable")]
    first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    guest_number: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    allergy: Option<Option<String>>,
    password: Option<String>,
}

impl AccountPatch {
    /// Aplica el parche sobre `user`, validando cada campo presente
    pub fn apply(self, user: &mut User) -> AppResult<()> {
        if let Some(first_name) = self.first_name {
            user.first_name = validation::optional_text("firstName", first_name, 32)?;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = validation::optional_text("lastName", last_name, 64)?;
        }
        if let Some(guest_number) = self.guest_number {
            user.guest_number = guest_number
                .map(|n| validation::at_least_one("guestNumber", n))
                .transpose()?;
        }
        if let Some(allergy) = self.allergy {
            user.allergy = validation::optional_text("allergy", allergy, 255)?;
        }
        if let Some(password) = self.password.filter(|p| !p.is_empty()) {
            validation::validate_password(&password)?;
            user.password = hash_password(&password)?;
        }

        user.updated_at = Some(SqliteRepo::current_timestamp());
        Ok(())
    }
}

/// Devuelve el perfil del usuario autenticado
///
/// # Errores
///
/// - `401 Unauthorized`: Sin token o token desconocido
#[get("/api/account/me", name = "account_me")]
async fn me(repo: web::Data<SqliteRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    let user = authenticated_user(&repo, &req).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Modifica el perfil del usuario autenticado
///
/// # Errores
///
/// - `400 Bad Request`: JSON inválido, `guestNumber < 1` o contraseña corta
/// - `401 Unauthorized`: Sin token o token desconocido
#[patch("/api/account/edit")]
#[tracing::instrument(skip_all)]
async fn edit_account(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    body: web::Bytes,
) -> AppResult<impl Responder> {
    let mut user = authenticated_user(&repo, &req).await?;

    let data: AccountPatch = validation::parse_body(&body)?;
    data.apply(&mut user)?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::update_user(&mut conn, &user).await?;

    tracing::info!(user_id = user.id, "Account updated");
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Borra la cuenta del usuario autenticado
///
/// Sus reservas se conservan sin cliente y su restaurante queda sin dueño.
#[delete("/api/account")]
#[tracing::instrument(skip_all)]
async fn delete_account(repo: web::Data<SqliteRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    let user = authenticated_user(&repo, &req).await?;

    let mut conn = repo.acquire().await?;
    SqliteRepo::delete_user(&mut conn, user.id).await?;

    tracing::info!(user_id = user.id, "Account deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(me)
        .service(edit_account)
        .service(delete_account);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AppError;
    use chrono::Utc;
    use sqlx::types::Json;

    fn user() -> User {
        User {
            id: 1,
            email: "email.1@studi.fr".into(),
            roles: Json(vec![]),
            password: "hash".into(),
            api_token: "token".into(),
            first_name: Some("Camille".into()),
            last_name: Some("Martin".into()),
            guest_number: Some(2),
            allergy: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn absent_fields_are_left_untouched() {
        let mut user = user();
        let patch: AccountPatch = serde_json::from_str(r#"{"allergy": "gluten"}"#).unwrap();

        patch.apply(&mut user).unwrap();

        assert_eq!(user.first_name.as_deref(), Some("Camille"));
        assert_eq!(user.guest_number, Some(2));
        assert_eq!(user.allergy.as_deref(), Some("gluten"));
        assert_eq!(user.password, "hash");
        assert!(user.updated_at.is_some());
    }

    #[test]
    fn null_and_empty_clear_fields() {
        let mut user = user();
        let patch: AccountPatch =
            serde_json::from_str(r#"{"guestNumber": null, "firstName": ""}"#).unwrap();

        patch.apply(&mut user).unwrap();

        assert_eq!(user.guest_number, None);
        assert_eq!(user.first_name, None);
    }

    #[test]
    fn guest_number_below_one_is_rejected() {
        let patch: AccountPatch = serde_json::from_str(r#"{"guestNumber": 0}"#).unwrap();

        let err = patch.apply(&mut user()).unwrap_err();

        assert!(matches!(err, AppError::ValidationWithField { field, .. } if field == "guestNumber"));
    }

    #[test]
    fn short_password_is_rejected_and_long_one_hashed() {
        let short: AccountPatch = serde_json::from_str(r#"{"password": "1234"}"#).unwrap();
        assert!(short.apply(&mut user()).is_err());

        let mut user = user();
        let long: AccountPatch = serde_json::from_str(r#"{"password": "new password"}"#).unwrap();
        long.apply(&mut user).unwrap();
        assert!(crate::api::security::verify_password("new password", &user.password));
    }

    #[test]
    fn response_includes_implicit_role() {
        let response = UserResponse::from(user());

        assert_eq!(response.roles, vec!["ROLE_USER".to_string()]);
        assert!(response.created_at.ends_with("+00:00"));
    }
}
