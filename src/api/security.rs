//! # API de Seguridad
//!
//! Alta de usuarios y login. Ambos devuelven el token de API que el cliente
//! debe enviar después en el header `X-AUTH-TOKEN`.

use actix_web::http::header;
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation;
use super::{AppError, AppResult, ResultExt};
use crate::db::{NewUser, SqliteRepo, User};

/// Hash argon2 en formato PHC
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal_trace(&format!("hashing password: {}", e), None))
}

/// Compara una contraseña con su hash; un hash ilegible nunca coincide
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is not a PHC string");
            false
        }
    }
}

pub fn generate_api_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Registration {
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    guest_number: Option<i64>,
    allergy: Option<String>,
}

/// Credenciales de login; `username` y `email` son equivalentes
#[derive(Deserialize)]
struct LoginRequest {
    username: Option<String>,
    email: Option<String>,
    password: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub user: String,
    pub api_token: String,
    pub roles: Vec<String>,
}

impl From<&User> for TokenResponse {
    fn from(user: &User) -> Self {
        TokenResponse {
            user: user.email.clone(),
            api_token: user.api_token.clone(),
            roles: user.effective_roles(),
        }
    }
}

/// Registra un nuevo usuario
///
/// # Respuesta
///
/// ```json
/// {
///   "user": "email.1@studi.fr",
///   "apiToken": "3f1c...",
///   "roles": ["ROLE_USER"]
/// }
/// ```
///
/// # Errores
///
/// - `400 Bad Request`: Email inválido, contraseña de menos de 8 caracteres
/// - `409 Conflict`: El email ya está registrado
#[post("/api/registration")]
#[tracing::instrument(skip_all)]
async fn register(
    repo: web::Data<SqliteRepo>,
    req: HttpRequest,
    data: web::Json<Registration>,
) -> AppResult<impl Responder> {
    let data = data.into_inner();

    let email = validation::required_text("email", &data.email, 180)?;
    if !validation::validate_email(&email) {
        return Err(AppError::validation_field("email", "formato de email inválido"));
    }
    validation::validate_password(&data.password)?;

    let new_user = NewUser {
        email,
        roles: Vec::new(),
        password: hash_password(&data.password)?,
        api_token: generate_api_token(),
        first_name: validation::optional_text("firstName", data.first_name, 32)?,
        last_name: validation::optional_text("lastName", data.last_name, 64)?,
        guest_number: data
            .guest_number
            .map(|n| validation::at_least_one("guestNumber", n))
            .transpose()?,
        allergy: validation::optional_text("allergy", data.allergy, 255)?,
    };

    let mut conn = repo.acquire().await?;
    let user = SqliteRepo::insert_user(&mut conn, &new_user).await?;

    tracing::info!(user_id = user.id, "User registered");

    let location = req
        .url_for_static("account_me")
        .map_err_internal("building account location")?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location.to_string()))
        .json(TokenResponse::from(&user)))
}

/// Intercambia email y contraseña por el token de API
///
/// # Errores
///
/// - `400 Bad Request`: Falta el email
/// - `401 Unauthorized`: Credenciales incorrectas
#[post("/api/login")]
#[tracing::instrument(skip_all)]
async fn login(repo: web::Data<SqliteRepo>, data: web::Json<LoginRequest>) -> AppResult<impl Responder> {
    let data = data.into_inner();
    let email = data
        .username
        .or(data.email)
        .ok_or_else(|| AppError::validation_field("username", "es obligatorio"))?;

    match repo.find_user_by_email(email.trim()).await? {
        Some(user) if verify_password(&data.password, &user.password) => {
            tracing::info!(user_id = user.id, "Login succeeded");
            Ok(HttpResponse::Ok().json(TokenResponse::from(&user)))
        }
        _ => Err(AppError::Unauthorized("Credenciales incorrectas".to_string())),
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login);
}
