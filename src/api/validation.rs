//! # Validación de campos
//!
//! Comprobaciones compartidas por todos los handlers: textos obligatorios,
//! longitudes máximas, números mínimos y formatos de fecha/hora.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Decodifica el cuerpo JSON de una petición
///
/// Los handlers que modifican datos reciben el cuerpo sin procesar y lo
/// decodifican después de comprobar token, existencia y dueño.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| AppError::InvalidJson(e.to_string()))
}

/// Valida un email de forma básica
pub fn validate_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// Texto obligatorio, no vacío y de como mucho `max` caracteres
pub fn required_text(field: &str, value: &str, max: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation_field(field, "no puede estar vacío"));
    }
    max_len(field, value, max)?;
    Ok(value.to_string())
}

/// Texto opcional; una cadena vacía se guarda como `NULL`
pub fn optional_text(field: &str, value: Option<String>, max: usize) -> AppResult<Option<String>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            max_len(field, value, max)?;
            Ok(Some(value.to_string()))
        }
    }
}

fn max_len(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::validation_field(
            field,
            &format!("máximo {} caracteres", max),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation_field(
            "password",
            &format!("mínimo {} caracteres", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

/// Entero mayor o igual que 1 (comensales, aforo)
pub fn at_least_one(field: &str, value: i64) -> AppResult<i64> {
    if value < 1 {
        return Err(AppError::validation_field(field, "debe ser >= 1"));
    }
    Ok(value)
}

/// Entero mayor o igual que 0 (precios)
pub fn non_negative(field: &str, value: i64) -> AppResult<i64> {
    if value < 0 {
        return Err(AppError::validation_field(field, "debe ser >= 0"));
    }
    Ok(value)
}

/// Valida y parsea una fecha en formato YYYY-MM-DD
pub fn parse_date(field: &str, value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation_field(field, "formato de fecha inválido, use YYYY-MM-DD"))
}

/// Valida y parsea una hora en formato HH:MM:SS o HH:MM
pub fn parse_time(field: &str, value: &str) -> AppResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| AppError::validation_field(field, "formato de hora inválido, use HH:MM"))
}

/// Fecha-hora en RFC 3339 con segundos y offset numérico
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn format_optional_datetime(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.as_ref().map(format_datetime)
}

pub fn format_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn format_time(value: &NaiveTime) -> String {
    value.format("%H:%M:%S").to_string()
}

/// Distingue un campo ausente de un `null` explícito
///
/// Se usa con `#[serde(default, deserialize_with = "nullable")]` sobre un
/// `Option<Option<T>>`: ausente → `None`, `null` → `Some(None)`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
