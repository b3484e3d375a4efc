//! # Configuración
//!
//! Todos los valores vienen de variables de entorno (o del archivo `.env`).
//! Las variables ausentes toman su valor por defecto; las que no se pueden
//! interpretar son un error de arranque.

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::info;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://quai_antique.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Error, Debug)]
#[error("Variable de entorno '{key}' inválida: {message}")]
pub struct ConfigError {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: String,
    /// Directorio de las imágenes, servido en `/uploads`
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que [`Config::from_env`] pero con una fuente de variables arbitraria
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: load_or(&lookup, "DATABASE_URL", DEFAULT_DATABASE_URL.to_string())?,
            database_max_connections: load_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            bind_address: load_or(&lookup, "BIND_ADDRESS", DEFAULT_BIND_ADDRESS.to_string())?,
            upload_dir: load_or(&lookup, "UPLOAD_DIR", PathBuf::from(DEFAULT_UPLOAD_DIR))?,
        })
    }
}

fn load_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => {
            info!("{key} no definida, usando valor por defecto: {default:?}");
            Ok(default)
        }
    }
}
