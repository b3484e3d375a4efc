//! # Quai Antique
//!
//! API REST de reservas de restaurante: usuarios, restaurantes, carta,
//! imágenes y reservas, con autenticación por token y persistencia SQLite.

pub mod api;
pub mod config;
pub mod db;
pub mod telemetry;
