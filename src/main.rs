//! # Quai Antique Server
//!
//! Servidor web de reservas de restaurante construido con Rust, Actix Web y SQLite.
//!
//! ## Configuración
//!
//! El servidor se configura mediante variables de entorno (archivo `.env`):
//!
//! ```env
//! # Base de datos SQLite
//! DATABASE_URL=sqlite://quai_antique.db?mode=rwc
//! DATABASE_MAX_CONNECTIONS=5
//!
//! # Servidor
//! BIND_ADDRESS=0.0.0.0:8080
//! UPLOAD_DIR=./uploads
//!
//! # Logging
//! RUST_LOG=quai_antique=debug,sqlx=warn,actix_web=info
//! ```
//!
//! ## Ejecución
//!
//! ```bash
//! cp .env.example .env
//! cargo run --bin load_fixtures   # opcional, datos de demostración
//! cargo run
//! ```
//!
//! ## Arquitectura
//!
//! ```text
//! Cliente HTTP (header X-AUTH-TOKEN)
//!     ↓ HTTP/JSON
//! API REST (Actix Web)
//!     ↓ sqlx
//! SQLite
//! ```

use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};

use quai_antique::api;
use quai_antique::api::middleware::ErrorLogExt;
use quai_antique::config::Config;
use quai_antique::db::SqliteRepo;
use quai_antique::telemetry;

/// Función principal que inicia el servidor web
///
/// 1. Carga variables de entorno desde `.env`
/// 2. Configura el logging con tracing
/// 3. Abre la base de datos y aplica las migraciones
/// 4. Sirve la API y el directorio de imágenes en `/uploads`
///
/// # Errores
///
/// Retorna `std::io::Error` si la configuración es inválida, no se puede
/// abrir la base de datos o no se puede bindear al puerto.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    tracing::info!("Iniciando Quai Antique Server con SQLite...");

    let config = Config::from_env().map_err(|e| {
        tracing::error!("Configuración inválida: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let repo = match SqliteRepo::init(&config).await {
        Ok(repo) => repo,
        Err(e) => {
            tracing::error!("Error conectando a SQLite: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Error de base de datos: {}", e),
            ));
        }
    };

    repo.run_migrations()
        .await
        .log_error_context("applying migrations")
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    std::fs::create_dir_all(&config.upload_dir)?;

    let bind_address = config.bind_address.clone();
    let upload_dir = config.upload_dir.clone();

    tracing::info!("Servidor iniciando en {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(repo.clone()))
            .wrap(Logger::default())
            .configure(api::init_routes)
            .service(Files::new("/uploads", upload_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
