//! Carga los datos de demostración en la base de datos de `DATABASE_URL`
//!
//! ```bash
//! cargo run --bin load_fixtures
//! ```
//!
//! Los usuarios creados son `email.{i}@studi.fr` con contraseña `password{i}`.

use quai_antique::api::middleware::ErrorLogExt;
use quai_antique::config::Config;
use quai_antique::db::{fixtures, SqliteRepo};
use quai_antique::telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let result = async {
        let repo = SqliteRepo::init(&config).await?;
        repo.run_migrations().await?;
        fixtures::load(&repo).await
    }
    .await
    .log_error_context("loading fixtures");

    match result {
        Ok(summary) => {
            tracing::info!(
                users = summary.users,
                restaurants = summary.restaurants,
                bookings = summary.bookings,
                "Datos de demostración cargados"
            );
            Ok(())
        }
        Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
    }
}
