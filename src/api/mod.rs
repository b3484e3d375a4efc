//! # Módulo API
//!
//! Este módulo contiene todas las rutas y controladores de la API REST.
//!
//! ## Módulos principales
//!
//! - [`security`] - Alta de usuarios y login
//! - [`account`] - Perfil del usuario autenticado
//! - [`restaurant`] - Restaurantes (uno por usuario)
//! - [`menu`], [`food`], [`category`] - Carta del restaurante
//! - [`picture`] - Imágenes de los restaurantes
//! - [`booking`] - Reservas
//! - [`errors`] - Manejo de errores de la aplicación

pub mod account;
pub mod booking;
pub mod category;
pub mod errors;
pub mod food;
pub mod menu;
pub mod middleware;
pub mod picture;
pub mod restaurant;
pub mod security;
pub mod validation;

// Re-exportar tipos comunes para facilitar su uso
pub use errors::{AppError, AppResult, ErrorResponse, ResultExt};

use actix_web::web;

/// Configuración del extractor JSON de registro y login: cualquier cuerpo ilegible es un `400`
///
/// El resto de handlers decodifica el cuerpo con [`validation::parse_body`].
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::InvalidJson(err.to_string()).into()
    })
}

/// Configura todas las rutas de la API
///
/// ## Rutas configuradas
///
/// - `/api/registration`, `/api/login` - Ver [`security::routes`]
/// - `/api/account/*` - Ver [`account::routes`]
/// - `/api/restaurant/*` - Ver [`restaurant::routes`]
/// - `/api/menu/*` - Ver [`menu::routes`]
/// - `/api/food/*` - Ver [`food::routes`]
/// - `/api/category/*` - Ver [`category::routes`]
/// - `/api/picture/*` - Ver [`picture::routes`]
/// - `/api/booking/*` - Ver [`booking::routes`]
///
/// # Ejemplo
///
/// ```no_run
/// use actix_web::{web, App};
/// use quai_antique::api;
///
/// let app = App::new()
///     .configure(api::init_routes);
/// ```
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());

    security::routes(cfg);
    account::routes(cfg);
    restaurant::routes(cfg);
    menu::routes(cfg);
    food::routes(cfg);
    category::routes(cfg);
    picture::routes(cfg);
    booking::routes(cfg);
}
