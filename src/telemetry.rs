//! Inicialización del sistema de logging con tracing

use tracing_subscriber::EnvFilter;

/// Filtro por defecto si `RUST_LOG` no está definida
pub const DEFAULT_LOG_FILTER: &str = "quai_antique=debug,load_fixtures=debug,sqlx=warn,actix_web=info";

/// Instala el subscriber `fmt` global; `RUST_LOG` tiene prioridad
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
