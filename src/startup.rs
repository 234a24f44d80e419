use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::auth::{AuthService, CredentialHasher};
use crate::configuration::{Settings, StoreBackend};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_user, health, health_check, login, logout, refresh, register};
use crate::store::{AccountStore, InMemoryAccountStore, PgAccountStore};

/// Build the account store selected by configuration
pub async fn build_store(configuration: &Settings) -> Result<Arc<dyn AccountStore>, std::io::Error> {
    match configuration.session.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory account store; accounts are lost on restart");
            Ok(Arc::new(InMemoryAccountStore::new()))
        }
        StoreBackend::Postgres => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(std::time::Duration::from_secs(2))
                .connect(&configuration.database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database connection error")
                })?;

            sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                std::io::Error::new(std::io::ErrorKind::Other, "Database migration error")
            })?;

            tracing::info!("Database connection pool created successfully");
            Ok(Arc::new(PgAccountStore::new(pool)))
        }
    }
}

/// Build the auth service from configuration and a store
pub fn build_auth_service(configuration: &Settings, store: Arc<dyn AccountStore>) -> AuthService {
    AuthService::new(
        store,
        configuration.jwt.clone(),
        CredentialHasher::new(configuration.session.hash_cost),
    )
}

pub fn run(
    listener: TcpListener,
    auth: AuthService,
    strict_epoch_check: bool,
) -> Result<Server, std::io::Error> {
    let auth_data = web::Data::new(auth.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(auth_data.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/health", web::get().to(health))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))

            // Protected routes (require a bearer access token)
            .service(
                web::scope("/auth/logout")
                    .wrap(JwtMiddleware::new(auth.clone(), strict_epoch_check))
                    .route("", web::post().to(logout)),
            )
            .service(
                web::scope("/users")
                    .wrap(JwtMiddleware::new(auth.clone(), strict_epoch_check))
                    .route("/me", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
