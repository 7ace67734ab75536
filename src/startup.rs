use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{BcryptHasher, EmployeeAllowlist, PasswordHasher, TokenService};
use crate::configuration::{Settings, StorageBackend};
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::TokenGate;
use crate::routes::{health_check, list_users, login, refresh, register, revoke_token, whoami};
use crate::store::{
    CredentialStore, InMemoryCredentialStore, InMemoryRevocationStore, PgCredentialStore,
    PgRevocationStore, RevocationStore,
};

/// Shared, request-independent dependencies injected into every handler
pub struct AppState {
    pub credentials: Arc<dyn CredentialStore>,
    pub tokens: Arc<TokenService>,
    pub hasher: Arc<dyn PasswordHasher>,
}

impl AppState {
    /// Wire the token service and hasher around the given stores
    pub fn new(
        settings: &Settings,
        credentials: Arc<dyn CredentialStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        let policy = Arc::new(EmployeeAllowlist::new(settings.jwt.employees.clone()));
        let tokens = Arc::new(TokenService::new(&settings.jwt, revocations, policy));

        Self {
            credentials,
            tokens,
            hasher: Arc::new(BcryptHasher::new(settings.password.bcrypt_cost)),
        }
    }
}

/// Build stores for the configured backend and purge stale blocklist entries
pub async fn build_state(settings: &Settings) -> Result<AppState, AppError> {
    let (credentials, revocations): (Arc<dyn CredentialStore>, Arc<dyn RevocationStore>) =
        match settings.database.backend {
            StorageBackend::Postgres => {
                tracing::info!("Attempting to connect to database");
                let pool = PgPoolOptions::new()
                    .max_connections(settings.database.max_connections)
                    .connect(&settings.database.connection_string())
                    .await?;

                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
                tracing::info!("Database connection pool created and migrated");

                (
                    Arc::new(PgCredentialStore::new(pool.clone())),
                    Arc::new(PgRevocationStore::new(pool)),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory stores; data is lost on restart");
                (
                    Arc::new(InMemoryCredentialStore::new()),
                    Arc::new(InMemoryRevocationStore::new()),
                )
            }
        };

    let state = AppState::new(settings, credentials, revocations);
    state.tokens.purge_revocations().await?;

    Ok(state)
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let tokens = state.tokens.clone();
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                AppError::from(ValidationError::InvalidBody(err.to_string())).into()
            }))

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .service(
                        web::resource("/whoami")
                            .wrap(TokenGate::access(tokens.clone()))
                            .route(web::get().to(whoami)),
                    )
                    .service(
                        web::resource("/refresh")
                            .wrap(TokenGate::refresh(tokens.clone()))
                            .route(web::get().to(refresh)),
                    )
                    .service(
                        web::resource("/revoke_token")
                            .wrap(TokenGate::any_type(tokens.clone()))
                            .route(web::get().to(revoke_token)),
                    ),
            )
            .service(
                web::scope("/users").service(
                    web::resource("/all")
                        .wrap(TokenGate::access(tokens.clone()))
                        .route(web::get().to(list_users)),
                ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
