use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::get,
    Router,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::{AppConfig, ConfigError, JwtConfig, OtpConfig, Settings};
use crate::handler::auth_handler::AuthHandlerState;
use crate::middlewares::auth_middleware::AuthState;
use crate::repository::account_repo::{AccountRepository, AccountRepositoryImpl};
use crate::repository::book_repo::{BookRepository, BookRepositoryImpl};
use crate::repository::category_repo::{CategoryRepository, CategoryRepositoryImpl};
use crate::repository::mongo;
use crate::repository::repository_error::RepositoryError;
use crate::router::{book_router::book_router, category_router::category_router, user_router::user_router};
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::service::book_service::BookServiceImpl;
use crate::service::category_service::CategoryServiceImpl;
use crate::util::email::{EmailError, Mailer, SmtpEmailService};
use crate::util::jwt::JwtTokenUtilsImpl;
use crate::util::minio::{MinioError, MinioService, ObjectStorage};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Object storage error: {0}")]
    Storage(#[from] MinioError),
    #[error("Email error: {0}")]
    Email(#[from] EmailError),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Collaborators the services are built from. Production wires Mongo, SMTP and
/// MinIO in; tests pass in-memory doubles.
pub struct Infrastructure {
    pub accounts: Arc<dyn AccountRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub books: Arc<dyn BookRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn ObjectStorage>,
}

#[derive(Clone)]
pub struct Services {
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
    pub auth_service: Arc<AuthServiceImpl>,
    pub category_service: Arc<CategoryServiceImpl>,
    pub book_service: Arc<BookServiceImpl>,
}

impl Services {
    pub fn assemble(infra: Infrastructure, jwt_config: JwtConfig, otp_config: OtpConfig) -> Result<Self, AppError> {
        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(jwt_config));
        let auth_service = Arc::new(AuthServiceImpl::new(
            infra.accounts.clone(),
            jwt_utils.clone(),
            infra.mailer,
            infra.storage.clone(),
            otp_config,
        )?);
        let category_service = Arc::new(CategoryServiceImpl::new(infra.categories.clone()));
        let book_service = Arc::new(BookServiceImpl::new(
            infra.books,
            infra.categories,
            infra.accounts,
            infra.storage,
        ));

        Ok(Services {
            jwt_utils,
            auth_service,
            category_service,
            book_service,
        })
    }
}

pub fn build_router(config: &AppConfig, services: &Services) -> Router {
    let auth_state = Arc::new(AuthState {
        jwt_utils: services.jwt_utils.clone(),
        auth_service: services.auth_service.clone(),
    });
    let handler_state = Arc::new(AuthHandlerState {
        auth_service: services.auth_service.clone(),
        cookie_secure: config.cookie_secure,
    });

    let api = Router::new()
        .merge(user_router(handler_state, auth_state.clone()))
        .merge(category_router(services.category_service.clone(), auth_state.clone()))
        .merge(book_router(services.book_service.clone(), auth_state));

    let mut cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);
    // A literal `*` cannot be sent alongside credentials; echo the caller's origin instead.
    if config.cors_origin.trim() == "*" {
        cors = cors.allow_origin(AllowOrigin::mirror_request());
    } else {
        match config.cors_origin.parse::<HeaderValue>() {
            Ok(origin) => cors = cors.allow_origin(origin),
            Err(e) => warn!("Ignoring invalid CORS_ORIGIN {}: {}", config.cors_origin, e),
        }
    }

    Router::new()
        .nest(&config.api_prefix, api)
        .route("/health", get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CookieManagerLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub struct App {
    config: AppConfig,
    router: Router,
}

impl App {
    pub async fn new() -> Result<Self, AppError> {
        let settings = Settings::from_env()?;

        let db = mongo::connect(&settings.mongo).await?;
        mongo::ensure_indexes(&db).await?;

        let infra = Infrastructure {
            accounts: Arc::new(AccountRepositoryImpl::new(&db)),
            categories: Arc::new(CategoryRepositoryImpl::new(&db)),
            books: Arc::new(BookRepositoryImpl::new(&db)),
            mailer: Arc::new(SmtpEmailService::new(settings.email.clone())?),
            storage: Arc::new(MinioService::new(settings.minio.clone()).await?),
        };
        let services = Services::assemble(infra, settings.jwt.clone(), settings.otp.clone())?;

        if let Some(admin) = &settings.admin {
            match services.auth_service.ensure_admin(admin).await {
                Ok(true) => info!("Seed admin account created"),
                Ok(false) => {}
                Err(e) => error!("Failed to seed admin account: {}", e),
            }
        }

        let router = build_router(&settings.app, &services);
        Ok(App {
            config: settings.app,
            router,
        })
    }

    pub async fn start(self) -> Result<(), AppError> {
        let host = self
            .config
            .host
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidValue(format!("APP_HOST: {}", e)))?;
        let addr = SocketAddr::new(host, self.config.port);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Server running at http://{}{}", addr, self.config.api_prefix);
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}
