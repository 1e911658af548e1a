pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod validation;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::gateway::PaymentsClient;
use crate::services::SesionService;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub payments: PaymentsClient,
    pub sesiones: SesionService,
    pub config: Config,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::pagos::initiate_payment,
        handlers::pagos::payment_status,
        handlers::pagos::mis_transacciones,
    ),
    components(schemas(handlers::pagos::InitiatePaymentBody)),
    tags((name = "Pagos", description = "Flujo de pagos sobre wallet pointers"))
)]
pub struct ApiDoc;

pub fn cors_layer(config: &Config) -> CorsLayer {
    match config
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::landing))
        .route("/static/admin/", get(handlers::api_status))
        .route("/signup", get(handlers::auth::signup_page).post(handlers::auth::signup))
        .route("/login", get(handlers::auth::login_page).post(handlers::auth::login))
        .route("/logout", get(handlers::auth::logout))
        .route("/dashboard", get(handlers::auth::dashboard))
        .route(
            "/crear-sala",
            get(handlers::salas::crear_sala_page).post(handlers::salas::crear_sala),
        )
        .route("/compartir-sala", get(handlers::salas::compartir_sala))
        .route("/sala/:codigo", get(handlers::salas::sala_detalle))
        .route("/sala/:codigo/unirse", post(handlers::salas::unirse))
        .route("/sala/:codigo/salir", post(handlers::salas::salir))
        .route("/sala/:codigo/desactivar", post(handlers::salas::desactivar))
        .route("/unirse-por-codigo", post(handlers::salas::unirse_por_codigo))
        .route("/mis-salas", get(handlers::salas::mis_salas))
        .route("/initiate-payment", post(handlers::pagos::initiate_payment))
        .route(
            "/payment-callback/:transaction_id",
            get(handlers::pagos::payment_callback),
        )
        .route(
            "/payment-status/:transaction_id",
            get(handlers::pagos::payment_status),
        )
        .route("/mis-transacciones", get(handlers::pagos::mis_transacciones))
        .route(
            "/payments-service/health",
            get(handlers::pagos::payments_service_health),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(cors)
        .with_state(state)
}
