pub mod announce;
pub mod auth;
pub mod cache;
pub mod dates;
pub mod error;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod options;
pub mod schedule;
pub mod scraper;
pub mod settings;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use handlers::{
    get_announcements, get_group_options, get_group_schedule, get_teacher_options,
    get_teacher_schedule, healthz_live, healthz_ready, root,
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::cache::{Cache, CacheError, MemoryCache, NoCache, RedisCache};
use crate::openapi::ApiDoc;
use crate::scraper::HmtpkScraper;
use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub scraper: HmtpkScraper,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, CacheError> {
        let cache: Arc<dyn Cache> = match (settings.cache_enabled, &settings.redis_url) {
            (false, _) => Arc::new(NoCache),
            (true, Some(url)) => Arc::new(RedisCache::new(url)?),
            (true, None) => Arc::new(MemoryCache::new()),
        };
        let scraper = HmtpkScraper::new(settings.base_url.clone(), cache, settings.cache_ttl());
        Ok(Self { settings, scraper })
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState::new(settings)?;
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!(
        upstream = %state.settings.base_url,
        cache = state.settings.cache_enabled,
        redis = state.settings.redis_url.is_some(),
        "Starting HMTPK Schedule API on {addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/schedule/group", get(get_group_schedule))
        .route("/schedule/teacher", get(get_teacher_schedule))
        .route("/options/groups", get(get_group_options))
        .route("/options/teachers", get(get_teacher_options))
        .route("/announcements", get(get_announcements))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer)
}
