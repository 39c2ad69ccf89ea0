use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, Response},
};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::Span;
use uuid::Uuid;

use crate::{
    backend::{supabase::SupabaseClient, Backend},
    config::{AppConfig, Args},
    middlewares::mw_rate_limit::RateLimiter,
    services::cleanup_service::CleanupService,
};

pub use self::error::{Error, Result};

mod auth;
mod backend;
mod config;
mod controllers;
mod error;
mod helpers;
mod middlewares;
mod models;
mod routes;
mod services;
mod validators;
mod views;

#[derive(Clone)]
struct AppState {
    /// Anon-key client, subject to row-level security.
    backend: Arc<dyn Backend>,
    /// Service-role client for privileged writes.
    admin: Arc<dyn Backend>,
    config: Arc<AppConfig>,
    rate_limiter: RateLimiter,
}

impl AppState {
    fn new(backend: Arc<dyn Backend>, admin: Arc<dyn Backend>, config: AppConfig) -> Self {
        Self {
            backend,
            admin,
            config: Arc::new(config),
            rate_limiter: RateLimiter::new(),
        }
    }

    #[cfg(test)]
    fn for_tests(memory: Arc<backend::memory::MemoryBackend>) -> Self {
        Self::new(memory.clone(), memory, AppConfig::for_tests())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let config = AppConfig::from_args(&args);

    tracing::info!("Starting music sharing app...");
    tracing::debug!("Config: {:?}", config);

    let backend: Arc<dyn Backend> =
        Arc::new(SupabaseClient::new(&args.supabase_url, &args.supabase_key)?);
    let admin: Arc<dyn Backend> = Arc::new(SupabaseClient::new(
        &args.supabase_url,
        &args.supabase_service_key,
    )?);

    if args.sweep_orphans {
        let report = CleanupService::sweep_orphans(
            admin.as_ref(),
            &config.upload,
            config.cleanup.grace_secs,
            chrono::Utc::now(),
        )
        .await?;
        tracing::info!("Orphan sweep finished: {:?}", report);
        return Ok(());
    }

    let _sweeper =
        CleanupService::spawn_scheduled(admin.clone(), config.upload.clone(), config.cleanup.clone());

    let addr: SocketAddr = config
        .addr()
        .parse()
        .map_err(|_| Error::EnvVarError(format!("invalid bind address {}", config.addr())))?;

    let app_state = AppState::new(backend, admin, config);

    let routes_all = routes::create_router(app_state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<Body>| {
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            })
            .on_request(|request: &Request<Body>, _span: &Span| {
                tracing::info!("{} {}", request.method(), request.uri().path());
            })
            .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
                let status = response.status();
                let latency_ms = latency.as_millis();

                match status.as_u16() {
                    200..=399 => tracing::info!("{} ({}ms)", status, latency_ms),
                    400..=499 => tracing::warn!("{} ({}ms)", status, latency_ms),
                    500..=599 => tracing::error!("{} ({}ms)", status, latency_ms),
                    _ => tracing::info!("{} ({}ms)", status, latency_ms),
                }
            }),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        routes_all.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "music_share_rust=debug,tower_http=info,info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}
