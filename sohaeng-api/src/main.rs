use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use chrono::{NaiveTime, Utc, Weekday};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod recs;
mod routes;
mod schema;
mod scheduler;
mod services;

use config::AppConfig;
use scheduler::{kst, Scheduler, WeeklySchedule};
use sohaeng_shared::clients::db::{create_pool, DbPool};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sohaeng_shared::middleware::init_tracing("sohaeng-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);
    let metrics_handle = sohaeng_shared::middleware::init_metrics();

    let state = Arc::new(AppState {
        db: db.clone(),
        config: config.clone(),
    });

    // Weekly batch fires Monday 10:00 KST. The admin re-run endpoint covers
    // manual triggers; both compute the week label at call time.
    let mut scheduler = Scheduler::new();
    if config.app_env != "test" {
        let job_pool = db.clone();
        scheduler.register(
            "weekly-recommendations",
            WeeklySchedule {
                weekday: Weekday::Mon,
                at: NaiveTime::from_hms_opt(10, 0, 0).expect("valid fire time"),
                offset: kst(),
            },
            move || {
                let week = recs::week_label_for(Utc::now().with_timezone(&kst()).date_naive());
                tracing::info!(week = %week, "starting weekly recommendation job");
                let summary = recs::build_weekly_recommendations(job_pool.clone(), &week);
                tracing::info!(
                    week = %summary.week,
                    users_processed = summary.users_processed,
                    recommendations_created = summary.recommendations_created,
                    errors = summary.errors.len(),
                    "weekly recommendation job finished"
                );
            },
        );
        scheduler.start();
    }

    let app = Router::new()
        .route("/healthz", get(routes::health::health_check))
        .route("/metrics", get(move || async move { metrics_handle.render() }))
        .route("/api/v1/auth/sync-kakao", post(routes::auth::sync_kakao))
        .route("/api/v1/auth/me", get(routes::auth::me))
        .route("/api/v1/profile", put(routes::profile::update_profile))
        .route("/api/v1/preferences", put(routes::profile::update_preferences))
        .route("/api/v1/recommendations", get(routes::recs::list_recommendations))
        .route("/api/v1/likes", post(routes::likes::send_like))
        .route("/api/v1/matches", get(routes::matches::list_matches))
        .route("/api/v1/matches/:id", get(routes::matches::get_match_detail))
        .route("/api/v1/payments/intent", post(routes::payments::create_payment_intent))
        .route("/api/v1/payments/:id", get(routes::payments::get_payment))
        .route("/api/v1/admin/users", get(routes::admin::list_users))
        .route("/api/v1/admin/matches", get(routes::admin::list_matches))
        .route("/api/v1/admin/payments", get(routes::admin::list_payments))
        .route("/api/v1/admin/payments/:id/verify", post(routes::admin::verify_payment))
        .route("/api/v1/admin/matches/:id/activate", post(routes::admin::activate_match))
        .route("/api/v1/admin/recs/run", post(routes::admin::run_recommendations))
        .route("/api/v1/admin/actions", get(routes::admin::get_audit_log))
        .layer(axum::middleware::from_fn(sohaeng_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "sohaeng-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
