use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use sohaeng_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db_status = match state.db.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Degraded,
        },
        Err(_) => HealthStatus::Degraded,
    };

    let response = HealthResponse::healthy("sohaeng-api", env!("CARGO_PKG_VERSION")).with_checks(vec![
        HealthCheck {
            name: "database".into(),
            status: db_status,
            message: None,
        },
    ]);

    Json(response)
}
