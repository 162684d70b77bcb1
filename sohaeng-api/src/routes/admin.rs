use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use sohaeng_shared::errors::{AppError, AppResult, ErrorCode};
use sohaeng_shared::middleware::AdminUser;
use sohaeng_shared::types::api::ApiResponse;
use sohaeng_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{AdminAction, Match, NewAdminAction, Payment, Profile, User};
use crate::recs;
use crate::scheduler::kst;
use crate::schema::{admin_actions, matches, payments, profiles, users};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct UserFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<String>, // "verified" or "pending"
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

fn page_params(page: u64, per_page: u64) -> PaginationParams {
    PaginationParams { page, per_page }
}

#[derive(Debug, Serialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: User,
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize)]
pub struct AdminMatchView {
    #[serde(flatten)]
    pub match_info: Match,
    pub user_a_profile: Option<Profile>,
    pub user_b_profile: Option<Profile>,
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize)]
pub struct AdminPaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    #[serde(rename = "match")]
    pub match_info: Match,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ActivateMatchResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct RunRecsResponse {
    pub ok: bool,
    pub week: String,
    pub result: recs::RunSummary,
}

// --- List users (paginated, optional nickname search) ---

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<UserFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<AdminUserView>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let pagination = page_params(params.page, params.per_page);
    let offset = pagination.offset() as i64;
    let limit = pagination.limit() as i64;

    let (rows, total): (Vec<(User, Option<Profile>)>, i64) = if let Some(ref query) = params.query {
        let pattern = format!("%{query}%");

        let rows = users::table
            .left_join(profiles::table)
            .filter(profiles::nickname.ilike(pattern.clone()))
            .order(users::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load::<(User, Option<Profile>)>(&mut conn)
            .map_err(|e| AppError::internal(format!("db error: {e}")))?;

        let total: i64 = users::table
            .left_join(profiles::table)
            .filter(profiles::nickname.ilike(pattern))
            .count()
            .get_result(&mut conn)
            .map_err(|e| AppError::internal(format!("db error: {e}")))?;

        (rows, total)
    } else {
        let rows = users::table
            .left_join(profiles::table)
            .order(users::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load::<(User, Option<Profile>)>(&mut conn)
            .map_err(|e| AppError::internal(format!("db error: {e}")))?;

        let total: i64 = users::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| AppError::internal(format!("db error: {e}")))?;

        (rows, total)
    };

    let items = rows
        .into_iter()
        .map(|(user, profile)| AdminUserView { user, profile })
        .collect();

    let paginated = Paginated::new(items, total as u64, &pagination);
    Ok(Json(ApiResponse::ok(paginated)))
}

// --- List matches (paginated, optional status filter) ---

pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<MatchFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<AdminMatchView>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let pagination = page_params(params.page, params.per_page);
    let offset = pagination.offset() as i64;
    let limit = pagination.limit() as i64;

    let (rows, total): (Vec<Match>, i64) = if let Some(ref status) = params.status {
        let rows = matches::table
            .filter(matches::status.eq(status))
            .order(matches::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load::<Match>(&mut conn)
            .map_err(|e| AppError::internal(format!("db error: {e}")))?;

        let total: i64 = matches::table
            .filter(matches::status.eq(status))
            .count()
            .get_result(&mut conn)
            .map_err(|e| AppError::internal(format!("db error: {e}")))?;

        (rows, total)
    } else {
        let rows = matches::table
            .order(matches::created_at.desc())
            .offset(offset)
            .limit(limit)
            .load::<Match>(&mut conn)
            .map_err(|e| AppError::internal(format!("db error: {e}")))?;

        let total: i64 = matches::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| AppError::internal(format!("db error: {e}")))?;

        (rows, total)
    };

    // Profiles and payments resolved in one batch each rather than per row.
    let match_ids: Vec<Uuid> = rows.iter().map(|m| m.id).collect();
    let mut user_ids: Vec<Uuid> = rows.iter().flat_map(|m| [m.user_a, m.user_b]).collect();
    user_ids.sort();
    user_ids.dedup();

    let profiles_by_user: HashMap<Uuid, Profile> = profiles::table
        .filter(profiles::user_id.eq_any(&user_ids))
        .load::<Profile>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?
        .into_iter()
        .map(|p| (p.user_id, p))
        .collect();

    let payments_by_match: HashMap<Uuid, Payment> = payments::table
        .filter(payments::match_id.eq_any(&match_ids))
        .load::<Payment>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?
        .into_iter()
        .map(|p| (p.match_id, p))
        .collect();

    let items = rows
        .into_iter()
        .map(|m| AdminMatchView {
            user_a_profile: profiles_by_user.get(&m.user_a).cloned(),
            user_b_profile: profiles_by_user.get(&m.user_b).cloned(),
            payment: payments_by_match.get(&m.id).cloned(),
            match_info: m,
        })
        .collect();

    let paginated = Paginated::new(items, total as u64, &pagination);
    Ok(Json(ApiResponse::ok(paginated)))
}

// --- List payments (paginated, optional verified/pending filter) ---

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<PaymentFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<AdminPaymentView>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let pagination = page_params(params.page, params.per_page);
    let offset = pagination.offset() as i64;
    let limit = pagination.limit() as i64;

    let (rows, total): (Vec<Payment>, i64) = match params.status.as_deref() {
        Some("verified") => {
            let rows = payments::table
                .filter(payments::verified_at.is_not_null())
                .order(payments::id.desc())
                .offset(offset)
                .limit(limit)
                .load::<Payment>(&mut conn)
                .map_err(|e| AppError::internal(format!("db error: {e}")))?;
            let total: i64 = payments::table
                .filter(payments::verified_at.is_not_null())
                .count()
                .get_result(&mut conn)
                .map_err(|e| AppError::internal(format!("db error: {e}")))?;
            (rows, total)
        }
        Some("pending") => {
            let rows = payments::table
                .filter(payments::verified_at.is_null())
                .order(payments::id.desc())
                .offset(offset)
                .limit(limit)
                .load::<Payment>(&mut conn)
                .map_err(|e| AppError::internal(format!("db error: {e}")))?;
            let total: i64 = payments::table
                .filter(payments::verified_at.is_null())
                .count()
                .get_result(&mut conn)
                .map_err(|e| AppError::internal(format!("db error: {e}")))?;
            (rows, total)
        }
        _ => {
            let rows = payments::table
                .order(payments::id.desc())
                .offset(offset)
                .limit(limit)
                .load::<Payment>(&mut conn)
                .map_err(|e| AppError::internal(format!("db error: {e}")))?;
            let total: i64 = payments::table
                .count()
                .get_result(&mut conn)
                .map_err(|e| AppError::internal(format!("db error: {e}")))?;
            (rows, total)
        }
    };

    let match_ids: Vec<Uuid> = rows.iter().map(|p| p.match_id).collect();
    let matches_by_id: HashMap<Uuid, Match> = matches::table
        .filter(matches::id.eq_any(&match_ids))
        .load::<Match>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let items = rows
        .into_iter()
        .filter_map(|payment| {
            matches_by_id.get(&payment.match_id).map(|m| AdminPaymentView {
                payment,
                match_info: m.clone(),
            })
        })
        .collect();

    let paginated = Paginated::new(items, total as u64, &pagination);
    Ok(Json(ApiResponse::ok(paginated)))
}

// --- Verify payment ---

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<VerifyPaymentResponse>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let payment: Payment = diesel::update(payments::table.find(payment_id))
        .set(payments::verified_at.eq(Utc::now()))
        .get_result(&mut conn)
        .optional()
        .map_err(|e| AppError::internal(format!("failed to verify payment: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound, "payment not found"))?;

    log_admin_action(
        &mut conn,
        admin.0.id,
        "verify_payment",
        Some(payment_id.to_string()),
        Some(serde_json::json!({
            "payment_id": payment_id,
            "amount": payment.amount,
        })),
    )?;

    Ok(Json(ApiResponse::ok(VerifyPaymentResponse { ok: true })))
}

// --- Activate match ---

pub async fn activate_match(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ActivateMatchResponse>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let updated: Option<Match> = diesel::update(matches::table.find(match_id))
        .set(matches::status.eq("active"))
        .get_result(&mut conn)
        .optional()
        .map_err(|e| AppError::internal(format!("failed to activate match: {e}")))?;

    if updated.is_none() {
        return Err(AppError::new(ErrorCode::MatchNotFound, "match not found"));
    }

    log_admin_action(
        &mut conn,
        admin.0.id,
        "activate_match",
        Some(match_id.to_string()),
        Some(serde_json::json!({
            "match_id": match_id,
            "status": "active",
        })),
    )?;

    Ok(Json(ApiResponse::ok(ActivateMatchResponse { ok: true })))
}

// --- Manually trigger a recommendation batch ---

pub async fn run_recommendations(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<RunRecsResponse>>> {
    let week = recs::week_label_for(Utc::now().with_timezone(&kst()).date_naive());

    tracing::info!(week = %week, admin_id = %admin.0.id, "manual recommendation run requested");

    let pool = state.db.clone();
    let week_for_job = week.clone();
    let summary = tokio::task::spawn_blocking(move || {
        recs::build_weekly_recommendations(pool, &week_for_job)
    })
    .await
    .map_err(|e| AppError::internal(format!("recommendation run panicked: {e}")))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    log_admin_action(
        &mut conn,
        admin.0.id,
        "run_recommendations",
        Some(week.clone()),
        serde_json::to_value(&summary).ok(),
    )?;

    Ok(Json(ApiResponse::ok(RunRecsResponse {
        ok: true,
        week,
        result: summary,
    })))
}

// --- Audit log (paginated admin actions) ---

pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<AdminAction>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let offset = params.offset() as i64;
    let limit = params.limit() as i64;

    let items = admin_actions::table
        .order(admin_actions::created_at.desc())
        .offset(offset)
        .limit(limit)
        .load::<AdminAction>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    let total: i64 = admin_actions::table
        .count()
        .get_result(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    let paginated = Paginated::new(items, total as u64, &params);
    Ok(Json(ApiResponse::ok(paginated)))
}

// --- Helper: append to the audit log ---

fn log_admin_action(
    conn: &mut PgConnection,
    admin_id: Uuid,
    action: &str,
    target_id: Option<String>,
    detail: Option<serde_json::Value>,
) -> AppResult<()> {
    let entry = NewAdminAction {
        admin_id,
        action: action.to_string(),
        target_id,
        detail,
    };

    diesel::insert_into(admin_actions::table)
        .values(&entry)
        .execute(conn)
        .map_err(|e| AppError::internal(format!("failed to log admin action: {e}")))?;

    Ok(())
}
