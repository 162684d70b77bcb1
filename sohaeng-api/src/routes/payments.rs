use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use sohaeng_shared::errors::{AppError, AppResult, ErrorCode};
use sohaeng_shared::types::auth::AuthUser;
use sohaeng_shared::types::ApiResponse;

use crate::models::{Match, NewPayment, Payment};
use crate::schema::{matches, payments};
use crate::AppState;

/// Flat introduction fee, in KRW.
const DEFAULT_AMOUNT_KRW: i32 = 10_000;

/// Transfer code the depositor writes into the bank memo field, e.g.
/// `SH-9f3a-102`. The user-id suffix lets an admin pair a deposit with a
/// match even when the random digits collide.
fn generate_payment_code(user_id: Uuid) -> String {
    let id = user_id.simple().to_string();
    let suffix = &id[id.len() - 4..];
    let digits: u32 = rand::thread_rng().gen_range(0..1000);
    format!("SH-{suffix}-{digits:03}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub match_id: Uuid,
}

/// POST /payments/intent - create (or return) the transfer payment for a
/// pending match. One payment per match; racing callers both get the same
/// row back.
pub async fn create_payment_intent(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PaymentIntentRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let record = matches::table
        .find(req.match_id)
        .first::<Match>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    if !record.involves(user.id) {
        return Err(AppError::new(ErrorCode::NotMatchParticipant, "access denied"));
    }

    if record.status != "pending" {
        return Err(AppError::new(
            ErrorCode::MatchNotPending,
            "payment can only be created for pending matches",
        ));
    }

    let existing = payments::table
        .filter(payments::match_id.eq(req.match_id))
        .first::<Payment>(&mut conn)
        .optional()?;
    if let Some(payment) = existing {
        return Ok(Json(ApiResponse::ok(payment)));
    }

    let new_payment = NewPayment {
        id: Uuid::new_v4(),
        match_id: req.match_id,
        method: "transfer".into(),
        amount: DEFAULT_AMOUNT_KRW,
        code: generate_payment_code(record.user_a),
    };

    let payment = match diesel::insert_into(payments::table)
        .values(&new_payment)
        .get_result::<Payment>(&mut conn)
    {
        Ok(payment) => payment,
        // The other participant created it first; return theirs.
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            payments::table
                .filter(payments::match_id.eq(req.match_id))
                .first::<Payment>(&mut conn)?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(ApiResponse::ok(payment)))
}

/// GET /payments/:id - participant-only payment lookup.
pub async fn get_payment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let payment = payments::table
        .find(payment_id)
        .first::<Payment>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound, "payment not found"))?;

    let record = matches::table
        .find(payment.match_id)
        .first::<Match>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    if !record.involves(user.id) {
        return Err(AppError::new(ErrorCode::NotMatchParticipant, "access denied"));
    }

    Ok(Json(ApiResponse::ok(payment)))
}
