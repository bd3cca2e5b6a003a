use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};
use tutora_shared::middleware::AdminUser;
use tutora_shared::types::api::ApiResponse;
use tutora_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{PaymentTransaction, Teacher, TransactionType};
use crate::schema::payment_transactions;
use crate::services::ledger::{self, TeacherLedgerSummary};
use crate::services::lifecycle;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PayAllResponse {
    pub total_amount: f64,
    pub transaction_count: usize,
    pub teacher: Teacher,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub teacher_id: Uuid,
    pub adjustment_type: String, // "bonus", "deduction" or "manual_adjustment"
    pub amount: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdjustmentResponse {
    pub transaction: PaymentTransaction,
    pub teacher: Teacher,
}

#[derive(Debug, Deserialize)]
pub struct TransactionFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<String>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

// --- Pay single transaction ---

pub async fn pay_transaction(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(txn_id): Path<Uuid>,
    Json(body): Json<PayRequest>,
) -> AppResult<Json<ApiResponse<PaymentTransaction>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let txn = ledger::pay_transaction(
        &mut conn,
        txn_id,
        admin.0.id,
        &body.payment_method,
        body.notes.as_deref(),
    )?;

    publisher::publish_transaction_paid(
        &state.rabbitmq,
        txn.id,
        txn.teacher_id,
        txn.amount,
        admin.0.id,
    )
    .await;

    Ok(Json(ApiResponse::ok(txn)))
}

// --- Pay all pending transactions for a teacher ---

pub async fn pay_all(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(teacher_id): Path<Uuid>,
    Json(body): Json<PayRequest>,
) -> AppResult<Json<ApiResponse<PayAllResponse>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let (total_amount, transaction_count, teacher) = conn
        .transaction::<(f64, usize, Teacher), AppError, _>(|conn| {
            ledger::pay_all_for_teacher(
                conn,
                teacher_id,
                admin.0.id,
                &body.payment_method,
                body.notes.as_deref(),
            )
        })?;

    publisher::publish_teacher_settled(
        &state.rabbitmq,
        teacher.id,
        total_amount,
        transaction_count,
        admin.0.id,
    )
    .await;

    Ok(Json(ApiResponse::ok(PayAllResponse {
        total_amount,
        transaction_count,
        teacher,
    })))
}

// --- Manual adjustment ---

pub async fn create_adjustment(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(body): Json<AdjustmentRequest>,
) -> AppResult<Json<ApiResponse<AdjustmentResponse>>> {
    let adjustment_type: TransactionType = body
        .adjustment_type
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let (transaction, teacher) = conn
        .transaction::<(PaymentTransaction, Teacher), AppError, _>(|conn| {
            ledger::create_adjustment(
                conn,
                body.teacher_id,
                adjustment_type,
                body.amount,
                body.notes.as_deref(),
            )
        })?;

    Ok(Json(ApiResponse::ok(AdjustmentResponse { transaction, teacher })))
}

// --- List one teacher's ledger (paginated, optional status filter) ---

pub async fn list_teacher_transactions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(teacher_id): Path<Uuid>,
    Query(params): Query<TransactionFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<PaymentTransaction>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let teacher = lifecycle::load_teacher(&mut conn, teacher_id)?;

    let pagination = PaginationParams {
        page: params.page,
        per_page: params.per_page,
    };
    let offset = pagination.offset() as i64;
    let limit = pagination.limit() as i64;

    let mut query = payment_transactions::table
        .filter(payment_transactions::teacher_id.eq(teacher.id))
        .into_boxed();
    let mut count_query = payment_transactions::table
        .filter(payment_transactions::teacher_id.eq(teacher.id))
        .count()
        .into_boxed();

    if let Some(ref status) = params.status {
        query = query.filter(payment_transactions::status.eq(status.clone()));
        count_query = count_query.filter(payment_transactions::status.eq(status.clone()));
    }

    let items = query
        .order(payment_transactions::created_at.desc())
        .offset(offset)
        .limit(limit)
        .load::<PaymentTransaction>(&mut conn)?;

    let total: i64 = count_query.get_result(&mut conn)?;

    let paginated = Paginated::new(items, total as u64, &pagination);
    Ok(Json(ApiResponse::ok(paginated)))
}

// --- Per-teacher ledger summary ---

pub async fn ledger_summary(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<Json<ApiResponse<Vec<TeacherLedgerSummary>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let summaries = ledger::ledger_summary(&mut conn)?;
    Ok(Json(ApiResponse::ok(summaries)))
}
