use std::collections::BTreeMap;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewPaymentTransaction, PaymentTransaction, Teacher, TransactionStatus, TransactionType};
use crate::schema::{payment_transactions, teachers};
use crate::services::lifecycle;

pub fn load_transaction(conn: &mut PgConnection, txn_id: Uuid) -> AppResult<PaymentTransaction> {
    payment_transactions::table
        .find(txn_id)
        .first::<PaymentTransaction>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::TransactionNotFound, "transaction not found"))
}

/// Marks one pending ledger entry paid.
pub fn pay_transaction(
    conn: &mut PgConnection,
    txn_id: Uuid,
    admin_id: Uuid,
    payment_method: &str,
    notes: Option<&str>,
) -> AppResult<PaymentTransaction> {
    let txn = load_transaction(conn, txn_id)?;
    let current: TransactionStatus = txn.status.parse().map_err(AppError::internal)?;

    match current {
        TransactionStatus::Paid => {
            return Err(AppError::state_conflict(
                ErrorCode::TransactionAlreadyPaid,
                "this transaction has already been paid",
                current.as_str(),
            ));
        }
        TransactionStatus::Cancelled => {
            return Err(AppError::state_conflict(
                ErrorCode::BadRequest,
                "a cancelled transaction cannot be paid",
                current.as_str(),
            ));
        }
        TransactionStatus::Pending => {}
    }

    let now = Utc::now();

    let updated: PaymentTransaction = match notes {
        Some(notes) => diesel::update(payment_transactions::table.find(txn.id))
            .set((
                payment_transactions::status.eq(TransactionStatus::Paid.as_str()),
                payment_transactions::paid_at.eq(now),
                payment_transactions::paid_by.eq(admin_id),
                payment_transactions::payment_method.eq(payment_method),
                payment_transactions::notes.eq(notes),
            ))
            .get_result(conn)?,
        None => diesel::update(payment_transactions::table.find(txn.id))
            .set((
                payment_transactions::status.eq(TransactionStatus::Paid.as_str()),
                payment_transactions::paid_at.eq(now),
                payment_transactions::paid_by.eq(admin_id),
                payment_transactions::payment_method.eq(payment_method),
            ))
            .get_result(conn)?,
    };

    tracing::info!(
        transaction_id = %updated.id,
        teacher_id = %updated.teacher_id,
        amount = updated.amount,
        "transaction paid"
    );

    Ok(updated)
}

/// Settles a teacher: every pending ledger entry becomes paid and the
/// running counters reset to zero. Run inside one transaction by the
/// caller; precondition is at least one pending entry.
pub fn pay_all_for_teacher(
    conn: &mut PgConnection,
    teacher_id: Uuid,
    admin_id: Uuid,
    payment_method: &str,
    notes: Option<&str>,
) -> AppResult<(f64, usize, Teacher)> {
    let teacher = lifecycle::load_teacher(conn, teacher_id)?;

    let pending: Vec<PaymentTransaction> = payment_transactions::table
        .filter(payment_transactions::teacher_id.eq(teacher.id))
        .filter(payment_transactions::status.eq(TransactionStatus::Pending.as_str()))
        .load::<PaymentTransaction>(conn)?;

    if pending.is_empty() {
        return Err(AppError::new(
            ErrorCode::NoPendingTransactions,
            "this teacher has no pending transactions",
        ));
    }

    let total_amount: f64 = pending.iter().map(|t| t.amount).sum();
    let now = Utc::now();

    let filter = payment_transactions::table
        .filter(payment_transactions::teacher_id.eq(teacher.id))
        .filter(payment_transactions::status.eq(TransactionStatus::Pending.as_str()));

    match notes {
        Some(notes) => {
            diesel::update(filter)
                .set((
                    payment_transactions::status.eq(TransactionStatus::Paid.as_str()),
                    payment_transactions::paid_at.eq(now),
                    payment_transactions::paid_by.eq(admin_id),
                    payment_transactions::payment_method.eq(payment_method),
                    payment_transactions::notes.eq(notes),
                ))
                .execute(conn)?;
        }
        None => {
            diesel::update(filter)
                .set((
                    payment_transactions::status.eq(TransactionStatus::Paid.as_str()),
                    payment_transactions::paid_at.eq(now),
                    payment_transactions::paid_by.eq(admin_id),
                    payment_transactions::payment_method.eq(payment_method),
                ))
                .execute(conn)?;
        }
    }

    let updated_teacher: Teacher = diesel::update(teachers::table.find(teacher.id))
        .set((
            teachers::earned.eq(0.0),
            teachers::lessons_completed.eq(0),
        ))
        .get_result(conn)?;

    tracing::info!(
        teacher_id = %teacher.id,
        total_amount = total_amount,
        transaction_count = pending.len(),
        "teacher settled"
    );

    Ok((total_amount, pending.len(), updated_teacher))
}

/// Manual ledger adjustment with no backing booking. Bonuses and generic
/// adjustments credit `earned` immediately; deductions debit it, clamped
/// at zero.
pub fn create_adjustment(
    conn: &mut PgConnection,
    teacher_id: Uuid,
    adjustment_type: TransactionType,
    amount: f64,
    notes: Option<&str>,
) -> AppResult<(PaymentTransaction, Teacher)> {
    if adjustment_type == TransactionType::ClassCompletion {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "adjustment type must be 'bonus', 'deduction' or 'manual_adjustment'",
        ));
    }
    if amount <= 0.0 {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "adjustment amount must be positive",
        ));
    }

    let teacher = lifecycle::load_teacher(conn, teacher_id)?;

    let (stored_amount, new_earned) = match adjustment_type {
        TransactionType::Deduction => (-amount, (teacher.earned - amount).max(0.0)),
        _ => (amount, teacher.earned + amount),
    };

    let txn: PaymentTransaction = diesel::insert_into(payment_transactions::table)
        .values(&NewPaymentTransaction {
            teacher_id: teacher.id,
            booking_id: None,
            amount: stored_amount,
            transaction_type: adjustment_type.as_str().to_string(),
            status: TransactionStatus::Pending.as_str().to_string(),
            completed_at: None,
            notes: notes.map(str::to_string),
        })
        .get_result(conn)?;

    let updated_teacher: Teacher = diesel::update(teachers::table.find(teacher.id))
        .set(teachers::earned.eq(new_earned))
        .get_result(conn)?;

    tracing::info!(
        teacher_id = %teacher.id,
        transaction_id = %txn.id,
        adjustment_type = adjustment_type.as_str(),
        amount = stored_amount,
        "manual adjustment recorded"
    );

    Ok((txn, updated_teacher))
}

// --- Summary projection ---
//
// Read-side only. The transaction log stays the system of record; these
// aggregates are never written back.

pub struct LedgerRow {
    pub teacher_id: Uuid,
    pub display_name: String,
    pub status: TransactionStatus,
    pub amount: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TeacherLedgerSummary {
    pub teacher_id: Uuid,
    pub display_name: String,
    pub pending_total: f64,
    pub pending_count: usize,
    pub paid_total: f64,
    pub paid_count: usize,
}

pub fn summarize(rows: Vec<LedgerRow>) -> Vec<TeacherLedgerSummary> {
    let mut by_teacher: BTreeMap<Uuid, TeacherLedgerSummary> = BTreeMap::new();

    for row in rows {
        let entry = by_teacher
            .entry(row.teacher_id)
            .or_insert_with(|| TeacherLedgerSummary {
                teacher_id: row.teacher_id,
                display_name: row.display_name.clone(),
                pending_total: 0.0,
                pending_count: 0,
                paid_total: 0.0,
                paid_count: 0,
            });

        match row.status {
            TransactionStatus::Pending => {
                entry.pending_total += row.amount;
                entry.pending_count += 1;
            }
            TransactionStatus::Paid => {
                entry.paid_total += row.amount;
                entry.paid_count += 1;
            }
            // Cancelled entries stay in the log for audit but carry no
            // outstanding or settled value.
            TransactionStatus::Cancelled => {}
        }
    }

    let mut summaries: Vec<TeacherLedgerSummary> = by_teacher.into_values().collect();
    summaries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    summaries
}

pub fn ledger_summary(conn: &mut PgConnection) -> AppResult<Vec<TeacherLedgerSummary>> {
    let rows: Vec<(Uuid, String, String, f64)> = payment_transactions::table
        .inner_join(teachers::table)
        .select((
            payment_transactions::teacher_id,
            teachers::display_name,
            payment_transactions::status,
            payment_transactions::amount,
        ))
        .load(conn)?;

    let rows = rows
        .into_iter()
        .map(|(teacher_id, display_name, status, amount)| {
            Ok(LedgerRow {
                teacher_id,
                display_name,
                status: status.parse().map_err(AppError::internal)?,
                amount,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(summarize(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(teacher_id: Uuid, name: &str, status: TransactionStatus, amount: f64) -> LedgerRow {
        LedgerRow {
            teacher_id,
            display_name: name.to_string(),
            status,
            amount,
        }
    }

    #[test]
    fn summary_splits_pending_and_paid() {
        let t1 = Uuid::now_v7();

        let summaries = summarize(vec![
            row(t1, "Ada", TransactionStatus::Pending, 30.0),
            row(t1, "Ada", TransactionStatus::Pending, 30.0),
            row(t1, "Ada", TransactionStatus::Pending, 30.0),
            row(t1, "Ada", TransactionStatus::Paid, 45.0),
        ]);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].pending_total, 90.0);
        assert_eq!(summaries[0].pending_count, 3);
        assert_eq!(summaries[0].paid_total, 45.0);
        assert_eq!(summaries[0].paid_count, 1);
    }

    #[test]
    fn summary_excludes_cancelled_entries() {
        let t1 = Uuid::now_v7();

        let summaries = summarize(vec![
            row(t1, "Ada", TransactionStatus::Pending, 20.0),
            row(t1, "Ada", TransactionStatus::Cancelled, 20.0),
        ]);

        assert_eq!(summaries[0].pending_total, 20.0);
        assert_eq!(summaries[0].pending_count, 1);
        assert_eq!(summaries[0].paid_count, 0);
    }

    #[test]
    fn summary_orders_by_teacher_name() {
        let (t1, t2) = (Uuid::now_v7(), Uuid::now_v7());

        let summaries = summarize(vec![
            row(t2, "Grace", TransactionStatus::Pending, 10.0),
            row(t1, "Ada", TransactionStatus::Pending, 10.0),
        ]);

        assert_eq!(summaries[0].display_name, "Ada");
        assert_eq!(summaries[1].display_name, "Grace");
    }
}
