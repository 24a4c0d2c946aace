use crate::db::now_timestamp;
use crate::fees::{FeeLedger, FeePayment, LedgerStatus, PaymentDraft, PaymentMethod};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    db_err, get_optional_str, get_required_str, parse_params, require_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

fn bad_stored_value(column: &str, value: &str) -> HandlerErr {
    HandlerErr::new("db_query_failed", format!("unexpected {} '{}'", column, value))
}

pub(crate) fn load_ledgers(
    conn: &Connection,
    class_id: Option<&str>,
    ledger_id: Option<&str>,
) -> Result<Vec<FeeLedger>, HandlerErr> {
    let mut filter = String::from("WHERE 1 = 1");
    let mut bind: Vec<Value> = Vec::new();
    if let Some(c) = class_id {
        filter.push_str(" AND class_id = ?");
        bind.push(Value::Text(c.to_string()));
    }
    if let Some(l) = ledger_id {
        filter.push_str(" AND id = ?");
        bind.push(Value::Text(l.to_string()));
    }
    let sql = format!(
        "SELECT id, student_id, student_name, class_id, academic_year, term,
                total_fees, paid_amount, balance, status
         FROM fee_ledgers {}
         ORDER BY student_name, rowid",
        filter
    );

    let mut stmt = conn.prepare(&sql).map_err(db_err("db_query_failed"))?;
    let raw = stmt
        .query_map(params_from_iter(bind.iter()), |r| {
            Ok((
                FeeLedger {
                    id: r.get(0)?,
                    student_id: r.get(1)?,
                    student_name: r.get(2)?,
                    class_id: r.get(3)?,
                    academic_year: r.get(4)?,
                    term: r.get(5)?,
                    total_fees: r.get(6)?,
                    paid_amount: r.get(7)?,
                    balance: r.get(8)?,
                    payments: Vec::new(),
                    status: LedgerStatus::Unpaid,
                },
                r.get::<_, String>(9)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;

    let mut ledgers: Vec<FeeLedger> = Vec::with_capacity(raw.len());
    for (mut ledger, status) in raw {
        ledger.status =
            LedgerStatus::parse(&status).ok_or_else(|| bad_stored_value("status", &status))?;
        ledgers.push(ledger);
    }
    if ledgers.is_empty() {
        return Ok(ledgers);
    }

    // Only payments of the ledgers selected above.
    let pay_sql = format!(
        "SELECT ledger_id, id, amount, payment_date, payment_method, receipt_number, received_by
         FROM fee_payments
         WHERE ledger_id IN (SELECT id FROM fee_ledgers {})
         ORDER BY ledger_id, seq",
        filter
    );
    let mut pay_stmt = conn.prepare(&pay_sql).map_err(db_err("db_query_failed"))?;
    let payments = pay_stmt
        .query_map(params_from_iter(bind.iter()), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, f64>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, String>(6)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;

    let index: HashMap<String, usize> = ledgers
        .iter()
        .enumerate()
        .map(|(i, l)| (l.id.clone(), i))
        .collect();
    for (ledger_id, id, amount, payment_date, method, receipt_number, received_by) in payments {
        let Some(&i) = index.get(&ledger_id) else {
            continue;
        };
        let payment_method = PaymentMethod::parse(&method)
            .ok_or_else(|| bad_stored_value("payment_method", &method))?;
        ledgers[i].payments.push(FeePayment {
            id,
            amount,
            payment_date,
            payment_method,
            receipt_number,
            received_by,
        });
    }
    Ok(ledgers)
}

fn handle_ledgers_list(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_id = get_optional_str(&req.params, "classId");
    let status = match get_optional_str(&req.params, "status") {
        None => None,
        Some(s) if s.eq_ignore_ascii_case("all") => None,
        Some(s) => Some(LedgerStatus::parse(&s).ok_or_else(|| {
            HandlerErr::new("bad_params", "status must be one of: Paid, Partial, Unpaid")
                .with_details(json!({ "status": s }))
        })?),
    };
    let ledgers: Vec<FeeLedger> = load_ledgers(conn, class_id.as_deref(), None)?
        .into_iter()
        .filter(|l| status.map(|s| l.status == s).unwrap_or(true))
        .collect();
    Ok(json!({ "ledgers": ledgers }))
}

fn handle_ledgers_create(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let total_fees = req
        .params
        .get("totalFees")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing totalFees"))?;
    let ledger = FeeLedger::open(
        Uuid::new_v4().to_string(),
        get_required_str(&req.params, "studentId")?,
        get_required_str(&req.params, "studentName")?,
        get_required_str(&req.params, "classId")?,
        get_required_str(&req.params, "academicYear")?,
        get_required_str(&req.params, "term")?,
        total_fees,
    )
    .map_err(|e| HandlerErr::new(e.code(), e.to_string()))?;

    let now = now_timestamp();
    conn.execute(
        "INSERT INTO fee_ledgers(id, student_id, student_name, class_id, academic_year, term,
                                 total_fees, paid_amount, balance, status, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &ledger.id,
            &ledger.student_id,
            &ledger.student_name,
            &ledger.class_id,
            &ledger.academic_year,
            &ledger.term,
            ledger.total_fees,
            ledger.paid_amount,
            ledger.balance,
            ledger.status.as_str(),
            &now,
            &now,
        ),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "fee_ledgers" }))
    })?;

    Ok(json!({ "ledger": ledger }))
}

fn handle_payments_add(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let ledger_id = get_required_str(&req.params, "ledgerId")?;
    let Some(raw_payment) = req.params.get("payment") else {
        return Err(HandlerErr::new("bad_params", "missing payment"));
    };
    let draft: PaymentDraft = parse_params(raw_payment, "payment")?;

    let Some(current) = load_ledgers(conn, None, Some(&ledger_id))?.into_iter().next() else {
        return Err(HandlerErr::new("not_found", "ledger not found")
            .with_details(json!({ "ledgerId": ledger_id })));
    };
    let next = current
        .with_payment(draft, Uuid::new_v4().to_string())
        .map_err(|e| HandlerErr::new(e.code(), e.to_string()))?;
    let Some(payment) = next.payments.last() else {
        return Err(HandlerErr::new("invalid_payment", "payment was not recorded"));
    };

    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed"))?;
    tx.execute(
        "INSERT INTO fee_payments(id, ledger_id, seq, amount, payment_date, payment_method, receipt_number, received_by)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &payment.id,
            &next.id,
            next.payments.len() as i64,
            payment.amount,
            &payment.payment_date,
            payment.payment_method.as_str(),
            &payment.receipt_number,
            &payment.received_by,
        ),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "fee_payments" }))
    })?;
    tx.execute(
        "UPDATE fee_ledgers SET paid_amount = ?, balance = ?, status = ?, updated_at = ? WHERE id = ?",
        (
            next.paid_amount,
            next.balance,
            next.status.as_str(),
            now_timestamp(),
            &next.id,
        ),
    )
    .map_err(db_err("db_update_failed"))?;
    tx.commit().map_err(db_err("db_tx_failed"))?;
    tracing::info!(
        ledger_id = %next.id,
        amount = payment.amount,
        status = next.status.as_str(),
        "fee payment recorded"
    );

    Ok(json!({ "ledger": next }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "fees.ledgers.list" => handle_ledgers_list(state, req),
        "fees.ledgers.create" => handle_ledgers_create(state, req),
        "fees.payments.add" => handle_payments_add(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
