use crate::attendance::{parse_day, tally, AttendanceMark, AttendanceRecord, AttendanceStatus};
use crate::db::now_timestamp;
use crate::ipc::error::ok;
use crate::ipc::helpers::{db_err, get_required_str, parse_params, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use uuid::Uuid;

const ATTENDANCE_SAVE_MAX_RECORDS: usize = 2000;

fn handle_save(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let marked_by = get_required_str(&req.params, "markedBy")?;
    let Some(raw_records) = req.params.get("records") else {
        return Err(HandlerErr::new("bad_params", "missing records"));
    };
    let marks: Vec<AttendanceMark> = parse_params(raw_records, "records")?;
    if marks.is_empty() {
        return Err(HandlerErr::new("bad_params", "no attendance to save"));
    }
    if marks.len() > ATTENDANCE_SAVE_MAX_RECORDS {
        return Err(HandlerErr::new("bad_params", "too many records").with_details(json!({
            "maxRecords": ATTENDANCE_SAVE_MAX_RECORDS,
            "received": marks.len()
        })));
    }

    let mut checked: Vec<AttendanceMark> = Vec::with_capacity(marks.len());
    for (index, mark) in marks.iter().enumerate() {
        let valid = mark.validated().map_err(|e| {
            HandlerErr::new(e.code(), format!("records[{}].{}", index, e))
                .with_details(json!({ "index": index }))
        })?;
        checked.push(valid);
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed"))?;
    let now = now_timestamp();
    for mark in &checked {
        tx.execute(
            "INSERT INTO attendance(id, student_id, student_name, class_id, date, status, marked_by, marked_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(student_id, class_id, date) DO UPDATE SET
                student_name = excluded.student_name,
                status = excluded.status,
                marked_by = excluded.marked_by,
                marked_at = excluded.marked_at",
            (
                Uuid::new_v4().to_string(),
                &mark.student_id,
                &mark.student_name,
                &mark.class_id,
                &mark.date,
                mark.status.as_str(),
                &marked_by,
                &now,
            ),
        )
        .map_err(|e| {
            HandlerErr::new("db_insert_failed", e.to_string())
                .with_details(json!({ "table": "attendance" }))
        })?;
    }
    tx.commit().map_err(db_err("db_tx_failed"))?;
    tracing::info!(count = checked.len(), marked_by = %marked_by, "attendance saved");

    Ok(json!({ "saved": checked.len() }))
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_id = get_required_str(&req.params, "classId")?;
    let raw_date = get_required_str(&req.params, "date")?;
    let date = parse_day("date", &raw_date)
        .map_err(|e| HandlerErr::new(e.code(), e.to_string()))?
        .format("%Y-%m-%d")
        .to_string();

    let mut stmt = conn
        .prepare(
            "SELECT id, student_id, student_name, class_id, date, status, marked_by, marked_at
             FROM attendance
             WHERE class_id = ? AND date = ?
             ORDER BY student_name, rowid",
        )
        .map_err(db_err("db_query_failed"))?;
    let raw = stmt
        .query_map((&class_id, &date), |r| {
            Ok((
                AttendanceRecord {
                    id: r.get(0)?,
                    student_id: r.get(1)?,
                    student_name: r.get(2)?,
                    class_id: r.get(3)?,
                    date: r.get(4)?,
                    status: AttendanceStatus::Present,
                    marked_by: r.get(6)?,
                    marked_at: r.get(7)?,
                },
                r.get::<_, String>(5)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;

    let mut records: Vec<AttendanceRecord> = Vec::with_capacity(raw.len());
    for (mut record, status) in raw {
        record.status = AttendanceStatus::parse(&status).ok_or_else(|| {
            HandlerErr::new("db_query_failed", format!("unexpected status '{}'", status))
        })?;
        records.push(record);
    }

    Ok(json!({
        "classId": class_id,
        "date": date,
        "tally": tally(&records),
        "records": records,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.save" => handle_save(state, req),
        "attendance.list" => handle_list(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
