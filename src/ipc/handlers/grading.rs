use crate::db;
use crate::grading::{GradeBand, GradeScale};
use crate::ipc::error::ok;
use crate::ipc::helpers::{current_scale, get_required_i64, parse_params, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn evaluate(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let marks = get_required_i64(&req.params, "marks")?;
    let max_marks = get_required_i64(&req.params, "maxMarks")?;
    let scale = current_scale(state)?;
    let evaluation = scale.evaluate(marks, max_marks).map_err(|e| {
        HandlerErr::new(e.code(), e.to_string())
            .with_details(json!({ "marks": marks, "maxMarks": max_marks }))
    })?;
    Ok(json!(evaluation))
}

fn grade(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let percentage = get_required_i64(&req.params, "percentage")?;
    let scale = current_scale(state)?;
    let matched = scale.band_for(percentage).is_some();
    let mut out = json!(scale.describe(percentage));
    out["matched"] = json!(matched);
    Ok(out)
}

fn gpa(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let Some(items) = req.params.get("percentages").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing percentages"));
    };
    let mut percentages: Vec<i64> = Vec::with_capacity(items.len());
    for (i, v) in items.iter().enumerate() {
        // Accept bare numbers or `{ "percentage": n }` rows.
        let p = v
            .as_i64()
            .or_else(|| v.get("percentage").and_then(|p| p.as_i64()));
        let Some(p) = p else {
            return Err(HandlerErr::new(
                "bad_params",
                "percentages must be integers",
            )
            .with_details(json!({ "index": i })));
        };
        percentages.push(p);
    }
    let scale = current_scale(state)?;
    Ok(json!({
        "averagePoints": scale.calculate_gpa(percentages.iter().copied()),
        "subjectCount": percentages.len(),
    }))
}

fn scale_get(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let source = match state.db.as_ref() {
        Some(conn) => match db::settings_get_json(conn, db::GRADE_SCALE_KEY) {
            Ok(Some(_)) => "workspace",
            Ok(None) => "default",
            Err(e) => return Err(HandlerErr::new("db_query_failed", e.to_string())),
        },
        None => "default",
    };
    let scale = current_scale(state)?;
    Ok(json!({ "bands": scale, "source": source }))
}

fn scale_set(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let Some(raw) = req.params.get("bands") else {
        return Err(HandlerErr::new("bad_params", "missing bands"));
    };
    let bands: Vec<GradeBand> = parse_params(raw, "bands")?;
    let scale = GradeScale::new(bands).map_err(|e| HandlerErr::new(e.code(), e.to_string()))?;
    db::settings_set_json(conn, db::GRADE_SCALE_KEY, &json!(scale))
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    tracing::info!(bands = scale.bands().len(), "workspace grade scale replaced");
    Ok(json!({ "bands": scale }))
}

fn scale_reset(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    conn.execute("DELETE FROM settings WHERE key = ?", [db::GRADE_SCALE_KEY])
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    Ok(json!({ "bands": GradeScale::ecz() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grading.evaluate" => evaluate(state, req),
        "grading.grade" => grade(state, req),
        "grading.gpa" => gpa(state, req),
        "grading.scale.get" => scale_get(state, req),
        "grading.scale.set" => scale_set(state, req),
        "grading.scale.reset" => scale_reset(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
