use crate::assessment::{weightage_check, AssessmentType, AssessmentTypePatch};
use crate::db::now_timestamp;
use crate::ipc::error::ok;
use crate::ipc::helpers::{db_err, get_required_str, parse_params, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssessmentTypeInput {
    name: String,
    code: String,
    weightage: i64,
    max_marks: i64,
    #[serde(default = "default_active")]
    is_active: bool,
    order: i64,
}

fn default_active() -> bool {
    true
}

fn row_to_assessment_type(r: &rusqlite::Row<'_>) -> rusqlite::Result<AssessmentType> {
    Ok(AssessmentType {
        id: r.get(0)?,
        name: r.get(1)?,
        code: r.get(2)?,
        weightage: r.get(3)?,
        max_marks: r.get(4)?,
        is_active: r.get::<_, i64>(5)? != 0,
        order: r.get(6)?,
    })
}

pub(crate) fn load_assessment_types(conn: &Connection) -> Result<Vec<AssessmentType>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, code, weightage, max_marks, is_active, sort_order
             FROM assessment_types
             ORDER BY sort_order, rowid",
        )
        .map_err(db_err("db_query_failed"))?;
    let rows = stmt
        .query_map([], row_to_assessment_type)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(rows)
}

fn load_one(conn: &Connection, id: &str) -> Result<AssessmentType, HandlerErr> {
    conn.query_row(
        "SELECT id, name, code, weightage, max_marks, is_active, sort_order
         FROM assessment_types WHERE id = ?",
        [id],
        row_to_assessment_type,
    )
    .optional()
    .map_err(db_err("db_query_failed"))?
    .ok_or_else(|| {
        HandlerErr::new("not_found", "assessment type not found")
            .with_details(json!({ "assessmentTypeId": id }))
    })
}

fn save(conn: &Connection, t: &AssessmentType) -> Result<(), HandlerErr> {
    let now = now_timestamp();
    conn.execute(
        "UPDATE assessment_types
         SET name = ?, code = ?, weightage = ?, max_marks = ?, is_active = ?, sort_order = ?, updated_at = ?
         WHERE id = ?",
        (
            &t.name,
            &t.code,
            t.weightage,
            t.max_marks,
            t.is_active as i64,
            t.order,
            &now,
            &t.id,
        ),
    )
    .map_err(db_err("db_update_failed"))?;
    Ok(())
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let include_inactive = req
        .params
        .get("includeInactive")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let types: Vec<AssessmentType> = load_assessment_types(conn)?
        .into_iter()
        .filter(|t| include_inactive || t.is_active)
        .collect();
    Ok(json!({
        "assessmentTypes": types,
        "weightCheck": weightage_check(&types),
    }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let input: AssessmentTypeInput = parse_params(&req.params, "assessment type")?;
    let t = AssessmentType {
        id: Uuid::new_v4().to_string(),
        name: input.name.trim().to_string(),
        code: input.code.trim().to_string(),
        weightage: input.weightage,
        max_marks: input.max_marks,
        is_active: input.is_active,
        order: input.order,
    };
    t.validate()
        .map_err(|e| HandlerErr::new(e.code(), e.to_string()))?;

    let now = now_timestamp();
    conn.execute(
        "INSERT INTO assessment_types(id, name, code, weightage, max_marks, is_active, sort_order, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &t.id,
            &t.name,
            &t.code,
            t.weightage,
            t.max_marks,
            t.is_active as i64,
            t.order,
            &now,
            &now,
        ),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "assessment_types" }))
    })?;
    tracing::info!(id = %t.id, code = %t.code, weightage = t.weightage, "assessment type created");

    let all = load_assessment_types(conn)?;
    Ok(json!({
        "assessmentTypeId": t.id,
        "weightCheck": weightage_check(&all),
    }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let id = get_required_str(&req.params, "assessmentTypeId")?;
    let Some(raw_patch) = req.params.get("patch") else {
        return Err(HandlerErr::new("bad_params", "missing patch"));
    };
    let patch: AssessmentTypePatch = parse_params(raw_patch, "patch")?;
    let current = load_one(conn, &id)?;
    let next = current
        .apply_patch(patch)
        .map_err(|e| HandlerErr::new(e.code(), e.to_string()))?;
    save(conn, &next)?;

    let all = load_assessment_types(conn)?;
    Ok(json!({
        "assessmentType": next,
        "weightCheck": weightage_check(&all),
    }))
}

/// Soft delete; results already saved against the type keep referencing it.
fn handle_deactivate(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let id = get_required_str(&req.params, "assessmentTypeId")?;
    let mut t = load_one(conn, &id)?;
    t.is_active = false;
    save(conn, &t)?;

    let all = load_assessment_types(conn)?;
    Ok(json!({
        "assessmentTypeId": id,
        "weightCheck": weightage_check(&all),
    }))
}

fn handle_weight_check(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let all = load_assessment_types(conn)?;
    Ok(json!(weightage_check(&all)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "assessmentTypes.list" => handle_list(state, req),
        "assessmentTypes.create" => handle_create(state, req),
        "assessmentTypes.update" => handle_update(state, req),
        "assessmentTypes.deactivate" => handle_deactivate(state, req),
        "assessmentTypes.weightCheck" => handle_weight_check(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
