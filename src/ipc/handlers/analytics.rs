use crate::analytics::{fee_analytics, subject_analytics, GradedResult};
use crate::ipc::error::ok;
use crate::ipc::handlers::fees::load_ledgers;
use crate::ipc::handlers::results::{query_results, ResultFilters};
use crate::ipc::helpers::{
    current_scale, get_optional_str, get_required_str, require_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_subjects(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let scale = current_scale(state)?;
    let conn = require_db(state)?;
    let class_id = get_required_str(&req.params, "classId")?;
    let term = get_required_str(&req.params, "term")?;
    let academic_year = get_required_str(&req.params, "academicYear")?;

    let rows = query_results(
        conn,
        &ResultFilters {
            class_id: Some(class_id.clone()),
            term: Some(term.clone()),
            academic_year: Some(academic_year.clone()),
            ..Default::default()
        },
    )?;
    let graded: Vec<GradedResult> = rows.iter().map(|r| r.to_graded()).collect();
    let analytics = subject_analytics(&scale, &graded);

    Ok(json!({
        "classId": class_id,
        "term": term,
        "academicYear": academic_year,
        "subjects": analytics.subjects,
        "gradeDistribution": analytics.grade_distribution,
        "overallPassRate": analytics.overall_pass_rate,
    }))
}

fn handle_fees(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_id = get_optional_str(&req.params, "classId");
    let ledgers = load_ledgers(conn, class_id.as_deref(), None)?;
    Ok(json!(fee_analytics(&ledgers)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "analytics.subjects" => handle_subjects(state, req),
        "analytics.fees" => handle_fees(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
