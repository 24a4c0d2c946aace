use crate::db::now_timestamp;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    db_err, get_optional_str, get_required_str, parse_params, require_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::lessons::{LessonPlan, LessonPlanDraft};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde_json::json;
use uuid::Uuid;

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let draft: LessonPlanDraft = parse_params(&req.params, "lesson plan")?;
    let plan = draft
        .into_plan(Uuid::new_v4().to_string(), now_timestamp())
        .map_err(|e| HandlerErr::new(e.code(), e.to_string()))?;

    conn.execute(
        "INSERT INTO lesson_plans(id, title, objective, content, class_id, subject_id, date,
                                  teacher_id, teacher_name, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &plan.id,
            &plan.title,
            &plan.objective,
            &plan.content,
            &plan.class_id,
            &plan.subject_id,
            &plan.date,
            &plan.teacher_id,
            &plan.teacher_name,
            &plan.created_at,
        ),
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "lesson_plans" }))
    })?;
    tracing::info!(id = %plan.id, teacher_id = %plan.teacher_id, "lesson plan saved");

    Ok(json!({ "lessonPlan": plan }))
}

/// A teacher's plans, newest lesson date first.
fn handle_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let teacher_id = get_required_str(&req.params, "teacherId")?;
    let mut sql = String::from(
        "SELECT id, title, objective, content, class_id, subject_id, date,
                teacher_id, teacher_name, created_at
         FROM lesson_plans WHERE teacher_id = ?",
    );
    let mut bind: Vec<Value> = vec![Value::Text(teacher_id)];
    if let Some(class_id) = get_optional_str(&req.params, "classId") {
        sql.push_str(" AND class_id = ?");
        bind.push(Value::Text(class_id));
    }
    sql.push_str(" ORDER BY date DESC, rowid DESC");

    let mut stmt = conn.prepare(&sql).map_err(db_err("db_query_failed"))?;
    let plans = stmt
        .query_map(params_from_iter(bind), |r| {
            Ok(LessonPlan {
                id: r.get(0)?,
                title: r.get(1)?,
                objective: r.get(2)?,
                content: r.get(3)?,
                class_id: r.get(4)?,
                subject_id: r.get(5)?,
                date: r.get(6)?,
                teacher_id: r.get(7)?,
                teacher_name: r.get(8)?,
                created_at: r.get(9)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;

    Ok(json!({ "lessonPlans": plans }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "lessonPlans.create" => handle_create(state, req),
        "lessonPlans.list" => handle_list(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
