use crate::analytics::GradedResult;
use crate::db::now_timestamp;
use crate::grading::MarkEvaluation;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    current_scale, db_err, get_optional_str, get_required_i64, get_required_str, parse_params,
    require_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::transcript::ResultRecord;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

const RESULTS_SAVE_MAX_ENTRIES: usize = 5000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultEntryInput {
    student_id: String,
    student_name: String,
    #[serde(default)]
    ecz_number: String,
    class_id: String,
    subject_id: String,
    subject_name: String,
    assessment_type_id: String,
    assessment_type_name: String,
    academic_year: String,
    term: String,
    marks: i64,
    max_marks: i64,
}

impl ResultEntryInput {
    fn missing_field(&self) -> Option<&'static str> {
        let required = [
            ("studentId", &self.student_id),
            ("studentName", &self.student_name),
            ("classId", &self.class_id),
            ("subjectId", &self.subject_id),
            ("subjectName", &self.subject_name),
            ("assessmentTypeId", &self.assessment_type_id),
            ("assessmentTypeName", &self.assessment_type_name),
            ("academicYear", &self.academic_year),
            ("term", &self.term),
        ];
        required
            .iter()
            .find(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
    }
}

/// A persisted result as returned to the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredResult {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub ecz_number: String,
    pub class_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub assessment_type_id: String,
    pub assessment_type_name: String,
    pub academic_year: String,
    pub term: String,
    pub marks: i64,
    pub max_marks: i64,
    pub percentage: i64,
    pub grade: String,
    pub comment: String,
    pub entered_by: String,
    pub updated_at: String,
}

impl StoredResult {
    pub fn to_record(&self) -> ResultRecord {
        ResultRecord {
            subject_id: self.subject_id.clone(),
            subject_name: self.subject_name.clone(),
            assessment_type_id: self.assessment_type_id.clone(),
            marks: self.marks,
            max_marks: self.max_marks,
            percentage: self.percentage,
        }
    }

    pub fn to_graded(&self) -> GradedResult {
        GradedResult {
            subject_id: self.subject_id.clone(),
            subject_name: self.subject_name.clone(),
            percentage: self.percentage,
            grade: self.grade.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ResultFilters {
    pub class_id: Option<String>,
    pub student_id: Option<String>,
    pub subject_id: Option<String>,
    pub assessment_type_id: Option<String>,
    pub term: Option<String>,
    pub academic_year: Option<String>,
}

impl ResultFilters {
    fn from_params(params: &serde_json::Value) -> Self {
        Self {
            class_id: get_optional_str(params, "classId"),
            student_id: get_optional_str(params, "studentId"),
            subject_id: get_optional_str(params, "subjectId"),
            assessment_type_id: get_optional_str(params, "assessmentTypeId"),
            term: get_optional_str(params, "term"),
            academic_year: get_optional_str(params, "academicYear"),
        }
    }
}

/// Results matching every given filter, in save order.
pub(crate) fn query_results(
    conn: &Connection,
    filters: &ResultFilters,
) -> Result<Vec<StoredResult>, HandlerErr> {
    let mut sql = String::from(
        "SELECT id, student_id, student_name, ecz_number, class_id, subject_id, subject_name,
                assessment_type_id, assessment_type_name, academic_year, term,
                marks, max_marks, percentage, grade, comment, entered_by, updated_at
         FROM results WHERE 1 = 1",
    );
    let mut bind: Vec<Value> = Vec::new();
    let clauses = [
        ("class_id", &filters.class_id),
        ("student_id", &filters.student_id),
        ("subject_id", &filters.subject_id),
        ("assessment_type_id", &filters.assessment_type_id),
        ("term", &filters.term),
        ("academic_year", &filters.academic_year),
    ];
    for (column, value) in clauses {
        if let Some(v) = value {
            sql.push_str(&format!(" AND {} = ?", column));
            bind.push(Value::Text(v.clone()));
        }
    }
    sql.push_str(" ORDER BY rowid");

    let mut stmt = conn.prepare(&sql).map_err(db_err("db_query_failed"))?;
    let rows = stmt
        .query_map(params_from_iter(bind), |r| {
            Ok(StoredResult {
                id: r.get(0)?,
                student_id: r.get(1)?,
                student_name: r.get(2)?,
                ecz_number: r.get(3)?,
                class_id: r.get(4)?,
                subject_id: r.get(5)?,
                subject_name: r.get(6)?,
                assessment_type_id: r.get(7)?,
                assessment_type_name: r.get(8)?,
                academic_year: r.get(9)?,
                term: r.get(10)?,
                marks: r.get(11)?,
                max_marks: r.get(12)?,
                percentage: r.get(13)?,
                grade: r.get(14)?,
                comment: r.get(15)?,
                entered_by: r.get(16)?,
                updated_at: r.get(17)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err("db_query_failed"))?;
    Ok(rows)
}

fn handle_save(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let scale = current_scale(state)?;
    let conn = require_db(state)?;
    let entered_by = get_required_str(&req.params, "enteredBy")?;
    let Some(raw_entries) = req.params.get("entries") else {
        return Err(HandlerErr::new("bad_params", "missing entries"));
    };
    let entries: Vec<ResultEntryInput> = parse_params(raw_entries, "entries")?;
    if entries.is_empty() {
        return Err(HandlerErr::new("bad_params", "no marks to save"));
    }
    if entries.len() > RESULTS_SAVE_MAX_ENTRIES {
        return Err(HandlerErr::new("bad_params", "too many entries").with_details(json!({
            "maxEntries": RESULTS_SAVE_MAX_ENTRIES,
            "received": entries.len()
        })));
    }

    // Validate everything before touching the database.
    let mut evaluated: Vec<(ResultEntryInput, MarkEvaluation)> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if let Some(field) = entry.missing_field() {
            return Err(
                HandlerErr::new("bad_params", format!("entries[{}].{} is required", index, field))
                    .with_details(json!({ "index": index, "field": field })),
            );
        }
        let evaluation = scale.evaluate(entry.marks, entry.max_marks).map_err(|e| {
            HandlerErr::new(e.code(), e.to_string()).with_details(json!({
                "index": index,
                "studentId": entry.student_id,
                "marks": entry.marks,
                "maxMarks": entry.max_marks
            }))
        })?;
        evaluated.push((entry, evaluation));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed"))?;
    let now = now_timestamp();
    let mut saved: Vec<serde_json::Value> = Vec::with_capacity(evaluated.len());
    for (entry, evaluation) in &evaluated {
        let new_id = Uuid::new_v4().to_string();
        let result_id: String = tx
            .query_row(
                "INSERT INTO results(
                    id, student_id, student_name, ecz_number, class_id, subject_id, subject_name,
                    assessment_type_id, assessment_type_name, academic_year, term,
                    marks, max_marks, percentage, grade, comment, entered_by, created_at, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(student_id, subject_id, assessment_type_id, academic_year, term) DO UPDATE SET
                    student_name = excluded.student_name,
                    ecz_number = excluded.ecz_number,
                    class_id = excluded.class_id,
                    subject_name = excluded.subject_name,
                    assessment_type_name = excluded.assessment_type_name,
                    marks = excluded.marks,
                    max_marks = excluded.max_marks,
                    percentage = excluded.percentage,
                    grade = excluded.grade,
                    comment = excluded.comment,
                    entered_by = excluded.entered_by,
                    updated_at = excluded.updated_at
                 RETURNING id",
                params_from_iter([
                    Value::Text(new_id),
                    Value::Text(entry.student_id.trim().to_string()),
                    Value::Text(entry.student_name.trim().to_string()),
                    Value::Text(entry.ecz_number.trim().to_string()),
                    Value::Text(entry.class_id.trim().to_string()),
                    Value::Text(entry.subject_id.trim().to_string()),
                    Value::Text(entry.subject_name.trim().to_string()),
                    Value::Text(entry.assessment_type_id.trim().to_string()),
                    Value::Text(entry.assessment_type_name.trim().to_string()),
                    Value::Text(entry.academic_year.trim().to_string()),
                    Value::Text(entry.term.trim().to_string()),
                    Value::Integer(entry.marks),
                    Value::Integer(entry.max_marks),
                    Value::Integer(evaluation.percentage),
                    Value::Text(evaluation.grade.clone()),
                    Value::Text(evaluation.comment.clone()),
                    Value::Text(entered_by.clone()),
                    Value::Text(now.clone()),
                    Value::Text(now.clone()),
                ]),
                |r| r.get(0),
            )
            .map_err(|e| {
                HandlerErr::new("db_insert_failed", e.to_string())
                    .with_details(json!({ "table": "results" }))
            })?;
        saved.push(json!({
            "resultId": result_id,
            "studentId": entry.student_id.trim(),
            "percentage": evaluation.percentage,
            "grade": evaluation.grade,
            "comment": evaluation.comment,
        }));
    }
    tx.commit().map_err(db_err("db_tx_failed"))?;
    tracing::info!(count = saved.len(), entered_by = %entered_by, "results saved");

    Ok(json!({ "saved": saved.len(), "results": saved }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let scale = current_scale(state)?;
    let conn = require_db(state)?;
    let result_id = get_required_str(&req.params, "resultId")?;
    let marks = get_required_i64(&req.params, "marks")?;

    let stored_max: Option<i64> = conn
        .query_row(
            "SELECT max_marks FROM results WHERE id = ?",
            [&result_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(db_err("db_query_failed"))?;
    let Some(stored_max) = stored_max else {
        return Err(HandlerErr::new("not_found", "result not found")
            .with_details(json!({ "resultId": result_id })));
    };
    let max_marks = match req.params.get("maxMarks") {
        Some(v) if !v.is_null() => get_required_i64(&req.params, "maxMarks")?,
        _ => stored_max,
    };

    let evaluation = scale.evaluate(marks, max_marks).map_err(|e| {
        HandlerErr::new(e.code(), e.to_string())
            .with_details(json!({ "marks": marks, "maxMarks": max_marks }))
    })?;
    conn.execute(
        "UPDATE results
         SET marks = ?, max_marks = ?, percentage = ?, grade = ?, comment = ?, updated_at = ?
         WHERE id = ?",
        (
            marks,
            max_marks,
            evaluation.percentage,
            &evaluation.grade,
            &evaluation.comment,
            now_timestamp(),
            &result_id,
        ),
    )
    .map_err(db_err("db_update_failed"))?;

    Ok(json!({
        "resultId": result_id,
        "percentage": evaluation.percentage,
        "grade": evaluation.grade,
        "comment": evaluation.comment,
    }))
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let filters = ResultFilters::from_params(&req.params);
    let rows = query_results(conn, &filters)?;
    Ok(json!({ "results": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "results.save" => handle_save(state, req),
        "results.update" => handle_update(state, req),
        "results.list" => handle_list(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
