use crate::assessment::AssessmentType;
use crate::grading::GradeScale;
use crate::ipc::error::ok;
use crate::ipc::handlers::assessments::load_assessment_types;
use crate::ipc::handlers::results::{query_results, ResultFilters, StoredResult};
use crate::ipc::helpers::{current_scale, get_required_str, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::transcript::{build_transcript, ResultRecord};
use serde_json::json;
use std::collections::HashMap;

fn student_transcript(
    scale: &GradeScale,
    assessment_types: &[AssessmentType],
    term: &str,
    academic_year: &str,
    rows: &[&StoredResult],
) -> serde_json::Value {
    let records: Vec<ResultRecord> = rows.iter().map(|r| r.to_record()).collect();
    let transcript = build_transcript(scale, assessment_types, &records);
    // Name/number/class come from the last saved row.
    let head = rows[rows.len() - 1];
    json!({
        "student": {
            "studentId": head.student_id,
            "studentName": head.student_name,
            "eczNumber": head.ecz_number,
            "classId": head.class_id,
        },
        "term": term,
        "academicYear": academic_year,
        "assessmentColumns": transcript.assessment_columns,
        "subjects": transcript.subjects,
        "gradingScale": transcript.grading_scale,
        "summary": transcript.summary,
    })
}

fn handle_build(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let scale = current_scale(state)?;
    let conn = require_db(state)?;
    let student_id = get_required_str(&req.params, "studentId")?;
    let term = get_required_str(&req.params, "term")?;
    let academic_year = get_required_str(&req.params, "academicYear")?;

    let rows = query_results(
        conn,
        &ResultFilters {
            student_id: Some(student_id.clone()),
            term: Some(term.clone()),
            academic_year: Some(academic_year.clone()),
            ..Default::default()
        },
    )?;
    if rows.is_empty() {
        return Err(
            HandlerErr::new("not_found", "no results for student in this term").with_details(
                json!({ "studentId": student_id, "term": term, "academicYear": academic_year }),
            ),
        );
    }
    let assessment_types = load_assessment_types(conn)?;
    let refs: Vec<&StoredResult> = rows.iter().collect();
    Ok(student_transcript(
        &scale,
        &assessment_types,
        &term,
        &academic_year,
        &refs,
    ))
}

/// One transcript per student that has at least one result in the term.
fn handle_build_class(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
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
    let assessment_types = load_assessment_types(conn)?;

    let mut order: Vec<&str> = Vec::new();
    let mut by_student: HashMap<&str, Vec<&StoredResult>> = HashMap::new();
    for r in &rows {
        by_student
            .entry(r.student_id.as_str())
            .or_insert_with(|| {
                order.push(r.student_id.as_str());
                Vec::new()
            })
            .push(r);
    }

    let transcripts: Vec<serde_json::Value> = order
        .iter()
        .map(|sid| {
            student_transcript(
                &scale,
                &assessment_types,
                &term,
                &academic_year,
                &by_student[sid],
            )
        })
        .collect();
    tracing::info!(class_id = %class_id, count = transcripts.len(), "class transcripts built");

    Ok(json!({
        "classId": class_id,
        "term": term,
        "academicYear": academic_year,
        "transcripts": transcripts,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "transcripts.build" => handle_build(state, req),
        "transcripts.buildClass" => handle_build_class(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
