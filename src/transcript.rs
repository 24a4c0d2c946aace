use crate::assessment::{active_in_order, AssessmentType};
use crate::grading::{round_half_up, GradeBand, GradeScale, PASS_MARK};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// The slice of a persisted result the aggregation needs. `percentage` is the
/// value snapshotted at save time and is never recomputed here.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub subject_id: String,
    pub subject_name: String,
    pub assessment_type_id: String,
    pub marks: i64,
    pub max_marks: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentCell {
    pub marks: i64,
    pub max_marks: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentColumn {
    pub id: String,
    pub code: String,
    pub name: String,
    pub weightage: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAggregate {
    pub subject_id: String,
    pub subject_name: String,
    pub assessments: BTreeMap<String, AssessmentCell>,
    pub total_weighted: i64,
    /// Sum of the weightages that actually contributed. Below 100 means the
    /// total is not renormalized for missing assessments.
    pub applied_weightage: i64,
    pub final_grade: Option<String>,
    pub comment: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub overall_average: i64,
    pub subjects_passed: usize,
    pub subject_count: usize,
    pub average_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub assessment_columns: Vec<AssessmentColumn>,
    pub subjects: Vec<SubjectAggregate>,
    pub grading_scale: Vec<GradeBand>,
    pub summary: TranscriptSummary,
}

pub fn group_by_subject(results: &[ResultRecord]) -> Vec<SubjectAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<SubjectAggregate> = Vec::new();
    for r in results {
        let i = *index.entry(r.subject_id.as_str()).or_insert_with(|| {
            rows.push(SubjectAggregate {
                subject_id: r.subject_id.clone(),
                subject_name: r.subject_name.clone(),
                assessments: BTreeMap::new(),
                total_weighted: 0,
                applied_weightage: 0,
                final_grade: None,
                comment: None,
                passed: false,
            });
            rows.len() - 1
        });
        // A later record for the same assessment replaces the earlier one.
        rows[i].assessments.insert(
            r.assessment_type_id.clone(),
            AssessmentCell {
                marks: r.marks,
                max_marks: r.max_marks,
                percentage: r.percentage,
            },
        );
    }
    rows
}

fn apply_weights(row: &mut SubjectAggregate, active: &[&AssessmentType], scale: &GradeScale) {
    let mut weighted = 0.0_f64;
    let mut applied = 0_i64;
    for t in active {
        if let Some(cell) = row.assessments.get(&t.id) {
            weighted += cell.percentage as f64 * (t.weightage as f64 / 100.0);
            applied += t.weightage;
        }
    }
    row.applied_weightage = applied;
    if applied > 0 {
        row.total_weighted = round_half_up(weighted);
        let band = scale.calculate_grade(row.total_weighted);
        row.final_grade = Some(band.grade.clone());
        row.comment = Some(band.comment.clone());
    } else {
        row.total_weighted = 0;
        row.final_grade = None;
        row.comment = None;
    }
    row.passed = row.total_weighted >= PASS_MARK;
}

pub fn summarize(subjects: &[SubjectAggregate], scale: &GradeScale) -> TranscriptSummary {
    let subject_count = subjects.len();
    let overall_average = if subject_count > 0 {
        let sum: i64 = subjects.iter().map(|s| s.total_weighted).sum();
        round_half_up(sum as f64 / subject_count as f64)
    } else {
        0
    };
    TranscriptSummary {
        overall_average,
        subjects_passed: subjects.iter().filter(|s| s.passed).count(),
        subject_count,
        average_points: scale.calculate_gpa(subjects.iter().map(|s| s.total_weighted)),
    }
}

/// Aggregates one student's results for a term into transcript rows and a summary.
pub fn build_transcript(
    scale: &GradeScale,
    assessment_types: &[AssessmentType],
    results: &[ResultRecord],
) -> Transcript {
    let active = active_in_order(assessment_types);
    let mut subjects = group_by_subject(results);
    for row in subjects.iter_mut() {
        apply_weights(row, &active, scale);
    }
    let summary = summarize(&subjects, scale);

    Transcript {
        assessment_columns: active
            .iter()
            .map(|t| AssessmentColumn {
                id: t.id.clone(),
                code: t.code.clone(),
                name: t.name.clone(),
                weightage: t.weightage,
            })
            .collect(),
        subjects,
        grading_scale: scale.bands().to_vec(),
        summary,
    }
}
