use crate::fees::FeeLedger;
use crate::grading::{round_half_up, GradeScale, PASS_MARK};
use serde::Serialize;
use std::collections::HashMap;

/// Stored result as read back for dashboards; grade is the saved snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedResult {
    pub subject_id: String,
    pub subject_name: String,
    pub percentage: i64,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCount {
    pub grade: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAnalytics {
    pub subject_id: String,
    pub subject_name: String,
    pub result_count: usize,
    pub average_score: i64,
    pub pass_rate: i64,
    pub grade_distribution: Vec<GradeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAnalytics {
    pub subjects: Vec<SubjectAnalytics>,
    pub grade_distribution: Vec<GradeCount>,
    pub overall_pass_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAnalytics {
    pub total_expected: f64,
    pub total_collected: f64,
    pub total_outstanding: f64,
    pub collection_rate: i64,
}

fn rate(part: usize, whole: usize) -> i64 {
    if whole == 0 {
        return 0;
    }
    round_half_up(part as f64 / whole as f64 * 100.0)
}

fn distribution<'a, I>(scale: &GradeScale, grades: I) -> Vec<GradeCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for g in grades {
        *counts.entry(g).or_default() += 1;
    }
    scale
        .bands()
        .iter()
        .map(|b| GradeCount {
            grade: b.grade.clone(),
            count: counts.get(b.grade.as_str()).copied().unwrap_or(0),
        })
        .collect()
}

pub fn subject_analytics(scale: &GradeScale, results: &[GradedResult]) -> ClassAnalytics {
    let mut order: Vec<&str> = Vec::new();
    let mut by_subject: HashMap<&str, Vec<&GradedResult>> = HashMap::new();
    for r in results {
        by_subject
            .entry(r.subject_id.as_str())
            .or_insert_with(|| {
                order.push(r.subject_id.as_str());
                Vec::new()
            })
            .push(r);
    }

    let mut subjects: Vec<SubjectAnalytics> = Vec::new();
    for subject_id in order {
        let rows = &by_subject[subject_id];
        let n = rows.len();
        let sum: i64 = rows.iter().map(|r| r.percentage).sum();
        let average_score = round_half_up(sum as f64 / n as f64);
        // Subjects averaging zero are treated as not yet assessed.
        if average_score <= 0 {
            continue;
        }
        let passed = rows.iter().filter(|r| r.percentage >= PASS_MARK).count();
        subjects.push(SubjectAnalytics {
            subject_id: subject_id.to_string(),
            subject_name: rows[0].subject_name.clone(),
            result_count: n,
            average_score,
            pass_rate: rate(passed, n),
            grade_distribution: distribution(scale, rows.iter().map(|r| r.grade.as_str())),
        });
    }

    let mut totals = distribution(scale, std::iter::empty::<&str>());
    for s in &subjects {
        for (total, c) in totals.iter_mut().zip(&s.grade_distribution) {
            total.count += c.count;
        }
    }
    let graded: usize = totals.iter().map(|c| c.count).sum();
    let passing: usize = totals
        .iter()
        .filter(|c| scale.is_passing_grade(&c.grade))
        .map(|c| c.count)
        .sum();

    ClassAnalytics {
        subjects,
        overall_pass_rate: rate(passing, graded),
        grade_distribution: totals,
    }
}

pub fn fee_analytics(ledgers: &[FeeLedger]) -> FeeAnalytics {
    let total_expected: f64 = ledgers.iter().map(|l| l.total_fees).sum();
    let total_collected: f64 = ledgers.iter().map(|l| l.paid_amount).sum();
    let collection_rate = if total_expected > 0.0 {
        round_half_up(total_collected / total_expected * 100.0)
    } else {
        0
    };
    FeeAnalytics {
        total_expected,
        total_collected,
        total_outstanding: total_expected - total_collected,
        collection_rate,
    }
}
