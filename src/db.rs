use crate::grading::{GradeBand, GradeScale};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE: &str = "school.sqlite3";
pub const GRADE_SCALE_KEY: &str = "grading.scale";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_types(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL,
            weightage INTEGER NOT NULL,
            max_marks INTEGER NOT NULL,
            is_active INTEGER NOT NULL,
            sort_order INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assessment_types_order ON assessment_types(sort_order)",
        [],
    )?;

    // percentage/grade/comment are written once per save and never recomputed on read.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS results(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            ecz_number TEXT NOT NULL,
            class_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            subject_name TEXT NOT NULL,
            assessment_type_id TEXT NOT NULL,
            assessment_type_name TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            term TEXT NOT NULL,
            marks INTEGER NOT NULL,
            max_marks INTEGER NOT NULL,
            percentage INTEGER NOT NULL,
            grade TEXT NOT NULL,
            comment TEXT NOT NULL,
            entered_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(student_id, subject_id, assessment_type_id, academic_year, term)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_class_term ON results(class_id, academic_year, term)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_student_term ON results(student_id, academic_year, term)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fee_ledgers(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            class_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            term TEXT NOT NULL,
            total_fees REAL NOT NULL,
            paid_amount REAL NOT NULL,
            balance REAL NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fee_ledgers_class ON fee_ledgers(class_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS fee_payments(
            id TEXT PRIMARY KEY,
            ledger_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            amount REAL NOT NULL,
            payment_date TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            receipt_number TEXT NOT NULL,
            received_by TEXT NOT NULL,
            FOREIGN KEY(ledger_id) REFERENCES fee_ledgers(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fee_payments_ledger ON fee_payments(ledger_id, seq)",
        [],
    )?;

    // One mark per student, class and day; re-marking replaces it.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            class_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            marked_by TEXT NOT NULL,
            marked_at TEXT NOT NULL,
            UNIQUE(student_id, class_id, date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_class_date ON attendance(class_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lesson_plans(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            objective TEXT NOT NULL,
            content TEXT NOT NULL,
            class_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            date TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            teacher_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lesson_plans_teacher ON lesson_plans(teacher_id, date)",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

/// Workspace grade scale; falls back to ECZ when unset or unusable.
pub fn load_grade_scale(conn: &Connection) -> anyhow::Result<GradeScale> {
    let Some(value) = settings_get_json(conn, GRADE_SCALE_KEY)? else {
        return Ok(GradeScale::ecz());
    };
    let parsed = serde_json::from_value::<Vec<GradeBand>>(value)
        .map_err(|e| e.to_string())
        .and_then(|bands| GradeScale::new(bands).map_err(|e| e.to_string()));
    match parsed {
        Ok(scale) => Ok(scale),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring stored grade scale");
            Ok(GradeScale::ecz())
        }
    }
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ))
    }

    #[test]
    fn grade_scale_defaults_to_ecz_when_unset() {
        let conn = open_db(&temp_workspace("schoold-db-unset")).expect("open db");
        assert_eq!(load_grade_scale(&conn).expect("load"), GradeScale::ecz());
    }

    #[test]
    fn unusable_stored_grade_scale_is_ignored() {
        let conn = open_db(&temp_workspace("schoold-db-bad-scale")).expect("open db");

        // 60..100 then 0..49 leaves 50..59 uncovered.
        let gap = json!([
            { "grade": "A", "minScore": 60, "maxScore": 100, "points": 1, "comment": "x" },
            { "grade": "F", "minScore": 0, "maxScore": 49, "points": 9, "comment": "y" }
        ]);
        settings_set_json(&conn, GRADE_SCALE_KEY, &gap).expect("store scale");
        assert_eq!(load_grade_scale(&conn).expect("load"), GradeScale::ecz());

        settings_set_json(&conn, GRADE_SCALE_KEY, &json!({ "not": "bands" })).expect("store");
        assert_eq!(load_grade_scale(&conn).expect("load"), GradeScale::ecz());
    }

    #[test]
    fn valid_stored_grade_scale_is_used() {
        let conn = open_db(&temp_workspace("schoold-db-good-scale")).expect("open db");
        let bands = json!([
            { "grade": "P", "minScore": 40, "maxScore": 100, "points": 1, "comment": "Pass" },
            { "grade": "F", "minScore": 0, "maxScore": 39, "points": 9, "comment": "Fail" }
        ]);
        settings_set_json(&conn, GRADE_SCALE_KEY, &bands).expect("store scale");

        let scale = load_grade_scale(&conn).expect("load");
        assert_eq!(scale.bands().len(), 2);
        assert_eq!(scale.calculate_grade(45).grade, "P");
    }
}
