use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttendanceError {
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl AttendanceError {
    pub fn code(&self) -> &'static str {
        "bad_params"
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AttendanceError::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Calendar day in `YYYY-MM-DD` form. Shared by attendance and lesson plans.
pub fn parse_day(field: &'static str, raw: &str) -> Result<NaiveDate, AttendanceError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AttendanceError::invalid(field, format!("must be YYYY-MM-DD (got '{}')", raw))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" => Some(AttendanceStatus::Late),
            _ => None,
        }
    }
}

/// One student's mark for a day as sent by the register screen. Unmarked
/// students arrive as present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub date: String,
    #[serde(default)]
    pub status: AttendanceStatus,
}

impl AttendanceMark {
    /// Trimmed copy with the date normalized, or the first problem found.
    pub fn validated(&self) -> Result<AttendanceMark, AttendanceError> {
        let required = [
            ("studentId", &self.student_id),
            ("studentName", &self.student_name),
            ("classId", &self.class_id),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AttendanceError::invalid(*field, "is required"));
        }
        let day = parse_day("date", &self.date)?;
        Ok(AttendanceMark {
            student_id: self.student_id.trim().to_string(),
            student_name: self.student_name.trim().to_string(),
            class_id: self.class_id.trim().to_string(),
            date: day.format("%Y-%m-%d").to_string(),
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub date: String,
    pub status: AttendanceStatus,
    pub marked_by: String,
    pub marked_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTally {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub total: usize,
}

pub fn tally(records: &[AttendanceRecord]) -> AttendanceTally {
    let mut t = AttendanceTally::default();
    for r in records {
        match r.status {
            AttendanceStatus::Present => t.present += 1,
            AttendanceStatus::Absent => t.absent += 1,
            AttendanceStatus::Late => t.late += 1,
        }
        t.total += 1;
    }
    t
}
