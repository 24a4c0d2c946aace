use crate::attendance::{parse_day, AttendanceError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanDraft {
    pub title: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub content: String,
    pub class_id: String,
    pub subject_id: String,
    pub date: String,
    pub teacher_id: String,
    #[serde(default)]
    pub teacher_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub id: String,
    pub title: String,
    pub objective: String,
    pub content: String,
    pub class_id: String,
    pub subject_id: String,
    pub date: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub created_at: String,
}

impl LessonPlanDraft {
    pub fn into_plan(self, id: String, created_at: String) -> Result<LessonPlan, AttendanceError> {
        let required = [
            ("title", &self.title),
            ("classId", &self.class_id),
            ("subjectId", &self.subject_id),
            ("teacherId", &self.teacher_id),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AttendanceError::invalid(*field, "is required"));
        }
        let day = parse_day("date", &self.date)?;
        Ok(LessonPlan {
            id,
            title: self.title.trim().to_string(),
            objective: self.objective.trim().to_string(),
            content: self.content,
            class_id: self.class_id.trim().to_string(),
            subject_id: self.subject_id.trim().to_string(),
            date: day.format("%Y-%m-%d").to_string(),
            teacher_id: self.teacher_id.trim().to_string(),
            teacher_name: self.teacher_name.trim().to_string(),
            created_at,
        })
    }
}
