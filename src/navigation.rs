use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Parent,
    Student,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "parent" => Some(Role::Parent),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    Dashboard,
    Students,
    Classes,
    Attendance,
    LessonPlans,
    ResultsEntry,
    Transcripts,
    FeeLedger,
    Analytics,
    CsvImport,
    BulkPromotion,
    Assessments,
}

/// Menu order.
pub const SCREENS: [Screen; 12] = [
    Screen::Dashboard,
    Screen::Students,
    Screen::Classes,
    Screen::Attendance,
    Screen::LessonPlans,
    Screen::ResultsEntry,
    Screen::Transcripts,
    Screen::FeeLedger,
    Screen::Analytics,
    Screen::CsvImport,
    Screen::BulkPromotion,
    Screen::Assessments,
];

impl Screen {
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::Students => "Students",
            Screen::Classes => "Classes",
            Screen::Attendance => "Attendance",
            Screen::LessonPlans => "Lesson Plans",
            Screen::ResultsEntry => "Results Entry",
            Screen::Transcripts => "Transcripts",
            Screen::FeeLedger => "Fee Ledger",
            Screen::Analytics => "Analytics",
            Screen::CsvImport => "CSV Import",
            Screen::BulkPromotion => "Bulk Promotion",
            Screen::Assessments => "Assessments",
        }
    }

    pub fn href(&self) -> &'static str {
        match self {
            Screen::Dashboard => "/",
            Screen::Students => "/students",
            Screen::Classes => "/classes",
            Screen::Attendance => "/attendance",
            Screen::LessonPlans => "/lessons",
            Screen::ResultsEntry => "/results/entry",
            Screen::Transcripts => "/results/transcripts",
            Screen::FeeLedger => "/finance/ledger",
            Screen::Analytics => "/analytics",
            Screen::CsvImport => "/admin/import",
            Screen::BulkPromotion => "/admin/promotion",
            Screen::Assessments => "/admin/assessments",
        }
    }

    pub fn visible_to(&self, role: Role) -> bool {
        use Role::*;
        match self {
            Screen::Dashboard => matches!(role, Admin | Teacher | Parent),
            Screen::Students
            | Screen::Classes
            | Screen::Attendance
            | Screen::LessonPlans
            | Screen::ResultsEntry => matches!(role, Admin | Teacher),
            Screen::Transcripts => matches!(role, Admin | Teacher | Parent),
            Screen::FeeLedger => matches!(role, Admin | Parent),
            Screen::Analytics
            | Screen::CsvImport
            | Screen::BulkPromotion
            | Screen::Assessments => matches!(role, Admin),
        }
    }
}

pub fn menu_for(role: Role) -> Vec<Screen> {
    SCREENS.iter().copied().filter(|s| s.visible_to(role)).collect()
}
