pub mod analytics;
pub mod assessments;
pub mod attendance;
pub mod core;
pub mod fees;
pub mod grading;
pub mod lessons;
pub mod navigation;
pub mod results;
pub mod transcripts;
