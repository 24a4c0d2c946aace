use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subject totals at or above this percentage count as a pass.
pub const PASS_MARK: i64 = 50;

/// Upper bound for band points in a custom scale.
pub const MAX_BAND_POINTS: i64 = 100;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid grade scale: {0}")]
    InvalidScale(String),
}

impl GradingError {
    pub fn code(&self) -> &'static str {
        match self {
            GradingError::InvalidInput(_) => "invalid_input",
            GradingError::InvalidScale(_) => "invalid_scale",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub grade: String,
    pub min_score: i64,
    pub max_score: i64,
    pub points: i64,
    pub comment: String,
}

impl GradeBand {
    fn new(grade: &str, min_score: i64, max_score: i64, points: i64, comment: &str) -> Self {
        Self {
            grade: grade.to_string(),
            min_score,
            max_score,
            points,
            comment: comment.to_string(),
        }
    }

    pub fn contains(&self, percentage: i64) -> bool {
        percentage >= self.min_score && percentage <= self.max_score
    }
}

/// Ordered best-to-worst table of grade bands covering every integer in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GradeScale {
    bands: Vec<GradeBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkEvaluation {
    pub percentage: i64,
    pub grade: String,
    pub comment: String,
    pub points: i64,
}

/// `Math.round`-style rounding: halves go up.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn calculate_percentage(marks: i64, max_marks: i64) -> Result<i64, GradingError> {
    if max_marks <= 0 {
        return Err(GradingError::InvalidInput(format!(
            "maxMarks must be > 0 (got {max_marks})"
        )));
    }
    if marks < 0 {
        return Err(GradingError::InvalidInput(format!(
            "marks cannot be negative (got {marks})"
        )));
    }
    if marks > max_marks {
        return Err(GradingError::InvalidInput(format!(
            "marks {marks} exceed maxMarks {max_marks}"
        )));
    }
    Ok(round_half_up((marks as f64 / max_marks as f64) * 100.0))
}

impl Default for GradeScale {
    fn default() -> Self {
        Self::ecz()
    }
}

impl GradeScale {
    /// Examinations Council of Zambia convention. Lower points are better.
    pub fn ecz() -> Self {
        Self {
            bands: vec![
                GradeBand::new("Distinction", 80, 100, 1, "Exemplary performance"),
                GradeBand::new("Merit", 70, 79, 2, "Outstanding work"),
                GradeBand::new("Credit", 60, 69, 3, "Good achievement"),
                GradeBand::new("Pass", 50, 59, 4, "Satisfactory progress"),
                GradeBand::new("Fail", 0, 49, 9, "Needs improvement"),
            ],
        }
    }

    pub fn new(bands: Vec<GradeBand>) -> Result<Self, GradingError> {
        let Some(first) = bands.first() else {
            return Err(GradingError::InvalidScale("scale has no bands".into()));
        };
        if first.max_score != 100 {
            return Err(GradingError::InvalidScale(format!(
                "first band '{}' must end at 100",
                first.grade
            )));
        }
        for (i, band) in bands.iter().enumerate() {
            if band.grade.trim().is_empty() {
                return Err(GradingError::InvalidScale(format!("band {i} has no grade")));
            }
            if !(0..=MAX_BAND_POINTS).contains(&band.points) {
                return Err(GradingError::InvalidScale(format!(
                    "band '{}' points must be between 0 and {}",
                    band.grade, MAX_BAND_POINTS
                )));
            }
            if band.min_score > band.max_score {
                return Err(GradingError::InvalidScale(format!(
                    "band '{}' has minScore above maxScore",
                    band.grade
                )));
            }
            if let Some(next) = bands.get(i + 1) {
                if next.max_score != band.min_score - 1 {
                    return Err(GradingError::InvalidScale(format!(
                        "bands '{}' and '{}' are not contiguous",
                        band.grade, next.grade
                    )));
                }
            }
        }
        let last = &bands[bands.len() - 1];
        if last.min_score != 0 {
            return Err(GradingError::InvalidScale(format!(
                "last band '{}' must start at 0",
                last.grade
            )));
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    /// Worst band; used when a percentage matches nothing.
    pub fn fallback(&self) -> &GradeBand {
        &self.bands[self.bands.len() - 1]
    }

    pub fn band_for(&self, percentage: i64) -> Option<&GradeBand> {
        self.bands.iter().find(|b| b.contains(percentage))
    }

    pub fn calculate_grade(&self, percentage: i64) -> &GradeBand {
        match self.band_for(percentage) {
            Some(band) => band,
            None => {
                let fallback = self.fallback();
                tracing::warn!(
                    percentage,
                    fallback = %fallback.grade,
                    "percentage outside every grade band"
                );
                fallback
            }
        }
    }

    pub fn calculate_points(&self, percentage: i64) -> i64 {
        self.calculate_grade(percentage).points
    }

    /// Mean points across subjects, 2 decimals. Smaller is better.
    pub fn calculate_gpa<I>(&self, percentages: I) -> f64
    where
        I: IntoIterator<Item = i64>,
    {
        let mut total: i64 = 0;
        let mut count: usize = 0;
        for p in percentages {
            total += self.calculate_points(p);
            count += 1;
        }
        if count == 0 {
            return 0.0;
        }
        round_2_decimals(total as f64 / count as f64)
    }

    pub fn evaluate(&self, marks: i64, max_marks: i64) -> Result<MarkEvaluation, GradingError> {
        let percentage = calculate_percentage(marks, max_marks)?;
        Ok(self.describe(percentage))
    }

    pub fn describe(&self, percentage: i64) -> MarkEvaluation {
        let band = self.calculate_grade(percentage);
        MarkEvaluation {
            percentage,
            grade: band.grade.clone(),
            comment: band.comment.clone(),
            points: band.points,
        }
    }

    /// True for every band except the fallback one.
    pub fn is_passing_grade(&self, grade: &str) -> bool {
        let fallback = self.fallback();
        self.bands
            .iter()
            .any(|b| b.grade == grade && b.grade != fallback.grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(calculate_percentage(75, 100), Ok(75));
        assert_eq!(calculate_percentage(33, 50), Ok(66));
        assert_eq!(calculate_percentage(28, 30), Ok(93));
        assert_eq!(calculate_percentage(1, 8), Ok(13));
        assert_eq!(calculate_percentage(0, 7), Ok(0));
        assert_eq!(calculate_percentage(7, 7), Ok(100));
    }

    #[test]
    fn percentage_rejects_out_of_domain_input() {
        for (m, max) in [(5, 0), (0, -3), (-1, 10), (11, 10)] {
            let e = calculate_percentage(m, max).expect_err("should fail");
            assert_eq!(e.code(), "invalid_input");
        }
    }

    #[test]
    fn percentage_is_bounded_and_monotonic() {
        for max in 1..=60 {
            let mut prev = -1;
            for m in 0..=max {
                let p = calculate_percentage(m, max).expect("valid");
                assert!((0..=100).contains(&p));
                assert!(p >= prev, "{m}/{max} went down");
                prev = p;
            }
        }
    }

    #[test]
    fn grade_boundaries_follow_ecz_table() {
        let scale = GradeScale::ecz();
        let cases = [
            (0, "Fail"),
            (49, "Fail"),
            (50, "Pass"),
            (59, "Pass"),
            (60, "Credit"),
            (69, "Credit"),
            (70, "Merit"),
            (79, "Merit"),
            (80, "Distinction"),
            (100, "Distinction"),
        ];
        for (p, expected) in cases {
            assert_eq!(scale.calculate_grade(p).grade, expected, "percentage {p}");
        }
    }

    #[test]
    fn points_invert_the_grade_ranking() {
        let scale = GradeScale::ecz();
        assert_eq!(scale.calculate_points(90), 1);
        assert_eq!(scale.calculate_points(75), 2);
        assert_eq!(scale.calculate_points(65), 3);
        assert_eq!(scale.calculate_points(55), 4);
        assert_eq!(scale.calculate_points(10), 9);
    }

    #[test]
    fn out_of_range_percentages_fall_back_to_fail() {
        let scale = GradeScale::ecz();
        for p in [-1, 101, 250] {
            let band = scale.calculate_grade(p);
            assert_eq!(band.grade, "Fail");
            assert_eq!(band.comment, "Needs improvement");
            assert_eq!(scale.calculate_points(p), 9);
        }
    }

    #[test]
    fn gpa_is_mean_points() {
        let scale = GradeScale::ecz();
        assert_eq!(scale.calculate_gpa(Vec::<i64>::new()), 0.0);
        assert_eq!(scale.calculate_gpa([85, 45]), 5.0);
        assert_eq!(scale.calculate_gpa([85, 72, 61]), 2.0);
        // (1 + 1 + 2) / 3
        assert_eq!(scale.calculate_gpa([90, 81, 70]), 1.33);
    }

    #[test]
    fn evaluate_scenarios() {
        let scale = GradeScale::ecz();
        let e = scale.evaluate(75, 100).expect("evaluate");
        assert_eq!(e.percentage, 75);
        assert_eq!(e.grade, "Merit");
        assert_eq!(e.comment, "Outstanding work");

        let e = scale.evaluate(33, 50).expect("evaluate");
        assert_eq!(e.percentage, 66);
        assert_eq!(e.grade, "Credit");
        assert_eq!(e.comment, "Good achievement");
    }

    #[test]
    fn ecz_scale_passes_its_own_validation() {
        let bands = GradeScale::ecz().bands().to_vec();
        assert_eq!(GradeScale::new(bands), Ok(GradeScale::ecz()));
    }

    #[test]
    fn scale_validation_rejects_gaps_and_partial_coverage() {
        let mut gap = GradeScale::ecz().bands().to_vec();
        gap[1].min_score = 71;
        assert!(GradeScale::new(gap).is_err());

        let mut short = GradeScale::ecz().bands().to_vec();
        short.pop();
        assert!(GradeScale::new(short).is_err());

        let mut top = GradeScale::ecz().bands().to_vec();
        top[0].max_score = 99;
        assert!(GradeScale::new(top).is_err());

        assert!(GradeScale::new(Vec::new()).is_err());
    }

    #[test]
    fn scale_validation_bounds_band_points() {
        let huge = vec![
            GradeBand::new("A", 50, 100, i64::MAX / 2 + 1, "Top"),
            GradeBand::new("F", 0, 49, 9, "Retake"),
        ];
        assert!(matches!(
            GradeScale::new(huge),
            Err(GradingError::InvalidScale(_))
        ));

        let mut negative = GradeScale::ecz().bands().to_vec();
        negative[2].points = -1;
        assert!(GradeScale::new(negative).is_err());

        let mut widest = GradeScale::ecz().bands().to_vec();
        widest[4].points = MAX_BAND_POINTS;
        let scale = GradeScale::new(widest).expect("points at the bound are accepted");
        assert_eq!(scale.calculate_gpa([10, 10]), 100.0);
    }

    #[test]
    fn passing_grades_exclude_the_fallback_band() {
        let scale = GradeScale::ecz();
        assert!(scale.is_passing_grade("Pass"));
        assert!(scale.is_passing_grade("Distinction"));
        assert!(!scale.is_passing_grade("Fail"));
        assert!(!scale.is_passing_grade("A+"));
    }
}
