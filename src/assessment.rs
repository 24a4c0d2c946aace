use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentError {
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl AssessmentError {
    pub fn code(&self) -> &'static str {
        "bad_params"
    }

    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AssessmentError::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// A configurable category of graded work (CA, midterm, end of term, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentType {
    pub id: String,
    pub name: String,
    pub code: String,
    pub weightage: i64,
    pub max_marks: i64,
    pub is_active: bool,
    pub order: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentTypePatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub weightage: Option<i64>,
    pub max_marks: Option<i64>,
    pub is_active: Option<bool>,
    pub order: Option<i64>,
}

impl AssessmentType {
    pub fn validate(&self) -> Result<(), AssessmentError> {
        let name_len = self.name.trim().chars().count();
        if name_len < 2 {
            return Err(AssessmentError::invalid(
                "name",
                "must be at least 2 characters",
            ));
        }
        let code_len = self.code.trim().chars().count();
        if code_len < 2 {
            return Err(AssessmentError::invalid(
                "code",
                "must be at least 2 characters",
            ));
        }
        if code_len > 10 {
            return Err(AssessmentError::invalid(
                "code",
                "must be at most 10 characters",
            ));
        }
        if !(0..=100).contains(&self.weightage) {
            return Err(AssessmentError::invalid(
                "weightage",
                "must be between 0 and 100",
            ));
        }
        if self.max_marks < 1 {
            return Err(AssessmentError::invalid("maxMarks", "must be at least 1"));
        }
        if self.order < 1 {
            return Err(AssessmentError::invalid("order", "must be at least 1"));
        }
        Ok(())
    }

    pub fn apply_patch(&self, patch: AssessmentTypePatch) -> Result<Self, AssessmentError> {
        let next = Self {
            id: self.id.clone(),
            name: patch
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| self.name.clone()),
            code: patch
                .code
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| self.code.clone()),
            weightage: patch.weightage.unwrap_or(self.weightage),
            max_marks: patch.max_marks.unwrap_or(self.max_marks),
            is_active: patch.is_active.unwrap_or(self.is_active),
            order: patch.order.unwrap_or(self.order),
        };
        next.validate()?;
        Ok(next)
    }
}

/// Active types in display order; ties keep their input order.
pub fn active_in_order(types: &[AssessmentType]) -> Vec<&AssessmentType> {
    let mut active: Vec<&AssessmentType> = types.iter().filter(|t| t.is_active).collect();
    active.sort_by_key(|t| t.order);
    active
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightageStatus {
    Balanced,
    Under,
    Over,
    Unconfigured,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightageCheck {
    pub total_weightage: i64,
    pub active_count: usize,
    pub status: WeightageStatus,
}

/// Flags active weightages that do not add up to 100. Advisory only.
pub fn weightage_check(types: &[AssessmentType]) -> WeightageCheck {
    let active = active_in_order(types);
    let total: i64 = active.iter().map(|t| t.weightage).sum();
    let status = if active.is_empty() {
        WeightageStatus::Unconfigured
    } else if total == 100 {
        WeightageStatus::Balanced
    } else if total > 100 {
        WeightageStatus::Over
    } else {
        WeightageStatus::Under
    };
    WeightageCheck {
        total_weightage: total,
        active_count: active.len(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: &str, weightage: i64, order: i64, is_active: bool) -> AssessmentType {
        AssessmentType {
            id: id.to_string(),
            name: format!("Assessment {id}"),
            code: id.to_uppercase(),
            weightage,
            max_marks: 100,
            is_active,
            order,
        }
    }

    #[test]
    fn active_types_sorted_by_order() {
        let types = vec![
            at("exam", 50, 3, true),
            at("ca", 30, 1, true),
            at("old", 10, 2, false),
            at("mid", 20, 2, true),
        ];
        let ids: Vec<&str> = active_in_order(&types).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["ca", "mid", "exam"]);
    }

    #[test]
    fn weightage_check_statuses() {
        let balanced = vec![at("ca", 30, 1, true), at("mid", 20, 2, true), at("exam", 50, 3, true)];
        let c = weightage_check(&balanced);
        assert_eq!(c.status, WeightageStatus::Balanced);
        assert_eq!(c.total_weightage, 100);
        assert_eq!(c.active_count, 3);

        let under = vec![at("ca", 30, 1, true), at("exam", 50, 2, true), at("x", 40, 3, false)];
        assert_eq!(weightage_check(&under).status, WeightageStatus::Under);

        let over = vec![at("ca", 60, 1, true), at("exam", 50, 2, true)];
        assert_eq!(weightage_check(&over).status, WeightageStatus::Over);

        let none = vec![at("ca", 60, 1, false)];
        let c = weightage_check(&none);
        assert_eq!(c.status, WeightageStatus::Unconfigured);
        assert_eq!(c.total_weightage, 0);
    }

    #[test]
    fn validation_mirrors_form_rules() {
        assert!(at("ca", 30, 1, true).validate().is_ok());

        let mut t = at("ca", 30, 1, true);
        t.name = "A".into();
        assert!(t.validate().is_err());

        let mut t = at("ca", 30, 1, true);
        t.code = "VERYLONGCODE".into();
        assert!(t.validate().is_err());

        assert!(at("ca", 101, 1, true).validate().is_err());
        assert!(at("ca", -1, 1, true).validate().is_err());
        assert!(at("ca", 30, 0, true).validate().is_err());

        let mut t = at("ca", 30, 1, true);
        t.max_marks = 0;
        assert!(t.validate().is_err());
    }

    #[test]
    fn patch_is_revalidated() {
        let t = at("ca", 30, 1, true);
        let patched = t
            .apply_patch(AssessmentTypePatch {
                weightage: Some(40),
                ..Default::default()
            })
            .expect("patch");
        assert_eq!(patched.weightage, 40);
        assert_eq!(patched.name, t.name);

        let bad = t.apply_patch(AssessmentTypePatch {
            max_marks: Some(0),
            ..Default::default()
        });
        assert!(bad.is_err());
    }

    #[test]
    fn patched_name_and_code_are_trimmed() {
        let t = at("ca", 30, 1, true);
        let patched = t
            .apply_patch(AssessmentTypePatch {
                name: Some("  Mid Term ".into()),
                code: Some(" MT ".into()),
                ..Default::default()
            })
            .expect("patch");
        assert_eq!(patched.name, "Mid Term");
        assert_eq!(patched.code, "MT");

        let blank = t.apply_patch(AssessmentTypePatch {
            code: Some("  X  ".into()),
            ..Default::default()
        });
        assert!(blank.is_err());
    }
}
