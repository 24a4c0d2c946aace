use crate::db;
use crate::grading::GradeScale;
use crate::ipc::error::err;
use crate::ipc::types::AppState;
use rusqlite::Connection;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn db_err(code: &'static str) -> impl Fn(rusqlite::Error) -> HandlerErr {
    move |e| HandlerErr::new(code, e.to_string())
}

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// Scale used for new snapshots: the workspace override if one is open, else ECZ.
pub fn current_scale(state: &AppState) -> Result<GradeScale, HandlerErr> {
    match state.db.as_ref() {
        Some(conn) => db::load_grade_scale(conn)
            .map_err(|e| HandlerErr::new("db_query_failed", e.to_string())),
        None => Ok(GradeScale::ecz()),
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))?;
    if v.is_empty() {
        return Err(HandlerErr::new(
            "bad_params",
            format!("{} must not be empty", key),
        ));
    }
    Ok(v)
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Err(HandlerErr::new("bad_params", format!("missing {}", key)));
    };
    v.as_i64().ok_or_else(|| {
        HandlerErr::new("bad_params", format!("{} must be an integer", key))
            .with_details(json!({ key: v }))
    })
}

pub fn parse_params<T: serde::de::DeserializeOwned>(
    value: &serde_json::Value,
    what: &str,
) -> Result<T, HandlerErr> {
    serde_json::from_value(value.clone())
        .map_err(|e| HandlerErr::new("bad_params", format!("invalid {}: {}", what, e)))
}
