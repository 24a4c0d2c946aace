use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::navigation::{menu_for, Role};
use serde_json::json;

fn handle_menu(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("role").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing role", None);
    };
    let Some(role) = Role::parse(raw) else {
        return err(
            &req.id,
            "bad_params",
            "role must be one of: admin, teacher, parent, student",
            Some(json!({ "role": raw })),
        );
    };

    let items: Vec<serde_json::Value> = menu_for(role)
        .into_iter()
        .map(|s| {
            json!({
                "key": s,
                "title": s.title(),
                "href": s.href(),
            })
        })
        .collect();
    ok(&req.id, json!({ "role": role, "items": items }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "navigation.menu" => Some(handle_menu(state, req)),
        _ => None,
    }
}
