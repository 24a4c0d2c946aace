mod test_support;

use serde_json::json;
use test_support::{request_err_code, request_ok, spawn_sidecar};

fn menu_keys(menu: &serde_json::Value) -> Vec<String> {
    menu.get("items")
        .and_then(|v| v.as_array())
        .expect("items")
        .iter()
        .filter_map(|i| i.get("key").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .collect()
}

#[test]
fn menus_are_filtered_by_role() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let admin = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "navigation.menu",
        json!({ "role": "admin" }),
    );
    assert_eq!(menu_keys(&admin).len(), 12);

    let parent = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "navigation.menu",
        json!({ "role": "Parent" }),
    );
    assert_eq!(parent.get("role").and_then(|v| v.as_str()), Some("parent"));
    assert_eq!(menu_keys(&parent), vec!["dashboard", "transcripts", "feeLedger"]);
    assert_eq!(
        parent.pointer("/items/1/title").and_then(|v| v.as_str()),
        Some("Transcripts")
    );

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "navigation.menu",
        json!({ "role": "student" }),
    );
    assert!(menu_keys(&student).is_empty());

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "navigation.menu",
        json!({ "role": "janitor" }),
    );
    assert_eq!(code, "bad_params");
}
