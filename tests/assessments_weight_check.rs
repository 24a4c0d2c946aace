mod test_support;

use serde_json::json;
use test_support::{
    create_assessment_type, open_workspace, request_err_code, request_ok, spawn_sidecar,
};

#[test]
fn weight_check_tracks_active_weightages() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_workspace(&mut stdin, &mut reader, "schoold-assessments");

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "assessmentTypes.weightCheck",
        json!({}),
    );
    assert_eq!(empty.get("status").and_then(|v| v.as_str()), Some("unconfigured"));

    let _exam = create_assessment_type(&mut stdin, &mut reader, "2", "EXAM", 50, 3);
    let ca = create_assessment_type(&mut stdin, &mut reader, "3", "CA", 30, 1);
    let check = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assessmentTypes.weightCheck",
        json!({}),
    );
    assert_eq!(check.get("totalWeightage").and_then(|v| v.as_i64()), Some(80));
    assert_eq!(check.get("status").and_then(|v| v.as_str()), Some("under"));

    let mid = create_assessment_type(&mut stdin, &mut reader, "5", "MID", 20, 2);
    let listed = request_ok(&mut stdin, &mut reader, "6", "assessmentTypes.list", json!({}));
    let codes: Vec<&str> = listed
        .get("assessmentTypes")
        .and_then(|v| v.as_array())
        .expect("assessmentTypes")
        .iter()
        .filter_map(|t| t.get("code").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(codes, vec!["CA", "MID", "EXAM"]);
    assert_eq!(
        listed.pointer("/weightCheck/status").and_then(|v| v.as_str()),
        Some("balanced")
    );

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "assessmentTypes.update",
        json!({ "assessmentTypeId": mid, "patch": { "weightage": 40, "code": " MT " } }),
    );
    assert_eq!(
        updated.pointer("/assessmentType/weightage").and_then(|v| v.as_i64()),
        Some(40)
    );
    assert_eq!(
        updated.pointer("/assessmentType/code").and_then(|v| v.as_str()),
        Some("MT")
    );
    assert_eq!(
        updated.pointer("/weightCheck/status").and_then(|v| v.as_str()),
        Some("over")
    );

    let deactivated = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "assessmentTypes.deactivate",
        json!({ "assessmentTypeId": ca }),
    );
    assert_eq!(
        deactivated.pointer("/weightCheck/totalWeightage").and_then(|v| v.as_i64()),
        Some(90)
    );

    let active_only = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "assessmentTypes.list",
        json!({ "includeInactive": false }),
    );
    assert_eq!(
        active_only
            .get("assessmentTypes")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(2)
    );
}

#[test]
fn invalid_assessment_types_are_rejected() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_workspace(&mut stdin, &mut reader, "schoold-assessments-invalid");

    let valid = json!({
        "name": "Test",
        "code": "CA",
        "weightage": 30,
        "maxMarks": 100,
        "order": 1
    });
    for (id, field, value) in [
        ("1", "name", json!("X")),
        ("2", "code", json!("C")),
        ("3", "weightage", json!(101)),
        ("4", "maxMarks", json!(0)),
        ("5", "order", json!(0)),
    ] {
        let mut params = valid.clone();
        params[field] = value;
        let code = request_err_code(
            &mut stdin,
            &mut reader,
            id,
            "assessmentTypes.create",
            params,
        );
        assert_eq!(code, "bad_params", "field {}", field);
    }

    let ca = create_assessment_type(&mut stdin, &mut reader, "6", "CA", 30, 1);
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "7",
        "assessmentTypes.update",
        json!({ "assessmentTypeId": ca, "patch": { "weightage": -5 } }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "8",
        "assessmentTypes.deactivate",
        json!({ "assessmentTypeId": "missing" }),
    );
    assert_eq!(code, "not_found");
}
