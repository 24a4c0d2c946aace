mod test_support;

use serde_json::json;
use test_support::{open_workspace, request_err_code, request_ok, spawn_sidecar};

#[test]
fn evaluate_grade_and_gpa_follow_the_ecz_bands() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let eval = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grading.evaluate",
        json!({ "marks": 59, "maxMarks": 79 }),
    );
    // 74.68 rounds to 75
    assert_eq!(eval.get("percentage").and_then(|v| v.as_i64()), Some(75));
    assert_eq!(eval.get("grade").and_then(|v| v.as_str()), Some("Merit"));
    assert_eq!(eval.get("points").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(
        eval.get("comment").and_then(|v| v.as_str()),
        Some("Outstanding work")
    );

    for (pct, grade) in [
        (80, "Distinction"),
        (79, "Merit"),
        (60, "Credit"),
        (50, "Pass"),
        (49, "Fail"),
    ] {
        let g = request_ok(
            &mut stdin,
            &mut reader,
            &format!("g{}", pct),
            "grading.grade",
            json!({ "percentage": pct }),
        );
        assert_eq!(g.get("grade").and_then(|v| v.as_str()), Some(grade), "pct {}", pct);
        assert_eq!(g.get("matched").and_then(|v| v.as_bool()), Some(true));
    }

    let out_of_range = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grading.grade",
        json!({ "percentage": 105 }),
    );
    assert_eq!(out_of_range.get("grade").and_then(|v| v.as_str()), Some("Fail"));
    assert_eq!(out_of_range.get("matched").and_then(|v| v.as_bool()), Some(false));

    let gpa = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grading.gpa",
        json!({ "percentages": [90, { "percentage": 81 }, 70] }),
    );
    assert_eq!(gpa.get("averagePoints").and_then(|v| v.as_f64()), Some(1.33));
    assert_eq!(gpa.get("subjectCount").and_then(|v| v.as_u64()), Some(3));

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grading.gpa",
        json!({ "percentages": [] }),
    );
    assert_eq!(empty.get("averagePoints").and_then(|v| v.as_f64()), Some(0.0));

    for (id, params) in [
        ("e1", json!({ "marks": 10, "maxMarks": 0 })),
        ("e2", json!({ "marks": -1, "maxMarks": 10 })),
        ("e3", json!({ "marks": 11, "maxMarks": 10 })),
    ] {
        let code = request_err_code(&mut stdin, &mut reader, id, "grading.evaluate", params);
        assert_eq!(code, "invalid_input");
    }
}

#[test]
fn workspace_scale_override_set_and_reset() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = open_workspace(&mut stdin, &mut reader, "schoold-scale");

    let got = request_ok(&mut stdin, &mut reader, "1", "grading.scale.get", json!({}));
    assert_eq!(got.get("source").and_then(|v| v.as_str()), Some("default"));
    assert_eq!(got.get("bands").and_then(|v| v.as_array()).map(|a| a.len()), Some(5));

    let bands = json!([
        { "grade": "A", "minScore": 75, "maxScore": 100, "points": 1, "comment": "Excellent" },
        { "grade": "B", "minScore": 40, "maxScore": 74, "points": 2, "comment": "Fair" },
        { "grade": "F", "minScore": 0, "maxScore": 39, "points": 9, "comment": "Retake" }
    ]);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grading.scale.set",
        json!({ "bands": bands }),
    );
    let got = request_ok(&mut stdin, &mut reader, "3", "grading.scale.get", json!({}));
    assert_eq!(got.get("source").and_then(|v| v.as_str()), Some("workspace"));

    let g = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grading.grade",
        json!({ "percentage": 45 }),
    );
    assert_eq!(g.get("grade").and_then(|v| v.as_str()), Some("B"));

    // Gap between 60 and 49.
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "grading.scale.set",
        json!({ "bands": [
            { "grade": "A", "minScore": 60, "maxScore": 100, "points": 1, "comment": "x" },
            { "grade": "F", "minScore": 0, "maxScore": 49, "points": 9, "comment": "y" }
        ] }),
    );
    assert_eq!(code, "invalid_scale");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "5b",
        "grading.scale.set",
        json!({ "bands": [
            {
                "grade": "A",
                "minScore": 50,
                "maxScore": 100,
                "points": i64::MAX / 2 + 1,
                "comment": "x"
            },
            { "grade": "F", "minScore": 0, "maxScore": 49, "points": 9, "comment": "y" }
        ] }),
    );
    assert_eq!(code, "invalid_scale");
    // The rejected scale never replaced the stored one.
    let gpa = request_ok(
        &mut stdin,
        &mut reader,
        "5c",
        "grading.gpa",
        json!({ "percentages": [90, 90] }),
    );
    assert_eq!(gpa.get("averagePoints").and_then(|v| v.as_f64()), Some(1.0));

    let _ = request_ok(&mut stdin, &mut reader, "6", "grading.scale.reset", json!({}));
    let got = request_ok(&mut stdin, &mut reader, "7", "grading.scale.get", json!({}));
    assert_eq!(got.get("source").and_then(|v| v.as_str()), Some("default"));
    let g = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "grading.grade",
        json!({ "percentage": 45 }),
    );
    assert_eq!(g.get("grade").and_then(|v| v.as_str()), Some("Fail"));
}
