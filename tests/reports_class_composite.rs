use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_cbcgraded");
    let mut child = Command::new(exe)
        .env_remove("CBCGRADE_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn cbcgraded");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn five_level() -> serde_json::Value {
    json!({
        "id": "cbc-5",
        "bands": [
            { "level": "NY", "minPercentage": 0, "maxPercentage": 24, "points": 0 },
            { "level": "BE", "minPercentage": 25, "maxPercentage": 49, "points": 1 },
            { "level": "AE", "minPercentage": 50, "maxPercentage": 74, "points": 2 },
            { "level": "ME", "minPercentage": 75, "maxPercentage": 89, "points": 3 },
            { "level": "EE", "minPercentage": 90, "maxPercentage": 100, "points": 4 }
        ]
    })
}

fn row<'a>(report: &'a serde_json::Value, learner_id: &str) -> &'a serde_json::Value {
    report["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .find(|r| r["learnerId"] == learner_id)
        .expect("row for learner")
}

#[test]
fn class_report_grades_each_learner_and_isolates_failures() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "scales.register",
        json!({ "scale": five_level() }),
    );

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.classComposite",
        json!({
            "scaleId": "cbc-5",
            "weights": { "formative": 0.6, "summative": 0.4 },
            "learners": [
                { "learnerId": "L1", "displayName": "Achieng", "formativeAverage": 85, "summativeScore": 90 },
                { "learnerId": "L2", "formativeEntries": [
                    { "rawScore": 8, "maxScore": 10 },
                    { "rawScore": 17, "maxScore": 20 }
                  ], "summativeEntry": { "rawScore": 46, "maxScore": 50 } },
                { "learnerId": "L3", "formativeEntries": [{ "rawScore": 5, "maxScore": 0 }], "summativeScore": 70 },
                { "learnerId": "L4", "summativeScore": 70 },
                { "learnerId": "L5", "formativeAverage": 20, "summativeScore": 10 }
            ]
        }),
    );

    let l1 = row(&report, "L1");
    assert_eq!(l1["status"], "graded");
    assert_eq!(l1["displayName"], "Achieng");
    assert_eq!(l1["result"]["weightedScore"], 87.0);
    assert_eq!(l1["result"]["level"], "ME");

    // (80 + 85) / 2 = 82.5 -> 83; 46/50 = 92; 83*0.6 + 92*0.4 = 86.6 -> 87
    let l2 = row(&report, "L2");
    assert_eq!(l2["status"], "graded");
    assert_eq!(l2["result"]["formativeAverage"], 83.0);
    assert_eq!(l2["result"]["summativeScore"], 92.0);
    assert_eq!(l2["result"]["weightedScore"], 87.0);

    let l3 = row(&report, "L3");
    assert_eq!(l3["status"], "ungraded");
    assert_eq!(l3["error"]["code"], "invalid_score");
    assert!(l3.get("result").is_none());

    let l4 = row(&report, "L4");
    assert_eq!(l4["status"], "ungraded");
    assert_eq!(l4["error"]["code"], "missing_marks");

    let l5 = row(&report, "L5");
    assert_eq!(l5["result"]["level"], "NY");

    assert_eq!(report["gradedCount"], 3);
    assert_eq!(report["ungradedCount"], 2);
    assert_eq!(report["failedLearnerIds"], json!(["L3", "L4"]));
    assert_eq!(
        report["levelCounts"],
        json!([
            { "level": "NY", "count": 1 },
            { "level": "BE", "count": 0 },
            { "level": "AE", "count": 0 },
            { "level": "ME", "count": 2 },
            { "level": "EE", "count": 0 }
        ])
    );
    // (3 + 3 + 0) / 3
    assert_eq!(report["meanPoints"], 2.0);
    assert!(report["reportId"].as_str().map(|s| !s.is_empty()).unwrap_or(false));
    assert!(report["generatedAt"].as_str().is_some());

    let _ = child.kill();
}

#[test]
fn gapped_scale_marks_rows_ungraded_without_aborting() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.classComposite",
        json!({
            "scale": {
                "id": "gappy",
                "bands": [
                    { "level": "BE", "minPercentage": 0, "maxPercentage": 29 },
                    { "level": "ME", "minPercentage": 40, "maxPercentage": 100 }
                ]
            },
            "weights": { "formative": 0.5, "summative": 0.5 },
            "learners": [
                { "learnerId": "A", "formativeAverage": 30, "summativeScore": 40 },
                { "learnerId": "B", "formativeAverage": 80, "summativeScore": 90 }
            ]
        }),
    );

    let a = row(&report, "A");
    assert_eq!(a["status"], "ungraded");
    assert_eq!(a["error"]["code"], "configuration_error");
    assert_eq!(a["error"]["details"]["percentage"], 35.0);
    assert_eq!(row(&report, "B")["result"]["level"], "ME");
    assert_eq!(report["failedLearnerIds"], json!(["A"]));
    // Bands carry no points.
    assert!(report["meanPoints"].is_null());

    let _ = child.kill();
}
