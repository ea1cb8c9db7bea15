use crate::calc::{self, ScoreEntry};
use crate::ipc::error::{calc_err, ok};
use crate::ipc::params::{required, required_f64, resolve_scale, resolve_weights};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_grade_percentage(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let entry: ScoreEntry = match required(req, "entry") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match calc::percentage_of(&entry) {
        Ok(p) => ok(&req.id, json!(p)),
        Err(e) => calc_err(&req.id, &e),
    }
}

fn handle_grade_classify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let percentage = match required_f64(req, "percentage") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scale = match resolve_scale(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match calc::classify(percentage, &scale) {
        Ok(band) => ok(
            &req.id,
            json!({ "scaleId": scale.id, "level": band.level, "band": band }),
        ),
        Err(e) => calc_err(&req.id, &e),
    }
}

/// Mark-entry path: one raw mark in, percentage plus level out.
fn handle_grade_entry(state: &mut AppState, req: &Request) -> serde_json::Value {
    let entry: ScoreEntry = match required(req, "entry") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scale = match resolve_scale(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let pct = match calc::percentage_of(&entry) {
        Ok(v) => v,
        Err(e) => return calc_err(&req.id, &e),
    };
    match calc::classify(pct.percent, &scale) {
        Ok(band) => ok(
            &req.id,
            json!({
                "scaleId": scale.id,
                "percent": pct.percent,
                "clamped": pct.clamped,
                "level": band.level,
                "band": band,
                "remarks": entry.remarks,
            }),
        ),
        Err(e) => calc_err(&req.id, &e),
    }
}

fn handle_grade_formative_average(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let entries: Vec<ScoreEntry> = match required(req, "entries") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match calc::formative_average(&entries) {
        Ok(avg) => ok(
            &req.id,
            json!({ "formativeAverage": avg, "entryCount": entries.len() }),
        ),
        Err(e) => calc_err(&req.id, &e),
    }
}

fn handle_grade_composite(state: &mut AppState, req: &Request) -> serde_json::Value {
    let formative_average = match required_f64(req, "formativeAverage") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let summative_score = match required_f64(req, "summativeScore") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let weights = match resolve_weights(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scale = match resolve_scale(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match calc::composite(formative_average, summative_score, &weights, &scale) {
        Ok(result) => ok(
            &req.id,
            json!({ "scaleId": scale.id, "weights": weights, "result": result }),
        ),
        Err(e) => calc_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grade.percentage" => Some(handle_grade_percentage(state, req)),
        "grade.classify" => Some(handle_grade_classify(state, req)),
        "grade.entry" => Some(handle_grade_entry(state, req)),
        "grade.formativeAverage" => Some(handle_grade_formative_average(state, req)),
        "grade.composite" => Some(handle_grade_composite(state, req)),
        _ => None,
    }
}
