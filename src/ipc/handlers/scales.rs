use crate::calc::PerformanceScale;
use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::params::{required, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use uuid::Uuid;

fn scale_summary(scale: &PerformanceScale) -> serde_json::Value {
    json!({
        "id": scale.id,
        "name": scale.name,
        "levels": scale.bands_ascending().iter().map(|b| b.level.as_str()).collect::<Vec<_>>(),
    })
}

fn handle_scales_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scales: Vec<serde_json::Value> = state.scales.values().map(scale_summary).collect();
    ok(&req.id, json!({ "scales": scales }))
}

fn handle_scales_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scale_id = match required_str(req, "scaleId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.scales.get(&scale_id) {
        Some(scale) => ok(&req.id, json!({ "scale": scale })),
        None => err(
            &req.id,
            "not_found",
            "scale not found",
            Some(json!({ "scaleId": scale_id })),
        ),
    }
}

fn handle_scales_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut scale: PerformanceScale = match required(req, "scale") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if scale.id.trim().is_empty() {
        scale.id = Uuid::new_v4().to_string();
    }
    if let Err(e) = scale.validate() {
        return calc_err(&req.id, &e);
    }

    let scale_id = scale.id.clone();
    let replaced = state.scales.insert(scale_id.clone(), scale).is_some();
    log::info!(
        "scale '{}' {}",
        scale_id,
        if replaced { "replaced" } else { "registered" }
    );
    ok(
        &req.id,
        json!({ "scaleId": scale_id, "replaced": replaced }),
    )
}

fn handle_scales_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scale_id = match required_str(req, "scaleId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let removed = state.scales.remove(&scale_id).is_some();
    ok(&req.id, json!({ "scaleId": scale_id, "removed": removed }))
}

/// Dry run for the admin screen: reports the first problem without registering.
fn handle_scales_validate(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let scale: PerformanceScale = match required(req, "scale") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match scale.validate() {
        Ok(()) => ok(&req.id, json!({ "valid": true })),
        Err(e) => ok(
            &req.id,
            json!({
                "valid": false,
                "problem": {
                    "code": e.code(),
                    "message": e.to_string(),
                    "details": e.details(),
                }
            }),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scales.list" => Some(handle_scales_list(state, req)),
        "scales.get" => Some(handle_scales_get(state, req)),
        "scales.register" => Some(handle_scales_register(state, req)),
        "scales.remove" => Some(handle_scales_remove(state, req)),
        "scales.validate" => Some(handle_scales_validate(state, req)),
        _ => None,
    }
}
