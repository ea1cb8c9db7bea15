use crate::calc::Weights;
use crate::ipc::error::{calc_err, ok};
use crate::ipc::params::required;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "scaleCount": state.scales.len(),
            "weightsConfigured": state.weights.is_some(),
        }),
    )
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "weights": state.weights }))
}

fn handle_config_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let weights: Weights = match required(req, "weights") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    // A rejected update keeps whatever was configured before.
    if let Err(e) = weights.validate() {
        return calc_err(&req.id, &e);
    }
    log::info!(
        "session weights set to {}/{}",
        weights.formative,
        weights.summative
    );
    state.weights = Some(weights);
    ok(&req.id, json!({ "weights": weights }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "calc.config.get" => Some(handle_config_get(state, req)),
        "calc.config.update" => Some(handle_config_update(state, req)),
        _ => None,
    }
}
