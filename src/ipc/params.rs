use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::calc::{PerformanceScale, Weights};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

const INLINE_SCALE_ID: &str = "inline";

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    req.params.get(key).and_then(|v| v.as_f64()).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("{} must be a number", key),
            None,
        )
    })
}

/// Deserializes `params[key]` into `T`, reporting serde's message on mismatch.
pub fn required<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid {}: {}", key, e),
            None,
        )
    })
}

pub fn optional<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(_) => required(req, key).map(Some),
    }
}

/// `scaleId` looks up a registered scale; `scale` carries one inline.
pub fn resolve_scale<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<Cow<'a, PerformanceScale>, serde_json::Value> {
    if let Some(id) = req.params.get("scaleId").and_then(|v| v.as_str()) {
        return state.scales.get(id).map(Cow::Borrowed).ok_or_else(|| {
            err(
                &req.id,
                "not_found",
                "scale not found",
                Some(json!({ "scaleId": id })),
            )
        });
    }
    if req.params.get("scale").is_some() {
        let mut scale: PerformanceScale = required(req, "scale")?;
        if scale.id.trim().is_empty() {
            scale.id = INLINE_SCALE_ID.to_string();
        }
        return Ok(Cow::Owned(scale));
    }
    Err(err(
        &req.id,
        "bad_params",
        "missing scaleId or scale",
        None,
    ))
}

/// Request weights win over the session default; there is no built-in fallback.
pub fn resolve_weights(state: &AppState, req: &Request) -> Result<Weights, serde_json::Value> {
    if let Some(w) = optional::<Weights>(req, "weights")? {
        return Ok(w);
    }
    state.weights.ok_or_else(|| {
        err(
            &req.id,
            "configuration_error",
            "no weights supplied and no session default configured",
            None,
        )
    })
}
