use std::collections::BTreeMap;

use serde::Deserialize;

use crate::calc::{PerformanceScale, Weights};
use crate::config::EngineConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Scales registered by the admin side plus the session's default weights.
/// The engine only reads these.
#[derive(Debug, Default)]
pub struct AppState {
    pub scales: BTreeMap<String, PerformanceScale>,
    pub weights: Option<Weights>,
}

impl AppState {
    pub fn from_config(config: EngineConfig) -> Self {
        let scales = config
            .scales
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        Self {
            scales,
            weights: config.weights,
        }
    }
}
